/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use sha2::Digest;

const MESSAGE_ID_HEADER: &[u8] = b"message-id";
const DIGEST_LEN: usize = 10;

/// Identifier of an archived message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId {
    /// Name of the objects in the storage.
    pub id: String,
    /// Value of the `Message-ID` header, unfolded and trimmed.
    pub header: Option<Vec<u8>>,
}

impl MessageId {
    /// The header value, for the metadata.
    #[must_use]
    pub fn header_lossy(&self) -> Option<String> {
        self.header
            .as_ref()
            .map(|header| String::from_utf8_lossy(header).into_owned())
    }
}

/// Derive the name of the stored objects of a message.
pub struct MessageIdentifier;

impl MessageIdentifier {
    /// The identifier is a random uuid, suffixed by the first 10 hex digits of
    /// the SHA-256 of the `Message-ID` header when the message has one.
    ///
    /// ```
    /// # use mailstash_server::MessageIdentifier;
    /// let with_header = MessageIdentifier::derive(b"Message-ID: <abc@example.com>\r\n\r\nbody\r\n");
    /// assert_eq!(with_header.id.len(), 32 + 1 + 10);
    ///
    /// let without_header = MessageIdentifier::derive(b"Subject: hello\r\n\r\nbody\r\n");
    /// assert_eq!(without_header.id.len(), 36);
    /// assert!(without_header.header.is_none());
    /// ```
    #[must_use]
    pub fn derive(raw: &[u8]) -> MessageId {
        let header = Self::find_header(raw).filter(|value| !value.is_empty());

        let id = match &header {
            Some(value) => {
                let digest = format!("{:x}", sha2::Sha256::digest(value));
                format!(
                    "{}-{}",
                    uuid::Uuid::new_v4().simple(),
                    &digest[..DIGEST_LEN]
                )
            }
            None => uuid::Uuid::new_v4().hyphenated().to_string(),
        };

        MessageId { id, header }
    }

    /// Value of the first `Message-ID` header of the header block.
    fn find_header(raw: &[u8]) -> Option<Vec<u8>> {
        let mut value: Option<Vec<u8>> = None;

        for line in raw.split(|b| *b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if line.is_empty() {
                break;
            }

            if line[0] == b' ' || line[0] == b'\t' {
                if let Some(value) = value.as_mut() {
                    value.extend_from_slice(line);
                }
                continue;
            }

            if value.is_some() {
                break;
            }

            if let Some((name, rest)) = line
                .iter()
                .position(|b| *b == b':')
                .map(|idx| (&line[..idx], &line[idx + 1..]))
            {
                if name.eq_ignore_ascii_case(MESSAGE_ID_HEADER) {
                    value = Some(rest.to_vec());
                }
            }
        }

        value.map(|value| trim(&value).to_vec())
    }
}

fn trim(value: &[u8]) -> &[u8] {
    let start = value
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(value.len());
    let end = value
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |idx| idx + 1);

    &value[start..end.max(start)]
}
