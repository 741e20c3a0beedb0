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

use crate::storage::ObjectStore;
use mailstash_common::{Envelope, StorageKey};
use mailstash_config::field::Compression;

/// Description of an archived message, stored next to it as `<id>.json`.
///
/// The fields are sorted by name, as serialized.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    /// Reverse path, `null` for the null sender.
    pub mail_from: Option<String>,
    ///
    pub mail_options: Vec<String>,
    /// Value of the `Message-ID` header of the message, if any.
    pub message_id: Option<String>,
    /// Url of the message object, set by [`ArchivalWriter::store`].
    pub path: String,
    ///
    pub rcpt_options: Vec<String>,
    ///
    pub rcpt_tos: Vec<String>,
    /// Address of the client.
    pub session_ip: String,
    ///
    pub smtp_utf8: bool,
}

impl Metadata {
    /// Describe the transaction of `envelope`.
    #[must_use]
    pub fn new(envelope: &Envelope, message_id: Option<String>) -> Self {
        Self {
            mail_from: envelope.mail_from.clone(),
            mail_options: envelope.mail_options.clone(),
            message_id,
            path: String::new(),
            rcpt_options: envelope.rcpt_options.clone(),
            rcpt_tos: envelope.rcpt_tos.clone(),
            session_ip: envelope.peer_ip.clone(),
            smtp_utf8: envelope.smtp_utf8,
        }
    }
}

/// Urls of the two objects of an archived message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedPaths {
    /// `<prefix><id>.eml.gz` (or `.eml` without compression)
    pub content: String,
    /// `<prefix><id>.json`
    pub metadata: String,
}

/// The message could not be archived. No rollback is done: the content may
/// be stored without its metadata.
#[derive(Debug, thiserror::Error)]
pub enum StorageWriteError {
    /// The message object was not written.
    #[error("cannot write the message `{path}`: {source}")]
    Content {
        /// Url of the message object.
        path: String,
        /// Cause.
        source: anyhow::Error,
    },
    /// The message object was written, but not the metadata.
    #[error("cannot write the metadata `{path}` of the message `{content}`: {source}")]
    Metadata {
        /// Url of the message object, already written.
        content: String,
        /// Url of the metadata object.
        path: String,
        /// Cause.
        source: anyhow::Error,
    },
}

/// Write the messages and their metadata to the object storage.
pub struct ArchivalWriter {
    store: std::sync::Arc<dyn ObjectStore>,
    compression: Compression,
}

impl ArchivalWriter {
    ///
    #[must_use]
    pub fn new(store: std::sync::Arc<dyn ObjectStore>, compression: Compression) -> Self {
        Self { store, compression }
    }

    /// Urls of the objects of the message `id` under `prefix`.
    #[must_use]
    pub fn paths(&self, prefix: &str, id: &str) -> ArchivedPaths {
        ArchivedPaths {
            content: format!("{prefix}{id}{}", self.compression.extension()),
            metadata: format!("{prefix}{id}.json"),
        }
    }

    fn encode(&self, raw: &[u8]) -> std::io::Result<Vec<u8>> {
        match self.compression {
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                std::io::Write::write_all(&mut encoder, raw)?;
                encoder.finish()
            }
            Compression::None => Ok(raw.to_vec()),
        }
    }

    /// Write the message, then its metadata. The content is not modified
    /// apart from the compression.
    ///
    /// # Errors
    ///
    /// * see [`StorageWriteError`]
    #[tracing::instrument(name = "archive", skip_all, fields(%id))]
    pub async fn store(
        &self,
        prefix: &str,
        id: &str,
        raw: &[u8],
        mut metadata: Metadata,
    ) -> Result<ArchivedPaths, StorageWriteError> {
        let paths = self.paths(prefix, id);
        metadata.path = paths.content.clone();

        let content_error = |source: anyhow::Error| StorageWriteError::Content {
            path: paths.content.clone(),
            source,
        };

        let content_key = paths
            .content
            .parse::<StorageKey>()
            .map_err(content_error)?;
        let content = self
            .encode(raw)
            .map_err(|e| content_error(anyhow::Error::new(e)))?;

        self.store
            .put(&content_key, content)
            .await
            .map_err(content_error)?;
        tracing::debug!(path = %paths.content, "Message written.");

        let metadata_error = |source: anyhow::Error| StorageWriteError::Metadata {
            content: paths.content.clone(),
            path: paths.metadata.clone(),
            source,
        };

        let metadata_key = paths
            .metadata
            .parse::<StorageKey>()
            .map_err(metadata_error)?;
        let metadata = serde_json::to_vec(&metadata)
            .map_err(|e| metadata_error(anyhow::Error::new(e)))?;

        self.store
            .put(&metadata_key, metadata)
            .await
            .map_err(metadata_error)?;
        tracing::debug!(path = %paths.metadata, "Metadata written.");

        Ok(paths)
    }
}
