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

use crate::ReplyCode;

/// SMTP message sent by the server to the client as defined in RFC5321#4.2
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: ReplyCode,
    text: Vec<String>,
    folded: String,
}

impl serde::Serialize for Reply {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.folded)
    }
}

impl<'de> serde::Deserialize<'de> for Reply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <String as serde::Deserialize>::deserialize(deserializer)?;
        <Self as std::str::FromStr>::from_str(&value).map_err(serde::de::Error::custom)
    }
}

impl Reply {
    /// Build a reply from a code and a single line of text.
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        let reply = Self {
            code,
            text: vec![text.into()],
            folded: String::new(),
        };
        Self {
            folded: reply.fold(),
            ..reply
        }
    }

    /// Code of the reply.
    #[must_use]
    pub const fn code(&self) -> &ReplyCode {
        &self.code
    }

    /// Lines of text of the reply, without the code.
    #[must_use]
    pub fn text(&self) -> &[String] {
        &self.text
    }

    fn fold(&self) -> String {
        let last = self.text.len().saturating_sub(1);

        self.text
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let separator = if idx == last { ' ' } else { '-' };
                match &self.code {
                    ReplyCode::Code { code } => format!("{code}{separator}{line}\r\n"),
                    ReplyCode::Enhanced { code, enhanced } => {
                        format!("{code}{separator}{enhanced} {line}\r\n")
                    }
                }
            })
            .collect()
    }

    /// Create a new reply with:
    /// * `text` = `self.text` + `other.text`
    /// * `code` = `other.code`
    /// ```
    /// # use mailstash_common::Reply;
    /// let first = "451 4.3.0 Temporary failure storing message.".parse::<Reply>().unwrap();
    /// let second = "451 Too many errors from the client".parse::<Reply>().unwrap();
    ///
    /// assert_eq!(
    ///   first.extended(&second).to_string(),
    ///   [
    ///     "451-Temporary failure storing message.\r\n",
    ///     "451 Too many errors from the client\r\n"
    ///   ].concat()
    /// );
    /// ```
    pub fn extended(mut self, other: &Self) -> Self {
        self.text.extend(other.text.iter().cloned());
        let reply = Self {
            code: other.code.clone(),
            text: self.text,
            folded: String::new(),
        };
        Self {
            folded: reply.fold(),
            ..reply
        }
    }
}

impl std::str::FromStr for Reply {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut first_code = None;
        let mut text = vec![];

        for line in s.split("\r\n").filter(|s| !s.is_empty()) {
            let (new_code, line) = ReplyCode::parse_line(line)?;

            match &first_code {
                Some(first) if *first == new_code => {}
                Some(_) => anyhow::bail!("Reply codes are not consistent"),
                None => first_code = Some(new_code),
            }

            text.push(line.get(1..).unwrap_or_default().to_string());
        }

        let reply = Self {
            code: first_code.ok_or_else(|| anyhow::anyhow!("empty reply"))?,
            text,
            folded: String::new(),
        };
        Ok(Self {
            folded: reply.fold(),
            ..reply
        })
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.folded)
    }
}

impl AsRef<str> for Reply {
    fn as_ref(&self) -> &str {
        &self.folded
    }
}

#[cfg(test)]
mod tests {
    use crate::{Reply, ReplyCode};

    #[rstest::rstest]
    #[case(
        &Reply {
            code: ReplyCode::Code { code: 250 },
            text: vec!["OK".to_string()],
            folded: "250 OK\r\n".to_string(),
        }
    )]
    #[case(
        &Reply {
            code: ReplyCode::Enhanced { code: 550, enhanced: "5.1.1".to_string() },
            text: vec!["No such user".to_string()],
            folded: "550 5.1.1 No such user\r\n".to_string(),
        }
    )]
    #[case(
        &Reply {
            code: ReplyCode::Enhanced { code: 554, enhanced: "5.7.1".to_string() },
            text: vec!["Service unavailable; Client host blocked by policy".to_string()],
            folded: "554 5.7.1 Service unavailable; Client host blocked by policy\r\n".to_string(),
        }
    )]
    #[case(
        &Reply {
            code: ReplyCode::Code { code: 250 },
            text: vec![
                "mailstash.local".to_string(),
                "8BITMIME".to_string(),
                "SMTPUTF8".to_string(),
                "SIZE 33554432".to_string(),
            ],
            folded: concat!(
                "250-mailstash.local\r\n",
                "250-8BITMIME\r\n",
                "250-SMTPUTF8\r\n",
                "250 SIZE 33554432\r\n",
            ).to_string(),
        }
    )]
    fn parse_reply(#[case] expected: &Reply) {
        let input: &str = expected.as_ref();

        let output = input.parse::<Reply>().unwrap();
        pretty_assertions::assert_eq!(output, *expected);
        pretty_assertions::assert_eq!(input, output.fold());
    }

    #[test]
    fn inconsistent_codes() {
        assert!("250-first\r\n550 second\r\n".parse::<Reply>().is_err());
    }

    #[test]
    fn empty() {
        assert!("".parse::<Reply>().is_err());
        assert!("\r\n".parse::<Reply>().is_err());
    }

    #[test]
    fn serde() {
        let reply = "451 4.3.0 Temporary failure storing message.\r\n"
            .parse::<Reply>()
            .unwrap();
        let json = serde_json::to_string(&reply).unwrap();
        pretty_assertions::assert_eq!(
            json,
            r#""451 4.3.0 Temporary failure storing message.\r\n""#
        );
        pretty_assertions::assert_eq!(serde_json::from_str::<Reply>(&json).unwrap(), reply);
    }
}
