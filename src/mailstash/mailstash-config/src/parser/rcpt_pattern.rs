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

/// Default recipient pattern, approximating RFC5322 mailboxes: dot-atom or quoted
/// local part, then a domain name or an IPv4 address literal.
pub(crate) const DEFAULT_RCPT_PATTERN: &str = r#"(?i)(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])"#;

/// A recipient pattern, compiled to match the whole address.
#[derive(Debug, Clone, serde_with::DeserializeFromStr, serde_with::SerializeDisplay)]
pub struct RcptPattern {
    source: String,
    regex: regex::Regex,
}

impl RcptPattern {
    /// The compiled pattern, anchored at both ends.
    #[must_use]
    pub const fn regex(&self) -> &regex::Regex {
        &self.regex
    }

    /// The pattern as written in the configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for RcptPattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_RCPT_PATTERN.to_string(),
            regex: regex::Regex::new(&format!("^(?:{DEFAULT_RCPT_PATTERN})$"))
                .expect("hardcoded pattern is valid"),
        }
    }
}

impl std::str::FromStr for RcptPattern {
    type Err = crate::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            source: s.to_string(),
            regex: regex::Regex::new(&format!("^(?:{s})$")).map_err(|source| {
                crate::ConfigError::RcptPattern {
                    pattern: s.to_string(),
                    source,
                }
            })?,
        })
    }
}

impl std::fmt::Display for RcptPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for RcptPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RcptPattern {}
