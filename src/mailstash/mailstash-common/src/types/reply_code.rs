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

/// Code at the start of each line of a reply, see RFC5321#4.2 and RFC3463.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyCode {
    /// Three digits reply code.
    Code {
        /// code base
        code: u16,
    },
    /// Reply code followed by an enhanced status code (`x.y.z`).
    Enhanced {
        /// code base
        code: u16,
        /// enhanced status, already validated
        enhanced: String,
    },
}

impl ReplyCode {
    /// Is the code a transient (4yz) or permanent (5yz) failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.value() / 100 >= 4
    }

    /// Is the code a permanent failure (5yz).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.value() / 100 == 5
    }

    /// Return the underlying value of the reply code.
    #[must_use]
    pub fn value(&self) -> u16 {
        match self {
            Self::Code { code } | Self::Enhanced { code, .. } => *code,
        }
    }

    /// Return the enhanced value of the reply code.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Enhanced { enhanced, .. } => Some(enhanced),
            Self::Code { .. } => None,
        }
    }

    fn parse_code(word: &str) -> Option<u16> {
        if word.len() != 3 || !word.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        word.parse::<u16>().ok().filter(|code| (200..600).contains(code))
    }

    fn parse_enhanced(word: &str) -> Option<String> {
        let mut classes = word.splitn(3, '.').map(str::parse::<u16>);
        let (a, b, c) = (
            classes.next()?.ok()?,
            classes.next()?.ok()?,
            classes.next()?.ok()?,
        );
        Some(format!("{a}.{b}.{c}"))
    }

    /// Parse the code of a single reply line, returning the code and the remaining
    /// text (including the separator).
    pub(crate) fn parse_line(line: &str) -> anyhow::Result<(Self, String)> {
        let code = line
            .get(..3)
            .and_then(Self::parse_code)
            .ok_or_else(|| anyhow::anyhow!("cannot parse reply code in {line:?}"))?;

        let rest = &line[3..];
        let separator = rest.chars().next();
        if !matches!(separator, None | Some(' ' | '-')) {
            anyhow::bail!("invalid separator after reply code in {line:?}");
        }

        let text = rest.get(1..).unwrap_or_default();
        if let Some((word, _)) = text.split_once(' ').or(Some((text, ""))) {
            if let Some(enhanced) = Self::parse_enhanced(word) {
                if enhanced == word {
                    let remaining = text.get(word.len() + 1..).unwrap_or_default();
                    return Ok((
                        Self::Enhanced { code, enhanced },
                        format!("{}{remaining}", separator.unwrap_or(' ')),
                    ));
                }
            }
        }

        Ok((Self::Code { code }, rest.to_string()))
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code { code } => write!(f, "{code}"),
            Self::Enhanced { code, enhanced } => write!(f, "{code} {enhanced}"),
        }
    }
}
