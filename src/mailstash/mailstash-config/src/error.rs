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

use mailstash_common::{CodeID, PathTemplateError};

/// The configuration cannot be used to start the relay.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid, or does not fit the [`Config`](crate::Config) structure.
    #[error("cannot parse the configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The storage key pattern does not render an `s3://<bucket>/` prefix.
    #[error(transparent)]
    PrefixPattern(#[from] PathTemplateError),
    /// Unknown name of log level.
    #[error("unknown log level `{0}`, expected one of CRITICAL, FATAL, ERROR, WARN, WARNING, INFO, DEBUG, NOTSET or TRACE")]
    LogLevel(String),
    /// The recipient pattern does not compile.
    #[error("invalid recipient pattern `{pattern}`: {source}")]
    RcptPattern {
        /// Offending pattern.
        pattern: String,
        /// Compilation error.
        source: regex::Error,
    },
    /// A reply is ill-formed once the server name is substituted.
    #[error("invalid reply for `{code}`: {reason}")]
    Reply {
        /// Identifier of the reply.
        code: CodeID,
        /// Parsing error.
        reason: String,
    },
    /// No address to listen on.
    #[error("the server must listen on at least one address")]
    NoInterface,
    /// The interface override cannot be resolved to an address.
    #[error("cannot resolve the listening address `{addr}`: {source}")]
    Interface {
        /// Host and port requested.
        addr: String,
        /// Resolution error.
        source: std::io::Error,
    },
    /// An override targets a key which is not a section.
    #[error("cannot apply the override on `{0}`, the key is not a table")]
    Override(&'static str),
    /// A size or count that must be positive is 0.
    #[error("`{0}` cannot be 0")]
    Zero(&'static str),
}
