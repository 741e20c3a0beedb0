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

use crate::config::field::{
    FieldPolicy, FieldServer, FieldServerDNS, FieldServerInterfaces, FieldServerSMTP,
    FieldServerSMTPError, FieldStorage, ResolverOptsWrapper,
};
use mailstash_common::{CodeID, Reply, ReplyCode, SMTP_PORT};

impl Default for FieldServer {
    fn default() -> Self {
        Self {
            name: Self::hostname(),
            client_count_max: Self::default_client_count_max(),
            message_size_limit: Self::default_message_size_limit(),
            interfaces: FieldServerInterfaces::default(),
            logs: crate::field::FieldServerLogs::default(),
            smtp: FieldServerSMTP::default(),
            dns: FieldServerDNS::default(),
        }
    }
}

impl FieldServer {
    pub(crate) fn hostname() -> String {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub(crate) const fn default_client_count_max() -> i64 {
        16
    }

    pub(crate) const fn default_message_size_limit() -> usize {
        33_554_432
    }
}

impl Default for FieldServerInterfaces {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
        }
    }
}

impl FieldServerInterfaces {
    pub(crate) fn default_addr() -> Vec<std::net::SocketAddr> {
        vec![std::net::SocketAddr::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            SMTP_PORT,
        )]
    }
}

impl Default for FieldServerSMTPError {
    fn default() -> Self {
        Self {
            soft_count: 10,
            hard_count: 20,
            delay: std::time::Duration::from_millis(5000),
        }
    }
}

impl Default for FieldServerSMTP {
    fn default() -> Self {
        Self {
            rcpt_count_max: Self::default_rcpt_count_max(),
            error: FieldServerSMTPError::default(),
            timeout_client: Self::default_timeout_client(),
            codes: Self::default_smtp_codes(),
        }
    }
}

fn reply(code: u16, enhanced: Option<&str>, text: &str) -> Reply {
    Reply::new(
        enhanced.map_or(ReplyCode::Code { code }, |enhanced| ReplyCode::Enhanced {
            code,
            enhanced: enhanced.to_string(),
        }),
        text,
    )
}

impl FieldServerSMTP {
    pub(crate) const fn default_rcpt_count_max() -> usize {
        1000
    }

    pub(crate) const fn default_timeout_client() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    /// Replies used when the configuration does not define them.
    ///
    /// [`CodeID::Ehlo`] is always generated from the server's name and limits.
    #[must_use]
    pub fn default_smtp_codes() -> std::collections::BTreeMap<CodeID, Reply> {
        [
            (CodeID::Greetings, reply(220, None, "{name} Service ready")),
            (
                CodeID::Help,
                reply(
                    214,
                    None,
                    "Supported commands: EHLO HELO MAIL RCPT DATA RSET NOOP QUIT HELP",
                ),
            ),
            (
                CodeID::Closing,
                reply(221, None, "Service closing transmission channel"),
            ),
            (CodeID::Helo, reply(250, None, "{name}")),
            (CodeID::Ehlo, reply(250, None, "{name}")),
            (
                CodeID::DataStart,
                reply(354, None, "End data with <CR><LF>.<CR><LF>"),
            ),
            (CodeID::Ok, reply(250, None, "OK")),
            (
                CodeID::BlockedByPolicy,
                reply(
                    554,
                    Some("5.7.1"),
                    "Service unavailable; Client host blocked by policy",
                ),
            ),
            (
                CodeID::NoSuchUser,
                reply(550, Some("5.1.1"), "No such user"),
            ),
            (
                CodeID::StorageFailure,
                reply(451, Some("4.3.0"), "Temporary failure storing message."),
            ),
            (
                CodeID::TooManyRecipients,
                reply(452, Some("4.5.3"), "Too many recipients"),
            ),
            (
                CodeID::MessageSizeExceeded,
                reply(
                    552,
                    Some("5.3.4"),
                    "Message size exceeds fixed maximum message size",
                ),
            ),
            (
                CodeID::UnrecognizedCommand,
                reply(500, None, "Syntax error command unrecognized"),
            ),
            (
                CodeID::SyntaxErrorParams,
                reply(501, None, "Syntax error in parameters or arguments"),
            ),
            (
                CodeID::Unimplemented,
                reply(502, None, "Command not implemented"),
            ),
            (
                CodeID::BadSequence,
                reply(503, None, "Bad sequence of commands"),
            ),
            (
                CodeID::ConnectionMaxReached,
                reply(554, None, "Cannot process connection, closing"),
            ),
            (
                CodeID::TooManyError,
                reply(451, None, "Too many errors from the client"),
            ),
            (
                CodeID::Timeout,
                reply(451, None, "Timeout - closing connection"),
            ),
        ]
        .into_iter()
        .collect()
    }
}

impl Default for FieldServerDNS {
    fn default() -> Self {
        Self::System
    }
}

impl Default for ResolverOptsWrapper {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            attempts: Self::default_attempts(),
            rotate: Self::default_rotate(),
            cache_size: Self::default_cache_size(),
            use_hosts_file: Self::default_use_hosts_file(),
            num_concurrent_reqs: Self::default_num_concurrent_reqs(),
        }
    }
}

impl ResolverOptsWrapper {
    pub(crate) const fn default_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }

    pub(crate) const fn default_attempts() -> usize {
        2
    }

    pub(crate) const fn default_rotate() -> bool {
        false
    }

    pub(crate) const fn default_cache_size() -> usize {
        32
    }

    pub(crate) const fn default_use_hosts_file() -> bool {
        true
    }

    pub(crate) const fn default_num_concurrent_reqs() -> usize {
        2
    }
}

impl FieldStorage {
    pub(crate) fn default_region() -> String {
        "us-east-1".to_string()
    }
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            rcpt_regex: crate::field::RcptPattern::default(),
            dnsbl_zones: vec![],
        }
    }
}
