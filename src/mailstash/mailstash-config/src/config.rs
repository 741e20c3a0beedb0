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

use mailstash_common::{CodeID, PathTemplate, Reply};

/// This structure contains all the field to configure the relay at the startup.
///
/// This structure will be loaded from a configuration file `-c, --config`
/// argument of the program. See [`crate::Config::from_toml`].
///
/// All field are optional and defaulted if missing, except `storage.prefix_pattern`.
///
/// You can also use the builder [`Config::builder`] to use the builder pattern,
/// and create an instance programmatically.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// see [`field::FieldServer`]
    #[serde(default)]
    pub server: field::FieldServer,
    /// see [`field::FieldStorage`]
    pub storage: field::FieldStorage,
    /// see [`field::FieldPolicy`]
    #[serde(default)]
    pub policy: field::FieldPolicy,
}

/// The inner field of the relay's configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    use super::{CodeID, PathTemplate, Reply};
    pub use crate::parser::rcpt_pattern::RcptPattern;

    /// This structure contains all the field to configure the server at the startup.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServer {
        /// Name of the server.
        ///
        /// Used with the response [`CodeID::Greetings`], and [`CodeID::Helo`],
        /// and [`CodeID::Ehlo`].
        #[serde(default = "FieldServer::hostname")]
        pub name: String,
        /// Maximum number of client served at the same time.
        ///
        /// The client will be rejected if the server is full.
        ///
        /// If this value is `-1`, then the server will accept any number of client.
        #[serde(default = "FieldServer::default_client_count_max")]
        pub client_count_max: i64,
        /// Maximum size in bytes of the message.
        #[serde(default = "FieldServer::default_message_size_limit")]
        pub message_size_limit: usize,
        /// see [`FieldServerInterfaces`]
        #[serde(default)]
        pub interfaces: FieldServerInterfaces,
        /// see [`FieldServerLogs`]
        #[serde(default)]
        pub logs: FieldServerLogs,
        /// see [`FieldServerSMTP`]
        #[serde(default)]
        pub smtp: FieldServerSMTP,
        /// see [`FieldServerDNS`]
        #[serde(default)]
        pub dns: FieldServerDNS,
    }

    /// Address served by the relay. Either ipv4 or ipv6.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerInterfaces {
        /// List of address for the protocol SMTP.
        #[serde(default = "FieldServerInterfaces::default_addr")]
        #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
        pub addr: Vec<std::net::SocketAddr>,
    }

    /// Verbosity of the logs, accepting the level names `CRITICAL`, `FATAL`,
    /// `ERROR`, `WARN`, `WARNING`, `INFO`, `DEBUG`, `NOTSET` and `TRACE`.
    #[derive(
        Debug,
        Default,
        Copy,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        strum::Display,
        serde_with::DeserializeFromStr,
        serde_with::SerializeDisplay,
    )]
    #[strum(serialize_all = "UPPERCASE")]
    pub enum LogLevel {
        /// `CRITICAL`, `FATAL` and `ERROR`
        Error,
        /// `WARN` and `WARNING`
        #[default]
        Warn,
        ///
        Info,
        ///
        Debug,
        /// `NOTSET` and `TRACE`
        Trace,
    }

    /// The field related to the logs.
    #[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerLogs {
        /// Verbosity of the logs.
        #[serde(default)]
        pub level: LogLevel,
        /// If set, the logs are also appended to this file.
        pub filepath: Option<std::path::PathBuf>,
    }

    /// Configuration of the client's error handling.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTPError {
        /// The maximum number of errors before the client is delay between each response.
        ///
        /// `-1` to disable
        pub soft_count: i64,
        /// The maximum number of errors before the client is disconnected.
        ///
        /// `-1` to disable
        pub hard_count: i64,
        /// The delay used between each response, after `soft_count` errors.
        /// Unused if `soft_count` is `-1`.
        #[serde(with = "humantime_serde")]
        pub delay: std::time::Duration,
    }

    /// Parameters of the SMTP.
    #[serde_with::serde_as]
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTP {
        /// Maximum number of recipients received in the envelop, extra recipient will produce an [`CodeID::TooManyRecipients`].
        #[serde(default = "FieldServerSMTP::default_rcpt_count_max")]
        pub rcpt_count_max: usize,
        /// Delay without receiving a command before closing the connection with [`CodeID::Timeout`].
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerSMTP::default_timeout_client")]
        pub timeout_client: std::time::Duration,
        /// SMTP's error policy.
        #[serde(default)]
        pub error: FieldServerSMTPError,
        /// Dictionary of the reply sent by the server during the SMTP transaction.
        ///
        /// `{name}` is replaced by the name of the server.
        #[serde(default)]
        #[serde_as(as = "std::collections::BTreeMap<serde_with::DisplayFromStr, _>")]
        pub codes: std::collections::BTreeMap<CodeID, Reply>,
    }

    /// Configuration of the DNS resolver used for the reputation zones.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(tag = "type", deny_unknown_fields)]
    pub enum FieldServerDNS {
        /// Using the resolver of the system (/etc/resolv.conf).
        #[serde(rename = "system")]
        System,
        /// Using the google DNS resolver.
        #[serde(rename = "google")]
        Google {
            /// Parameters
            #[serde(default)]
            options: ResolverOptsWrapper,
        },
        /// Using the cloudflare DNS resolver.
        #[serde(rename = "cloudflare")]
        CloudFlare {
            /// Parameters
            #[serde(default)]
            options: ResolverOptsWrapper,
        },
    }

    /// Parameter for the DNS resolver.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct ResolverOptsWrapper {
        /// Specify the timeout for a request. Defaults to 5 seconds
        #[serde(with = "humantime_serde")]
        #[serde(default = "ResolverOptsWrapper::default_timeout")]
        pub timeout: std::time::Duration,
        /// Number of retries after lookup failure before giving up. Defaults to 2
        #[serde(default = "ResolverOptsWrapper::default_attempts")]
        pub attempts: usize,
        /// Rotate through the resource records in the response (if there is more than one for a given name)
        #[serde(default = "ResolverOptsWrapper::default_rotate")]
        pub rotate: bool,
        /// Cache size is in number of records (some records can be large)
        #[serde(default = "ResolverOptsWrapper::default_cache_size")]
        pub cache_size: usize,
        /// Check /ect/hosts file before dns requery (only works for unix like OS)
        #[serde(default = "ResolverOptsWrapper::default_use_hosts_file")]
        pub use_hosts_file: bool,
        /// Number of concurrent requests per query
        ///
        /// Where more than one nameserver is configured, this configures the resolver to send queries
        /// to a number of servers in parallel. Defaults to 2; 0 or 1 will execute requests serially.
        #[serde(default = "ResolverOptsWrapper::default_num_concurrent_reqs")]
        pub num_concurrent_reqs: usize,
    }

    /// Static credentials of the object storage.
    #[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldStorageCredentials {
        /// Access key identifier.
        pub access_key_id: String,
        /// Secret access key, never printed.
        #[serde(serialize_with = "FieldStorageCredentials::serialize_secret")]
        pub secret_access_key: String,
    }

    impl std::fmt::Debug for FieldStorageCredentials {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FieldStorageCredentials")
                .field("access_key_id", &self.access_key_id)
                .field("secret_access_key", &"********")
                .finish()
        }
    }

    impl FieldStorageCredentials {
        fn serialize_secret<S: serde::Serializer>(_: &str, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str("********")
        }
    }

    /// Encoding of the message object.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Compression {
        /// The message is gzip compressed, stored as `<id>.eml.gz`.
        #[default]
        Gzip,
        /// The message is stored as received, as `<id>.eml`.
        None,
    }

    impl Compression {
        /// Suffix of the message object key.
        #[must_use]
        pub const fn extension(self) -> &'static str {
            match self {
                Self::Gzip => ".eml.gz",
                Self::None => ".eml",
            }
        }
    }

    /// Where and how the messages are archived.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldStorage {
        /// Pattern of the key prefix, rendered with the arrival time of each message.
        pub prefix_pattern: PathTemplate,
        /// Endpoint of the object storage, the default AWS endpoint if missing.
        ///
        /// An `http:` endpoint disables TLS.
        pub endpoint: Option<url::Url>,
        /// Region used to sign the requests.
        #[serde(default = "FieldStorage::default_region")]
        pub region: String,
        /// see [`Compression`]
        #[serde(default)]
        pub compression: Compression,
        /// Static credentials, resolved from the environment if missing.
        pub credentials: Option<FieldStorageCredentials>,
    }

    /// Acceptance policy of the transactions.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldPolicy {
        /// The recipient addresses must fully match this pattern.
        #[serde(default)]
        pub rcpt_regex: RcptPattern,
        /// DNS blocklist zones queried in order with the reversed IPv4 of the client.
        #[serde(default)]
        pub dnsbl_zones: Vec<String>,
    }
}
