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

use super::wants::{
    WantsPolicy, WantsServer, WantsServerDNS, WantsServerInterfaces, WantsServerLogs,
    WantsServerSMTP, WantsStorage, WantsValidate,
};
use crate::{
    field::{
        Compression, FieldPolicy, FieldServer, FieldServerDNS, FieldServerInterfaces,
        FieldServerLogs, FieldServerSMTP, FieldServerSMTPError, FieldStorage,
        FieldStorageCredentials, LogLevel, RcptPattern, ResolverOptsWrapper,
    },
    ConfigError,
};
use mailstash_common::{CodeID, PathTemplate, Reply};

///
pub struct Builder<State> {
    pub(crate) state: State,
}

impl Builder<WantsServer> {
    /// Use the hostname of the machine as the server name.
    #[must_use]
    pub fn with_hostname(self) -> Builder<WantsServerInterfaces> {
        self.with_server_name(&FieldServer::hostname())
    }

    ///
    #[must_use]
    pub fn with_server_name(self, name: &str) -> Builder<WantsServerInterfaces> {
        self.with_server_name_and_limits(
            name,
            FieldServer::default_client_count_max(),
            FieldServer::default_message_size_limit(),
        )
    }

    ///
    #[must_use]
    pub fn with_server_name_and_limits(
        self,
        name: &str,
        client_count_max: i64,
        message_size_limit: usize,
    ) -> Builder<WantsServerInterfaces> {
        Builder::<WantsServerInterfaces> {
            state: WantsServerInterfaces {
                parent: self.state,
                name: name.to_string(),
                client_count_max,
                message_size_limit,
            },
        }
    }
}

impl Builder<WantsServerInterfaces> {
    /// Listen on `127.0.0.1:8025`.
    #[must_use]
    pub fn with_ipv4_localhost(self) -> Builder<WantsServerLogs> {
        self.with_interfaces(&FieldServerInterfaces::default_addr())
    }

    ///
    #[must_use]
    pub fn with_interfaces(self, addr: &[std::net::SocketAddr]) -> Builder<WantsServerLogs> {
        Builder::<WantsServerLogs> {
            state: WantsServerLogs {
                parent: self.state,
                addr: addr.to_vec(),
            },
        }
    }
}

impl Builder<WantsServerLogs> {
    ///
    #[must_use]
    pub fn with_default_logs_settings(self) -> Builder<WantsServerSMTP> {
        self.with_logs_settings(LogLevel::default(), None)
    }

    ///
    #[must_use]
    pub fn with_logs_settings(
        self,
        level: LogLevel,
        filepath: Option<std::path::PathBuf>,
    ) -> Builder<WantsServerSMTP> {
        Builder::<WantsServerSMTP> {
            state: WantsServerSMTP {
                parent: self.state,
                logs: FieldServerLogs { level, filepath },
            },
        }
    }
}

impl Builder<WantsServerSMTP> {
    ///
    #[must_use]
    pub fn with_default_smtp_options(self) -> Builder<WantsServerDNS> {
        self.with_smtp_options(
            FieldServerSMTP::default_rcpt_count_max(),
            FieldServerSMTPError::default(),
            FieldServerSMTP::default_timeout_client(),
        )
    }

    ///
    #[must_use]
    pub fn with_smtp_options(
        self,
        rcpt_count_max: usize,
        error: FieldServerSMTPError,
        timeout_client: std::time::Duration,
    ) -> Builder<WantsServerDNS> {
        self.with_smtp_options_and_codes(
            rcpt_count_max,
            error,
            timeout_client,
            std::collections::BTreeMap::new(),
        )
    }

    /// The replies missing in `codes` are defaulted by the validation.
    #[must_use]
    pub fn with_smtp_options_and_codes(
        self,
        rcpt_count_max: usize,
        error: FieldServerSMTPError,
        timeout_client: std::time::Duration,
        codes: std::collections::BTreeMap<CodeID, Reply>,
    ) -> Builder<WantsServerDNS> {
        Builder::<WantsServerDNS> {
            state: WantsServerDNS {
                parent: self.state,
                smtp: FieldServerSMTP {
                    rcpt_count_max,
                    error,
                    timeout_client,
                    codes,
                },
            },
        }
    }
}

impl Builder<WantsServerDNS> {
    /// Use the resolver of the system (/etc/resolv.conf).
    #[must_use]
    pub fn with_system_dns(self) -> Builder<WantsStorage> {
        self.with_dns(FieldServerDNS::System)
    }

    ///
    #[must_use]
    pub fn with_google_dns(self) -> Builder<WantsStorage> {
        self.with_dns(FieldServerDNS::Google {
            options: ResolverOptsWrapper::default(),
        })
    }

    ///
    #[must_use]
    pub fn with_cloudflare_dns(self) -> Builder<WantsStorage> {
        self.with_dns(FieldServerDNS::CloudFlare {
            options: ResolverOptsWrapper::default(),
        })
    }

    ///
    #[must_use]
    pub fn with_dns(self, dns: FieldServerDNS) -> Builder<WantsStorage> {
        Builder::<WantsStorage> {
            state: WantsStorage {
                parent: self.state,
                dns,
            },
        }
    }
}

impl Builder<WantsStorage> {
    /// Archive to the default endpoint, with the credentials of the environment
    /// and gzip compression.
    ///
    /// # Errors
    ///
    /// * `prefix_pattern` does not render an `s3://<bucket>/` prefix
    pub fn with_prefix_pattern(
        self,
        prefix_pattern: &str,
    ) -> Result<Builder<WantsPolicy>, ConfigError> {
        Ok(self.with_storage(
            PathTemplate::new(prefix_pattern)?,
            None,
            None,
            Compression::default(),
        ))
    }

    ///
    #[must_use]
    pub fn with_storage(
        self,
        prefix_pattern: PathTemplate,
        endpoint: Option<url::Url>,
        credentials: Option<FieldStorageCredentials>,
        compression: Compression,
    ) -> Builder<WantsPolicy> {
        Builder::<WantsPolicy> {
            state: WantsPolicy {
                parent: self.state,
                storage: FieldStorage {
                    prefix_pattern,
                    endpoint,
                    region: FieldStorage::default_region(),
                    credentials,
                    compression,
                },
            },
        }
    }
}

impl Builder<WantsPolicy> {
    /// Accept any well-formed recipient, and do not query any reputation zone.
    #[must_use]
    pub fn with_default_policy(self) -> Builder<WantsValidate> {
        Builder::<WantsValidate> {
            state: WantsValidate {
                parent: self.state,
                policy: FieldPolicy::default(),
            },
        }
    }

    ///
    ///
    /// # Errors
    ///
    /// * `rcpt_regex` does not compile
    pub fn with_policy(
        self,
        rcpt_regex: &str,
        dnsbl_zones: &[&str],
    ) -> Result<Builder<WantsValidate>, ConfigError> {
        Ok(Builder::<WantsValidate> {
            state: WantsValidate {
                parent: self.state,
                policy: FieldPolicy {
                    rcpt_regex: rcpt_regex.parse::<RcptPattern>()?,
                    dnsbl_zones: dnsbl_zones.iter().map(ToString::to_string).collect(),
                },
            },
        })
    }
}
