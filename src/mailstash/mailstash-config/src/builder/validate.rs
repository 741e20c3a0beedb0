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

use super::{wants::WantsValidate, with::Builder};
use crate::{
    config::field::{FieldServer, FieldServerInterfaces},
    Config, ConfigError,
};

impl Builder<WantsValidate> {
    /// Produce the configuration, defaulting the missing replies.
    ///
    /// # Errors
    ///
    /// * see [`ConfigError`]
    pub fn validate(self) -> Result<Config, ConfigError> {
        let policy = self.state;
        let storage = policy.parent;
        let dns = storage.parent;
        let smtp = dns.parent;
        let logs = smtp.parent;
        let srv_inet = logs.parent;
        let srv = srv_inet.parent;

        Config::ensure(Config {
            server: FieldServer {
                name: srv.name,
                client_count_max: srv.client_count_max,
                message_size_limit: srv.message_size_limit,
                interfaces: FieldServerInterfaces {
                    addr: srv_inet.addr,
                },
                logs: logs.logs,
                smtp: smtp.smtp,
                dns: dns.dns,
            },
            storage: storage.storage,
            policy: policy.policy,
        })
    }
}
