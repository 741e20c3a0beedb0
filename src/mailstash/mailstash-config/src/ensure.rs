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

use crate::{config::field::FieldServerSMTP, Config, ConfigError};
use mailstash_common::{CodeID, Reply};

impl Config {
    fn ehlo_reply(&self) -> Result<Reply, ConfigError> {
        [
            format!("250-{}\r\n", self.server.name),
            "250-8BITMIME\r\n".to_string(),
            "250-SMTPUTF8\r\n".to_string(),
            format!("250 SIZE {}\r\n", self.server.message_size_limit),
        ]
        .concat()
        .parse::<Reply>()
        .map_err(|e| ConfigError::Reply {
            code: CodeID::Ehlo,
            reason: e.to_string(),
        })
    }

    pub(crate) fn ensure(mut config: Self) -> Result<Self, ConfigError> {
        if config.server.interfaces.addr.is_empty() {
            return Err(ConfigError::NoInterface);
        }
        if config.server.message_size_limit == 0 {
            return Err(ConfigError::Zero("server.message_size_limit"));
        }
        if config.server.smtp.rcpt_count_max == 0 {
            return Err(ConfigError::Zero("server.smtp.rcpt_count_max"));
        }

        config
            .storage
            .prefix_pattern
            .render(time::OffsetDateTime::now_utc())?;

        config.policy.dnsbl_zones = config
            .policy
            .dnsbl_zones
            .iter()
            .map(|zone| zone.trim().trim_end_matches('.').to_string())
            .filter(|zone| !zone.is_empty())
            .collect();

        let ehlo = config.ehlo_reply()?;
        config.server.smtp.codes.insert(CodeID::Ehlo, ehlo);

        let default_values = FieldServerSMTP::default_smtp_codes();
        let name = config.server.name.clone();
        let reply_codes = &mut config.server.smtp.codes;

        for key in <CodeID as strum::IntoEnumIterator>::iter() {
            let reply = match reply_codes.remove(&key).or_else(|| default_values.get(&key).cloned()) {
                Some(reply) => reply,
                None => continue,
            };

            let reply = reply
                .to_string()
                .replace("{name}", &name)
                .parse::<Reply>()
                .map_err(|e| ConfigError::Reply {
                    code: key,
                    reason: e.to_string(),
                })?;
            reply_codes.insert(key, reply);
        }

        Ok(config)
    }
}
