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

use crate::ConfigError;
use mailstash_common::SMTP_PORT;
use toml::value::{Table, Value};

/// Values replacing the fields of the configuration file, usually read from the
/// command line or the environment.
///
/// Every field left to `None` keeps the value of the file (or its default).
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `storage.credentials.access_key_id`
    pub access_key_id: Option<String>,
    /// `storage.credentials.secret_access_key`
    pub secret_access_key: Option<String>,
    /// `storage.endpoint`
    pub endpoint: Option<String>,
    /// `storage.prefix_pattern`
    pub prefix_pattern: Option<String>,
    /// Host to listen on, replacing `server.interfaces.addr`. Defaults to `127.0.0.1`
    /// if only the port is set.
    pub hostname: Option<String>,
    /// Port to listen on, replacing `server.interfaces.addr`. Defaults to
    /// [`SMTP_PORT`] if only the host is set.
    pub port: Option<u16>,
    /// `server.message_size_limit`
    pub data_size_limit: Option<usize>,
    /// `policy.rcpt_regex`
    pub rcpt_regex: Option<String>,
    /// `policy.dnsbl_zones`, comma separated.
    pub dnsbl_zones: Option<String>,
    /// `server.logs.level`
    pub log_level: Option<String>,
}

impl std::fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "********"),
            )
            .field("endpoint", &self.endpoint)
            .field("prefix_pattern", &self.prefix_pattern)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("data_size_limit", &self.data_size_limit)
            .field("rcpt_regex", &self.rcpt_regex)
            .field("dnsbl_zones", &self.dnsbl_zones)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn section<'a>(table: &'a mut Table, key: &'static str) -> Result<&'a mut Table, ConfigError> {
    match table
        .entry(key.to_string())
        .or_insert_with(|| Value::Table(Table::new()))
    {
        Value::Table(section) => Ok(section),
        _ => Err(ConfigError::Override(key)),
    }
}

/// Split a comma separated list of zones, dropping the empty entries.
pub(crate) fn split_zones(zones: &str) -> Vec<String> {
    zones
        .split(',')
        .map(str::trim)
        .filter(|zone| !zone.is_empty())
        .map(str::to_string)
        .collect()
}

impl ConfigOverrides {
    fn listen_addr(&self) -> Result<Option<Vec<String>>, ConfigError> {
        if self.hostname.is_none() && self.port.is_none() {
            return Ok(None);
        }

        let host = self.hostname.as_deref().unwrap_or("127.0.0.1");
        let port = self.port.unwrap_or(SMTP_PORT);

        let addr = std::net::ToSocketAddrs::to_socket_addrs(&(host, port))
            .map_err(|source| ConfigError::Interface {
                addr: format!("{host}:{port}"),
                source,
            })?
            .map(|addr| addr.to_string())
            .collect::<Vec<_>>();

        Ok(Some(addr))
    }

    /// Write the overrides into the parsed document.
    ///
    /// # Errors
    ///
    /// * a section of the document is not a table
    /// * the listening address cannot be resolved
    pub fn apply(&self, table: &mut Table) -> Result<(), ConfigError> {
        if self.access_key_id.is_some() || self.secret_access_key.is_some() {
            let credentials = section(section(table, "storage")?, "credentials")?;
            if let Some(access_key_id) = &self.access_key_id {
                credentials.insert(
                    "access_key_id".to_string(),
                    Value::String(access_key_id.clone()),
                );
            }
            if let Some(secret_access_key) = &self.secret_access_key {
                credentials.insert(
                    "secret_access_key".to_string(),
                    Value::String(secret_access_key.clone()),
                );
            }
        }

        if let Some(endpoint) = &self.endpoint {
            section(table, "storage")?.insert("endpoint".to_string(), Value::String(endpoint.clone()));
        }
        if let Some(prefix_pattern) = &self.prefix_pattern {
            section(table, "storage")?.insert(
                "prefix_pattern".to_string(),
                Value::String(prefix_pattern.clone()),
            );
        }

        if let Some(addr) = self.listen_addr()? {
            tracing::debug!(?addr, "Listening addresses replaced.");
            section(section(table, "server")?, "interfaces")?.insert(
                "addr".to_string(),
                Value::Array(addr.into_iter().map(Value::String).collect()),
            );
        }
        if let Some(data_size_limit) = self.data_size_limit {
            section(table, "server")?.insert(
                "message_size_limit".to_string(),
                Value::Integer(i64::try_from(data_size_limit).unwrap_or(i64::MAX)),
            );
        }
        if let Some(log_level) = &self.log_level {
            section(section(table, "server")?, "logs")?
                .insert("level".to_string(), Value::String(log_level.clone()));
        }

        if let Some(rcpt_regex) = &self.rcpt_regex {
            section(table, "policy")?
                .insert("rcpt_regex".to_string(), Value::String(rcpt_regex.clone()));
        }
        if let Some(dnsbl_zones) = &self.dnsbl_zones {
            section(table, "policy")?.insert(
                "dnsbl_zones".to_string(),
                Value::Array(
                    split_zones(dnsbl_zones)
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                ),
            );
        }

        Ok(())
    }
}
