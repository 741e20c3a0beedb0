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

use mailstash_config::ConfigOverrides;

///
#[non_exhaustive]
#[derive(clap::Parser)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[clap(about, author, version)]
pub struct Args {
    /// Path of the mailstash configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    /// Stop the server after this duration (e.g. `10s`, `5min`)
    #[clap(short, long, value_parser = humantime::parse_duration)]
    pub timeout: Option<std::time::Duration>,

    ///
    #[clap(flatten)]
    pub overrides: OverrideArgs,

    ///
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

///
#[non_exhaustive]
#[derive(clap::Subcommand)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum Commands {
    /// Show the loaded config (as toml)
    ConfigShow,
}

/// Values replacing the fields of the configuration file.
#[derive(Default, clap::Args)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub struct OverrideArgs {
    /// Access key of the object storage
    #[clap(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    /// Secret key of the object storage
    #[clap(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Url of an S3 compatible endpoint
    #[clap(long, env = "S3_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Storage key prefix, e.g. `s3://bucket/emails/{YYYY}/{MM}`
    #[clap(long, env = "S3_PREFIX_PATTERN")]
    pub prefix_pattern: Option<String>,

    /// Host to listen on
    #[clap(long, env = "SMTP_HOSTNAME")]
    pub hostname: Option<String>,

    /// Port to listen on
    #[clap(long, env = "SMTP_PORT")]
    pub port: Option<u16>,

    /// Maximum size of a message, in bytes
    #[clap(long, env = "SMTP_DATA_SIZE_LIMIT")]
    pub data_size_limit: Option<usize>,

    /// Pattern the recipients must fully match
    #[clap(long, env = "SMTP_RCPT_REGEX")]
    pub rcpt_regex: Option<String>,

    /// Comma separated reputation zones queried for every sender
    #[clap(long, env = "DNSBL_ZONES")]
    pub dnsbl_zones: Option<String>,

    /// `ERROR`, `WARNING`, `INFO`, `DEBUG` or `TRACE`
    #[clap(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(value: OverrideArgs) -> Self {
        Self {
            access_key_id: value.access_key_id,
            secret_access_key: value.secret_access_key,
            endpoint: value.endpoint_url,
            prefix_pattern: value.prefix_pattern,
            hostname: value.hostname,
            port: value.port,
            data_size_limit: value.data_size_limit,
            rcpt_regex: value.rcpt_regex,
            dnsbl_zones: value.dnsbl_zones,
            log_level: value.log_level,
        }
    }
}
