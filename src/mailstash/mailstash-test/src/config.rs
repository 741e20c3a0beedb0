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

use mailstash_config::{
    field::{Compression, FieldServerSMTPError},
    Config,
};

/// Prefix pattern of [`local_test`].
pub const TEST_PREFIX_PATTERN: &str = "s3://mailstash-test/emails/{YYYY}/{MM}";

fn builder(
    message_size_limit: usize,
) -> mailstash_config::builder::Builder<mailstash_config::builder::WantsStorage> {
    Config::builder()
        .with_server_name_and_limits("testserver.com", 16, message_size_limit)
        .with_ipv4_localhost()
        .with_default_logs_settings()
        .with_smtp_options(
            10,
            FieldServerSMTPError {
                soft_count: 5,
                hard_count: 10,
                delay: std::time::Duration::from_millis(10),
            },
            std::time::Duration::from_secs(5),
        )
        .with_system_dns()
}

/// Get a config for local test, archiving gzip objects under
/// [`TEST_PREFIX_PATTERN`].
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn local_test() -> Config {
    builder(33_554_432)
        .with_prefix_pattern(TEST_PREFIX_PATTERN)
        .unwrap()
        .with_default_policy()
        .validate()
        .unwrap()
}

/// Same as [`local_test`], with uncompressed objects and a custom message size limit.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn local_test_uncompressed(message_size_limit: usize) -> Config {
    builder(message_size_limit)
        .with_storage(
            mailstash_common::PathTemplate::new(TEST_PREFIX_PATTERN).unwrap(),
            None,
            None,
            Compression::None,
        )
        .with_default_policy()
        .validate()
        .unwrap()
}
