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

use mailstash_config::Config;

#[cfg(debug_assertions)]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_ansi(false)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_target(false)
            .with_ansi(false)
    };
}

fn file_writer(
    filepath: &std::path::Path,
) -> anyhow::Result<tracing_appender::rolling::RollingFileAppender> {
    if let (Some(directory), Some(file_name)) = (
        filepath.parent(),
        filepath.file_name().and_then(std::ffi::OsStr::to_str),
    ) {
        Ok(tracing_appender::rolling::never(directory, file_name))
    } else {
        anyhow::bail!("filepath for logs at {filepath:?} does not have a parent or is not valid")
    }
}

/// Initialize the tracing subsystem: the logs are written to stdout, and
/// appended to `server.logs.filepath` if set.
///
/// # Errors
///
/// * The logs path in the configuration file is invalid.
/// * Failed to initialize the tracing subsystem.
pub fn initialize(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = tracing::Level::from(config.server.logs.level);

    let file_layer = config
        .server
        .logs
        .filepath
        .as_deref()
        .map(file_writer)
        .transpose()?
        .map(|writer| get_fmt!().with_writer(writer));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::from_level(level).into()),
        )
        .with(get_fmt!().with_writer(std::io::stdout).with_ansi(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::file_writer;

    #[test]
    fn invalid_filepath() {
        assert!(file_writer(std::path::Path::new("/")).is_err());
        assert!(file_writer(std::path::Path::new("..")).is_err());
    }
}
