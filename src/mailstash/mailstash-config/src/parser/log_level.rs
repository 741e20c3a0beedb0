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

use crate::{field::LogLevel, ConfigError};

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" | "FATAL" | "ERROR" => Ok(Self::Error),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            "NOTSET" | "TRACE" => Ok(Self::Trace),
            _ => Err(ConfigError::LogLevel(s.to_string())),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{field::LogLevel, ConfigError};

    #[rstest::rstest]
    #[case("CRITICAL", LogLevel::Error)]
    #[case("FATAL", LogLevel::Error)]
    #[case("ERROR", LogLevel::Error)]
    #[case("WARN", LogLevel::Warn)]
    #[case("WARNING", LogLevel::Warn)]
    #[case("warning", LogLevel::Warn)]
    #[case("INFO", LogLevel::Info)]
    #[case("Debug", LogLevel::Debug)]
    #[case("NOTSET", LogLevel::Trace)]
    #[case("trace", LogLevel::Trace)]
    fn parse(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().unwrap(), expected);
    }

    #[test]
    fn unknown() {
        assert!(matches!(
            "VERBOSE".parse::<LogLevel>(),
            Err(ConfigError::LogLevel(level)) if level == "VERBOSE"
        ));
    }

    #[test]
    fn display_round_trip() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }
}
