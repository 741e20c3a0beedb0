//!
//! # Configuration
//!
//! The type [`Config`] expose three methods :
//! * [`Config::builder`] to create a new configuration builder.
//! * [`Config::from_toml`] to read a configuration from a TOML file.
//! * [`Config::from_toml_with_overrides`] to read a configuration from a TOML file,
//!   some fields being replaced by the command line or the environment.
//!
//! # Example
//!
//! ```toml
//! [server]
//! name = "intake.example.com"
//! interfaces = { addr = ["0.0.0.0:8025"] }
//!
//! [storage]
//! prefix_pattern = "s3://mybucket/emails/{YYYY}/{MM}/{dd}"
//! endpoint = "http://localhost:9000"
//!
//! [policy]
//! dnsbl_zones = ["zen.spamhaus.org"]
//! ```

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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::use_self)] // false positive


mod parser {
    pub mod log_level;
    pub mod rcpt_pattern;
    pub mod socket_addr;
}

/// The configuration builder for programmatically instantiating
pub mod builder {
    mod wants;
    mod with;

    pub(crate) mod validate;
    pub use wants::*;
    pub use with::*;
}

mod config;
mod default;
mod dns_resolver;
mod ensure;
mod error;
mod overrides;

pub use config::{field, Config};
pub use dns_resolver::build_resolver;
pub use error::ConfigError;
pub use overrides::ConfigOverrides;

use builder::{Builder, WantsServer};

impl Config {
    /// Create an instance of [`Builder`].
    #[must_use]
    pub const fn builder() -> Builder<WantsServer> {
        Builder {
            state: WantsServer(()),
        }
    }

    /// Parse a [`Config`] with [TOML] format
    ///
    /// # Errors
    ///
    /// * data is not a valid [TOML]
    /// * one field is unknown
    /// * a mandatory field is not provided (no default value)
    /// * see [`ConfigError`] for the validation
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with_overrides(input, &ConfigOverrides::default())
    }

    /// Parse a [`Config`] with [TOML] format, then replace the fields set in `overrides`
    /// before the validation.
    ///
    /// # Errors
    ///
    /// * see [`Config::from_toml`]
    /// * an override cannot be applied
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml_with_overrides(
        input: &str,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut table = toml::from_str::<toml::value::Table>(input)?;
        overrides.apply(&mut table)?;

        toml::Value::Table(table)
            .try_into::<Self>()
            .map_err(ConfigError::from)
            .and_then(Self::ensure)
    }
}
