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

use crate::{
    config::field::{FieldServerDNS, ResolverOptsWrapper},
    Config,
};
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveError,
    TokioAsyncResolver,
};

fn resolver_opts_from_config(config: &ResolverOptsWrapper) -> ResolverOpts {
    let mut opts = ResolverOpts::default();

    opts.timeout = config.timeout;
    opts.attempts = config.attempts;
    opts.rotate = config.rotate;
    opts.cache_size = config.cache_size;
    opts.use_hosts_file = config.use_hosts_file;
    opts.num_concurrent_reqs = config.num_concurrent_reqs;

    opts
}

/// Build the resolver used to query the reputation zones.
///
/// # Errors
///
/// * could not initialize the DNS resolver (for instance an unreadable `/etc/resolv.conf`)
pub fn build_resolver(config: &Config) -> Result<TokioAsyncResolver, ResolveError> {
    match &config.server.dns {
        FieldServerDNS::System => TokioAsyncResolver::tokio_from_system_conf(),
        FieldServerDNS::Google { options } => {
            TokioAsyncResolver::tokio(ResolverConfig::google(), resolver_opts_from_config(options))
        }
        FieldServerDNS::CloudFlare { options } => TokioAsyncResolver::tokio(
            ResolverConfig::cloudflare(),
            resolver_opts_from_config(options),
        ),
    }
}
