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
use trust_dns_resolver::{
    error::{ResolveError, ResolveErrorKind},
    TokioAsyncResolver,
};

/// Result of a reputation zone query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The name resolves, the address is listed by the zone.
    Listed,
    /// The zone does not list the address.
    NotListed,
    /// The query could not be answered.
    Failed(String),
}

/// Address resolution used to query the reputation zones.
#[async_trait::async_trait]
pub trait DnsLookup: Send + Sync {
    /// Resolve `name` to an address.
    async fn lookup(&self, name: &str) -> LookupOutcome;
}

#[async_trait::async_trait]
impl DnsLookup for TokioAsyncResolver {
    async fn lookup(&self, name: &str) -> LookupOutcome {
        // rooted, the search domains of the system must not be appended
        match self.lookup_ip(format!("{name}.")).await {
            Ok(lookup) if lookup.iter().next().is_some() => LookupOutcome::Listed,
            Ok(_) => LookupOutcome::NotListed,
            Err(error) => match error.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => LookupOutcome::NotListed,
                _ => LookupOutcome::Failed(error.to_string()),
            },
        }
    }
}

/// Reject the clients listed by a DNS blocklist.
pub struct ReputationGate {
    lookup: Option<std::sync::Arc<dyn DnsLookup>>,
    zones: Vec<String>,
}

impl ReputationGate {
    /// The empty zones are discarded.
    #[must_use]
    pub fn new(lookup: std::sync::Arc<dyn DnsLookup>, zones: &[String]) -> Self {
        Self {
            lookup: Some(lookup),
            zones: zones
                .iter()
                .map(|zone| zone.trim().trim_end_matches('.'))
                .filter(|zone| !zone.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Accept every client.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            lookup: None,
            zones: vec![],
        }
    }

    /// Query the zones of the configuration with the resolver it defines.
    /// No resolver is built if there is no zone.
    ///
    /// # Errors
    ///
    /// * the resolver cannot be built
    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        if config.policy.dnsbl_zones.is_empty() {
            return Ok(Self::disabled());
        }

        let resolver = mailstash_config::build_resolver(config)?;
        Ok(Self::new(
            std::sync::Arc::new(resolver),
            &config.policy.dnsbl_zones,
        ))
    }

    /// No zone is configured, every client is accepted without any query.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.lookup.is_none() || self.zones.is_empty()
    }

    /// The `peer_ip` is listed by one of the zones, queried in order.
    ///
    /// Only IPv4 addresses are checked. A query that fails is logged and
    /// considered as not listed.
    #[tracing::instrument(name = "reputation", skip(self))]
    pub async fn is_blocked(&self, peer_ip: &str) -> bool {
        let lookup = match &self.lookup {
            Some(lookup) if !self.zones.is_empty() => lookup,
            _ => return false,
        };

        let ip = match peer_ip.parse::<std::net::IpAddr>() {
            Ok(std::net::IpAddr::V4(ip)) => ip,
            Ok(std::net::IpAddr::V6(_)) | Err(_) => {
                tracing::debug!("Not an IPv4 address, skipping the reputation zones.");
                return false;
            }
        };

        let [a, b, c, d] = ip.octets();
        let reversed = format!("{d}.{c}.{b}.{a}");

        for zone in &self.zones {
            let qname = format!("{reversed}.{zone}");

            match lookup.lookup(&qname).await {
                LookupOutcome::Listed => {
                    tracing::info!(%zone, "Client listed.");
                    return true;
                }
                LookupOutcome::NotListed => {
                    tracing::trace!(%zone, "Client not listed.");
                }
                LookupOutcome::Failed(error) => {
                    tracing::warn!(%zone, %qname, %error, "Reputation zone query failure.");
                }
            }
        }

        false
    }
}
