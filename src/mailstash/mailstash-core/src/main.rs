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

use anyhow::Context;
use mailstash::{Args, Commands};
use mailstash_config::{Config, ConfigOverrides};
use mailstash_server::{socket_bind_anyhow, start_runtime};

fn main() {
    if let Err(err) = try_main() {
        let error = format!("mailstash terminating error: '{err}'");

        eprintln!("{error}");
        tracing::error!(error);
        err.chain().skip(1).for_each(|cause| {
            let reason = format!("because: {cause}");

            eprintln!("{reason}");
            tracing::error!(reason);
        });
        std::process::exit(1);
    }
}

fn bind_sockets(addr: &[std::net::SocketAddr]) -> anyhow::Result<Vec<std::net::TcpListener>> {
    addr.iter()
        .copied()
        .map(socket_bind_anyhow)
        .collect::<anyhow::Result<Vec<std::net::TcpListener>>>()
}

fn try_main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    let input = args.config.as_ref().map_or_else(
        || Ok(String::new()),
        |config| std::fs::read_to_string(config).context(format!("Cannot read file '{config}'")),
    )?;

    let config = Config::from_toml_with_overrides(&input, &ConfigOverrides::from(args.overrides))
        .context("Cannot parse the configuration")?;

    if let Some(Commands::ConfigShow) = args.command {
        println!("{}", toml::to_string(&config)?);
        return Ok(());
    }

    mailstash::tracing_subscriber::initialize(&config)?;

    tracing::info!(
        level = ?config.server.logs.level,
        filepath = ?config.server.logs.filepath,
        "mailstash logs initialized.",
    );

    let sockets = bind_sockets(&config.server.interfaces.addr)?;
    tracing::info!(
        interfaces = ?config.server.interfaces.addr,
        prefix_pattern = %config.storage.prefix_pattern,
        dnsbl_zones = ?config.policy.dnsbl_zones,
        "Listening.",
    );

    start_runtime(config, sockets, args.timeout)
}
