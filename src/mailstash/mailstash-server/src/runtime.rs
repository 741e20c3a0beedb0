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

use crate::{storage::S3Store, Pipeline, Server};
use anyhow::Context;
use mailstash_config::Config;

/// Why the relay stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// The runtime returned, or its timeout elapsed.
    Finished,
    /// A termination signal was received.
    Signal(i32),
}

/// Run `future` on a dedicated multi-thread runtime, living in its own thread.
/// [`Stop::Finished`] is sent on `stop` once the future completes, and the
/// output of the future is returned by the thread.
fn spawn_runtime<F>(
    stop: tokio::sync::mpsc::Sender<Stop>,
    name: &'static str,
    future: F,
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<std::thread::JoinHandle<anyhow::Result<()>>>
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(format!("{name}-worker"))
        .build()?;

    let handle = std::thread::Builder::new()
        .name(format!("{name}-main"))
        .spawn(move || {
            let output = runtime.block_on(async move {
                tracing::info!(name, "Runtime started successfully.");

                let Some(duration) = timeout else {
                    return future.await;
                };
                tokio::time::timeout(duration, future)
                    .await
                    .unwrap_or_else(|_| {
                        tracing::info!(name, ?duration, "Runtime timed out.");
                        Ok(())
                    })
            });

            if stop.blocking_send(Stop::Finished).is_err() {
                tracing::debug!(name, "Nobody waits for the runtime to stop.");
            }
            output
        })?;

    Ok(handle)
}

async fn serve(
    config: std::sync::Arc<Config>,
    sockets: Vec<std::net::TcpListener>,
) -> anyhow::Result<()> {
    let store = std::sync::Arc::new(S3Store::new(config.storage.clone()));
    let pipeline = Pipeline::from_config(&config, store)?;

    Server::new(config, pipeline)
        .listen_and_serve(sockets)
        .await
        .context("receiver failure")
}

/// Run `future` in the runtime `name`, and block until it completes or a
/// termination signal is received.
fn supervise<F>(
    name: &'static str,
    future: F,
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let (stop, mut stopped) = tokio::sync::mpsc::channel::<Stop>(2);

    let runtime = spawn_runtime(stop.clone(), name, future, timeout)?;

    // SIGTERM from `systemctl stop` or `docker stop`, SIGINT from a terminal.
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
    ])?;
    let signals_handle = signals.handle();
    std::thread::spawn(move || {
        for signal in signals.forever() {
            if stop.blocking_send(Stop::Signal(signal)).is_err() {
                return;
            }
        }
    });

    let outcome = match stopped.blocking_recv() {
        Some(Stop::Signal(signal)) => {
            tracing::warn!(signal, "Stopping the relay.");
            Ok(())
        }
        Some(Stop::Finished) | None => runtime
            .join()
            .map_err(|_| anyhow::anyhow!("runtime `{name}` panicked"))?,
    };
    signals_handle.close();

    match &outcome {
        Ok(()) => tracing::info!("Relay stopped."),
        Err(error) => tracing::error!(%error, "Relay stopped on failure."),
    }
    outcome
}

/// Start the relay on `sockets`, and block until it stops or a termination
/// signal is received.
///
/// # Errors
///
/// * the runtime cannot be built
/// * the signal handler cannot be registered
/// * the receiver cannot be built from `config`, or fails while serving
#[allow(clippy::module_name_repetitions)]
pub fn start_runtime(
    config: Config,
    sockets: Vec<std::net::TcpListener>,
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    supervise(
        "receiver",
        serve(std::sync::Arc::new(config), sockets),
        timeout,
    )
}

#[cfg(test)]
mod tests {
    use super::{start_runtime, supervise};
    use crate::socket_bind_anyhow;

    #[test]
    fn stops_after_timeout() -> anyhow::Result<()> {
        start_runtime(
            mailstash_test::config::local_test(),
            vec![socket_bind_anyhow("127.0.0.1:0")?],
            Some(std::time::Duration::from_millis(100)),
        )
    }

    #[test]
    fn failure_is_returned() {
        let error = supervise(
            "failing",
            async { Err(anyhow::anyhow!("resolver unavailable")) },
            None,
        )
        .unwrap_err();

        assert_eq!(error.to_string(), "resolver unavailable");
    }
}
