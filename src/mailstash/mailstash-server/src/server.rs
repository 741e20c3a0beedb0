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

use crate::receiver::handler::{Pipeline, TransactionHandler};
use anyhow::Context;
use mailstash_common::CodeID;
use mailstash_config::Config;
use mailstash_protocol::Receiver;
use tokio_stream::StreamExt;

/// TCP/IP server
pub struct Server {
    config: std::sync::Arc<Config>,
    pipeline: Pipeline,
}

/// Create a `TCPListener` ready to be listened to
///
/// # Errors
///
/// * failed to bind to the socket address
/// * failed to set the listener to non blocking
pub fn socket_bind_anyhow<A: std::net::ToSocketAddrs + std::fmt::Debug>(
    addr: A,
) -> anyhow::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind socket on addr: '{addr:?}'"))?;

    socket
        .set_nonblocking(true)
        .with_context(|| format!("Failed to set non-blocking socket on addr: '{addr:?}'"))?;

    Ok(socket)
}

type ListenerStreamItem = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>;

fn listener_to_stream(
    listener: &tokio::net::TcpListener,
) -> impl tokio_stream::Stream<Item = ListenerStreamItem> + '_ {
    async_stream::try_stream! {
        loop {
            let client = listener.accept().await?;
            yield client;
        }
    }
}

impl Server {
    /// Create a server sharing `pipeline` between the sessions.
    #[must_use]
    pub fn new(config: std::sync::Arc<Config>, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    #[tracing::instrument(name = "handle-client", skip_all, fields(client = %client_addr, server = %server_addr))]
    async fn handle_client(
        &self,
        client_counter: std::sync::Arc<std::sync::atomic::AtomicI64>,
        mut stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        tracing::info!("Connection accepted.");

        if self.config.server.client_count_max != -1
            && client_counter.load(std::sync::atomic::Ordering::SeqCst)
                >= self.config.server.client_count_max
        {
            tracing::warn!(
                max = self.config.server.client_count_max,
                "Connection count max reached, rejecting connection.",
            );

            if let Some(reply) = self.config.server.smtp.codes.get(&CodeID::ConnectionMaxReached) {
                if let Err(error) =
                    tokio::io::AsyncWriteExt::write_all(&mut stream, reply.as_ref().as_bytes())
                        .await
                {
                    tracing::error!(%error, "Code delivery failure.");
                }
            }

            if let Err(error) = tokio::io::AsyncWriteExt::shutdown(&mut stream).await {
                tracing::error!(%error, "Closing connection failure.");
            }
            return;
        }

        client_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let session = Self::run_session(
            self.config.clone(),
            self.pipeline.clone(),
            stream,
            client_addr,
            server_addr,
        );
        tokio::spawn(async move {
            session.await;
            client_counter.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        });
    }

    /// Main loop of the relay.
    ///
    /// # Errors
    ///
    /// * failed to convert sockets to `[tokio::net::TcpListener]`
    #[tracing::instrument(name = "serve", skip_all)]
    pub async fn listen_and_serve(self, sockets: Vec<std::net::TcpListener>) -> anyhow::Result<()> {
        let client_counter = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(0));

        let listeners = sockets
            .into_iter()
            .map(tokio::net::TcpListener::from_std)
            .collect::<std::io::Result<Vec<tokio::net::TcpListener>>>()?;

        let mut map = tokio_stream::StreamMap::new();
        for listener in &listeners {
            map.insert(listener.local_addr()?, Box::pin(listener_to_stream(listener)));
        }

        tracing::info!(
            interfaces = ?map.keys().collect::<Vec<_>>(),
            "Listening for clients.",
        );

        while let Some((server_addr, client)) = map.next().await {
            let (stream, client_addr) = match client {
                Ok(client) => client,
                Err(error) => {
                    tracing::warn!(%server_addr, %error, "Accept failure.");
                    continue;
                }
            };

            self.handle_client(client_counter.clone(), stream, client_addr, server_addr)
                .await;
        }

        Ok(())
    }

    /// Run the SMTP session of a client until it quits or the connection is lost.
    pub async fn run_session(
        config: std::sync::Arc<Config>,
        pipeline: Pipeline,
        stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        let smtp = &config.server.smtp;
        let receiver = Receiver::from_tcp(
            stream,
            TransactionHandler::new(config.clone(), pipeline),
            smtp.error.soft_count,
            smtp.error.hard_count,
            config.server.message_size_limit,
            smtp.timeout_client,
        );

        let smtp_stream = receiver.into_stream(
            client_addr,
            server_addr,
            time::OffsetDateTime::now_utc(),
            uuid::Uuid::new_v4(),
        );
        tokio::pin!(smtp_stream);

        while let Some(message) = smtp_stream.next().await {
            if let Err(error) = message {
                tracing::warn!(%error, "Connection closing failure.");
                return;
            }
        }

        tracing::info!("Connection closed cleanly.");
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        archive::ArchivalWriter, recipient::RecipientValidator, reputation::ReputationGate,
        socket_bind_anyhow, storage::MemoryStore, Pipeline, Server,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn pipeline(config: &mailstash_config::Config) -> Pipeline {
        Pipeline {
            gate: std::sync::Arc::new(ReputationGate::disabled()),
            validator: std::sync::Arc::new(RecipientValidator::from_config(config)),
            writer: std::sync::Arc::new(ArchivalWriter::new(
                std::sync::Arc::new(MemoryStore::default()),
                config.storage.compression,
            )),
        }
    }

    async fn read_reply(stream: &mut tokio::net::TcpStream) -> String {
        let mut buffer = vec![0; 1024];
        let size = stream.read(&mut buffer).await.unwrap();
        String::from_utf8(buffer[..size].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn basic() {
        let config = mailstash_test::config::local_test();
        let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();

        let server = Server::new(std::sync::Arc::new(config.clone()), pipeline(&config));
        tokio::time::timeout(
            std::time::Duration::from_millis(10),
            server.listen_and_serve(vec![socket]),
        )
        .await
        .unwrap_err();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_client_max() {
        let mut config = mailstash_test::config::local_test();
        config.server.client_count_max = 1;

        let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();

        let server = Server::new(std::sync::Arc::new(config.clone()), pipeline(&config));
        let server = tokio::spawn(server.listen_and_serve(vec![socket]));

        let mut first = tokio::net::TcpStream::connect(addr).await.unwrap();
        assert!(read_reply(&mut first).await.starts_with("220 "));

        let mut second = tokio::net::TcpStream::connect(addr).await.unwrap();
        assert!(read_reply(&mut second).await.starts_with("554 "));

        first.write_all(b"QUIT\r\n").await.unwrap();
        assert!(read_reply(&mut first).await.starts_with("221 "));

        server.abort();
    }
}
