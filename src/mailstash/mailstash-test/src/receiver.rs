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
use mailstash_protocol::Receiver;
use mailstash_server::{
    ArchivalWriter, DnsLookup, LookupOutcome, MemoryStore, Pipeline, RecipientValidator,
    ReputationGate, TransactionHandler,
};
use tokio_stream::StreamExt;

/// A type implementing Write+Read to emulate sockets
#[derive(Debug)]
pub struct Mock<'a, T: AsRef<[u8]> + Unpin> {
    read_cursor: std::io::Cursor<T>,
    write_cursor: std::io::Cursor<&'a mut Vec<u8>>,
}

impl<'a, T: AsRef<[u8]> + Unpin> Mock<'a, T> {
    /// Create an new instance
    pub fn new(read: T, write: &'a mut Vec<u8>) -> Self {
        Self {
            read_cursor: std::io::Cursor::new(read),
            write_cursor: std::io::Cursor::new(write),
        }
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncRead for Mock<'_, T> {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.read_cursor).poll_read(cx, buf)
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncWrite for Mock<'_, T> {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::task::Poll::Ready(std::io::Write::write(&mut self.write_cursor, buf))
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(std::io::Write::flush(&mut self.write_cursor))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// Reputation zones answering from a fixed list of listed names.
pub struct StaticZones {
    listed: Vec<String>,
}

impl StaticZones {
    /// `listed` are the queried names, without the trailing `.`.
    #[must_use]
    pub fn new(listed: &[&str]) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            listed: listed.iter().map(ToString::to_string).collect(),
        })
    }
}

#[async_trait::async_trait]
impl DnsLookup for StaticZones {
    async fn lookup(&self, name: &str) -> LookupOutcome {
        if self.listed.iter().any(|listed| listed == name) {
            LookupOutcome::Listed
        } else {
            LookupOutcome::NotListed
        }
    }
}

/// Build the components of the sessions, archiving into `store`.
#[must_use]
pub fn memory_pipeline(
    config: &Config,
    store: std::sync::Arc<MemoryStore>,
    gate: ReputationGate,
) -> Pipeline {
    Pipeline {
        gate: std::sync::Arc::new(gate),
        validator: std::sync::Arc::new(RecipientValidator::from_config(config)),
        writer: std::sync::Arc::new(ArchivalWriter::new(store, config.storage.compression)),
    }
}

/// Run a session fed with `smtp_input`, and assert the replies of the server
/// are `expected_output`.
///
/// # Errors
///
/// * the session failed on an io error
///
/// # Panics
///
/// * the output is not the expected one
pub async fn test_receiver_inner(
    smtp_input: &[u8],
    expected_output: &[u8],
    config: std::sync::Arc<Config>,
    pipeline: Pipeline,
) -> anyhow::Result<()> {
    let mut written_data = Vec::new();
    let result = {
        let (read, write) = tokio::io::split(Mock::new(smtp_input.to_vec(), &mut written_data));
        let smtp = &config.server.smtp;

        let receiver = Receiver::new(
            read,
            write,
            TransactionHandler::new(config.clone(), pipeline),
            smtp.error.soft_count,
            smtp.error.hard_count,
            config.server.message_size_limit,
            smtp.timeout_client,
        );
        let stream = receiver.into_stream(
            "127.0.0.1:53844".parse()?,
            "127.0.0.1:8025".parse()?,
            time::OffsetDateTime::now_utc(),
            uuid::Uuid::new_v4(),
        );
        tokio::pin!(stream);

        let mut result = Ok(());
        while let Some(message) = stream.next().await {
            if let Err(error) = message {
                result = Err(anyhow::Error::new(error));
                break;
            }
        }
        result
    };

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&written_data),
    );

    result
}

/// Call `test_receiver_inner`, and produce the storage written by the session.
#[allow(clippy::module_name_repetitions)]
#[macro_export]
macro_rules! test_receiver {
    ($input:expr, $output:expr) => {
        test_receiver! {
            with_config => $crate::config::local_test(),
            $input,
            $output
        }
    };
    (with_config => $config:expr, $input:expr, $output:expr) => {
        test_receiver! {
            with_gate => mailstash_server::ReputationGate::disabled(),
            with_config => $config,
            $input,
            $output
        }
    };
    (with_gate => $gate:expr, with_config => $config:expr, $input:expr, $output:expr) => {
        test_receiver! {
            with_store => mailstash_server::MemoryStore::default(),
            with_gate => $gate,
            with_config => $config,
            $input,
            $output
        }
    };
    (with_store => $store:expr, with_gate => $gate:expr, with_config => $config:expr, $input:expr, $output:expr) => {{
        let config = std::sync::Arc::new($config);
        let store = std::sync::Arc::new($store);
        $crate::receiver::test_receiver_inner(
            $input.as_bytes(),
            $output.as_bytes(),
            config.clone(),
            $crate::receiver::memory_pipeline(&config, store.clone(), $gate),
        )
        .await
        .map(|()| store)
    }};
}
