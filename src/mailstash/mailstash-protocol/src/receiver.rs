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
    AcceptArgs, EhloArgs, HeloArgs, ErrorCounter, MailFromArgs, RcptToArgs, Reader,
    ReceiverHandler, Verb, Writer,
};
use mailstash_common::Stage;
use tokio_stream::StreamExt;

enum HandshakeOutcome {
    Message,
    Quit,
}

/// An handle to send event from the [`ReceiverHandler`] to the [`Receiver`].
#[allow(clippy::module_name_repetitions)]
#[derive(Default)]
pub struct ReceiverContext {
    outcome: Option<HandshakeOutcome>,
}

impl ReceiverContext {
    /// Make the [`Receiver`] quit the connection after the current reply.
    pub fn deny(&mut self) {
        self.outcome = Some(HandshakeOutcome::Quit);
    }
}

/// A SMTP receiver.
pub struct Receiver<
    T: ReceiverHandler + Send,
    W: tokio::io::AsyncWrite + Unpin + Send,
    R: tokio::io::AsyncRead + Unpin + Send,
> {
    handler: T,
    writer: Writer<W>,
    reader: Reader<R>,
    error_counter: ErrorCounter,
    context: ReceiverContext,
    message_size_max: usize,
    timeout_client: std::time::Duration,
}

impl<T: ReceiverHandler + Send>
    Receiver<T, tokio::net::tcp::OwnedWriteHalf, tokio::net::tcp::OwnedReadHalf>
{
    /// Create a new [`Receiver`] from a TCP/IP stream.
    pub fn from_tcp(
        tcp_stream: tokio::net::TcpStream,
        handler: T,
        threshold_soft_error: i64,
        threshold_hard_error: i64,
        message_size_max: usize,
        timeout_client: std::time::Duration,
    ) -> Self {
        let (read, write) = tcp_stream.into_split();
        Self::new(
            read,
            write,
            handler,
            threshold_soft_error,
            threshold_hard_error,
            message_size_max,
            timeout_client,
        )
    }
}

impl<
        T: ReceiverHandler + Send,
        W: tokio::io::AsyncWrite + Unpin + Send,
        R: tokio::io::AsyncRead + Unpin + Send,
    > Receiver<T, W, R>
{
    /// Create a new [`Receiver`] from a pair of reader and writer.
    pub fn new(
        read: R,
        write: W,
        handler: T,
        threshold_soft_error: i64,
        threshold_hard_error: i64,
        message_size_max: usize,
        timeout_client: std::time::Duration,
    ) -> Self {
        Self {
            handler,
            writer: Writer::new(write),
            reader: Reader::new(read),
            error_counter: ErrorCounter::new(threshold_soft_error, threshold_hard_error),
            context: ReceiverContext::default(),
            message_size_max,
            timeout_client,
        }
    }

    /// Handle the inner stream to produce a [`tokio_stream::Stream`], each item
    /// being a completed `DATA` phase.
    pub fn into_stream(
        mut self,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
        timestamp: time::OffsetDateTime,
        uuid: uuid::Uuid,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<()>> {
        async_stream::try_stream! {
            let reply_accept = self.handler.on_accept(
                &mut self.context,
                AcceptArgs {
                    client_addr,
                    server_addr,
                    timestamp,
                    uuid,
                }
            ).await;

            self.writer
                .send_reply(&mut self.context, &mut self.error_counter, &mut self.handler, reply_accept)
                .await?;

            if matches!(std::mem::take(&mut self.context).outcome, Some(HandshakeOutcome::Quit)) {
                return;
            }

            loop {
                match self.smtp_handshake().await? {
                    HandshakeOutcome::Message => {
                        let message_stream = self.reader.as_message_stream(self.message_size_max).fuse();
                        tokio::pin!(message_stream);

                        let reply = self.handler.on_message(&mut self.context, message_stream).await;
                        self.writer
                            .send_reply(&mut self.context, &mut self.error_counter, &mut self.handler, reply)
                            .await?;

                        yield ();

                        if matches!(std::mem::take(&mut self.context).outcome, Some(HandshakeOutcome::Quit)) {
                            return;
                        }
                    },
                    HandshakeOutcome::Quit => break,
                }
            }
        }
    }

    /// Read the commands until the `DATA` command is accepted or the session ends.
    async fn smtp_handshake(&mut self) -> std::io::Result<HandshakeOutcome> {
        macro_rules! handle_args {
            ($args_output:ty, $args:expr, $on_event:tt) => {
                match <$args_output>::try_from($args) {
                    Ok(args) => self.handler.$on_event(&mut self.context, args).await,
                    Err(e) => self.handler.on_args_error(e).await,
                }
            };
        }

        let command_stream = self
            .reader
            .as_command_stream()
            .timeout(self.timeout_client);
        tokio::pin!(command_stream);

        loop {
            let command = match command_stream.try_next().await {
                Ok(Some(command)) => command,
                Ok(None) => return Ok(HandshakeOutcome::Quit),
                Err(e) => {
                    tracing::warn!("Closing after {} without receiving a command", e);
                    let reply = self.handler.on_timeout().await;
                    self.writer.write_all(reply.as_ref()).await?;

                    return Ok(HandshakeOutcome::Quit);
                }
            };

            let reply = match command {
                Err(e) => self.handler.on_args_error(e).await,
                Ok((verb, args)) => {
                    tracing::trace!("<< {:?} ; {:?}", verb, std::str::from_utf8(&args.0));

                    match (verb, self.handler.get_stage()) {
                        (Verb::Helo, _) => handle_args!(HeloArgs, args, on_helo),
                        (Verb::Ehlo, _) => handle_args!(EhloArgs, args, on_ehlo),
                        (Verb::Noop, _) => self.handler.on_noop().await,
                        (Verb::Rset, _) => self.handler.on_rset().await,
                        (Verb::MailFrom, Stage::Idle) => {
                            handle_args!(MailFromArgs, args, on_mail_from)
                        }
                        (Verb::RcptTo, Stage::SenderSet | Stage::RecipientsCollected) => {
                            handle_args!(RcptToArgs, args, on_rcpt_to)
                        }
                        (Verb::Data, Stage::RecipientsCollected) => {
                            self.context.outcome = Some(HandshakeOutcome::Message);
                            self.handler.on_data().await
                        }
                        (Verb::Quit, _) => {
                            self.context.outcome = Some(HandshakeOutcome::Quit);
                            self.handler.on_quit().await
                        }
                        (Verb::Help, _) => self.handler.on_help(args).await,
                        (Verb::Unknown, _) => self.handler.on_unknown(args.0).await,
                        otherwise => self.handler.on_bad_sequence(otherwise).await,
                    }
                }
            };

            self.writer
                .send_reply(
                    &mut self.context,
                    &mut self.error_counter,
                    &mut self.handler,
                    reply,
                )
                .await?;

            if let Some(done) = std::mem::take(&mut self.context).outcome {
                return Ok(done);
            }
        }
    }
}
