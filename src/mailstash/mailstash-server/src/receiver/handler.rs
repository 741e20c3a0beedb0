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
    archive::{ArchivalWriter, Metadata},
    message_id::MessageIdentifier,
    recipient::RecipientValidator,
    reputation::ReputationGate,
    storage::ObjectStore,
};
use anyhow::Context;
use mailstash_common::{CodeID, Envelope, Reply, ReplyCode, Stage};
use mailstash_config::Config;
use mailstash_protocol::{
    AcceptArgs, EhloArgs, Error, Escalation, HeloArgs, MailFromArgs, ParseArgsError, RcptToArgs,
    ReceiverContext, UnparsedArgs, Verb,
};
use tokio_stream::StreamExt;

/// Components shared by every session.
#[derive(Clone)]
pub struct Pipeline {
    /// Checked at `MAIL FROM`.
    pub gate: std::sync::Arc<ReputationGate>,
    /// Checked at every `RCPT TO`.
    pub validator: std::sync::Arc<RecipientValidator>,
    /// Called at the end of `DATA`.
    pub writer: std::sync::Arc<ArchivalWriter>,
}

impl Pipeline {
    /// Build the components from the configuration, archiving into `store`.
    ///
    /// # Errors
    ///
    /// * the dns resolver of the reputation zones cannot be built
    pub fn from_config(
        config: &Config,
        store: std::sync::Arc<dyn ObjectStore>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            gate: std::sync::Arc::new(
                ReputationGate::from_config(config).context("could not initialize dns")?,
            ),
            validator: std::sync::Arc::new(RecipientValidator::from_config(config)),
            writer: std::sync::Arc::new(ArchivalWriter::new(store, config.storage.compression)),
        })
    }
}

/// Handle the SMTP transactions of one client, and archive the messages.
pub struct TransactionHandler {
    config: std::sync::Arc<Config>,
    pipeline: Pipeline,
    envelope: Envelope,
    stage: Stage,
}

impl TransactionHandler {
    ///
    #[must_use]
    pub fn new(config: std::sync::Arc<Config>, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline,
            envelope: Envelope::default(),
            stage: Stage::Connect,
        }
    }

    /// Envelope of the transaction in progress.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn reply_in_config(&self, code: CodeID) -> Reply {
        self.config
            .server
            .smtp
            .codes
            .get(&code)
            .cloned()
            .unwrap_or_else(|| {
                tracing::error!(%code, "Reply missing in the configuration.");
                Reply::new(
                    ReplyCode::Code { code: 451 },
                    "Requested action aborted: local error in processing",
                )
            })
    }

    /// Close the transaction in progress, keeping the greeting.
    fn reset(&mut self) {
        self.envelope = self.envelope.next_transaction();
        if self.stage != Stage::Connect {
            self.stage = Stage::Idle;
        }
    }

    fn greet(&mut self) {
        self.envelope = self.envelope.next_transaction();
        self.stage = Stage::Idle;
    }

    async fn archive(&self, timestamp: time::OffsetDateTime) -> Reply {
        let content = self.envelope.content.as_deref().unwrap_or_default();
        let message_id = MessageIdentifier::derive(content);

        let prefix = match self.config.storage.prefix_pattern.render(timestamp) {
            Ok(prefix) => prefix,
            Err(error) => {
                tracing::error!(%error, "Storage prefix rendering failure.");
                return self.reply_in_config(CodeID::StorageFailure);
            }
        };

        match self
            .pipeline
            .writer
            .store(
                &prefix,
                &message_id.id,
                content,
                Metadata::new(&self.envelope, message_id.header_lossy()),
            )
            .await
        {
            Ok(paths) => {
                tracing::info!(
                    content = %paths.content,
                    metadata = %paths.metadata,
                    "Message archived."
                );
                self.reply_in_config(CodeID::Ok)
            }
            Err(error) => {
                tracing::error!(%error, "Message archival failure.");
                self.reply_in_config(CodeID::StorageFailure)
            }
        }
    }
}

fn peer_ip(addr: std::net::SocketAddr) -> String {
    match addr.ip() {
        std::net::IpAddr::V6(ip) => ip
            .to_ipv4_mapped()
            .map_or_else(|| ip.to_string(), |ip| ip.to_string()),
        std::net::IpAddr::V4(ip) => ip.to_string(),
    }
}

#[async_trait::async_trait]
impl mailstash_protocol::ReceiverHandler for TransactionHandler {
    fn get_stage(&self) -> Stage {
        self.stage
    }

    async fn on_accept(&mut self, _: &mut ReceiverContext, args: AcceptArgs) -> Reply {
        tracing::debug!(session = %args.uuid, "Session started.");

        self.envelope = Envelope::new(peer_ip(args.client_addr));
        self.stage = Stage::Connect;
        self.reply_in_config(CodeID::Greetings)
    }

    async fn on_helo(&mut self, _: &mut ReceiverContext, args: HeloArgs) -> Reply {
        tracing::debug!(client_name = %args.client_name, "HELO received.");
        self.greet();
        self.reply_in_config(CodeID::Helo)
    }

    async fn on_ehlo(&mut self, _: &mut ReceiverContext, args: EhloArgs) -> Reply {
        tracing::debug!(client_name = %args.client_name, "EHLO received.");
        self.greet();
        self.reply_in_config(CodeID::Ehlo)
    }

    async fn on_mail_from(&mut self, _: &mut ReceiverContext, args: MailFromArgs) -> Reply {
        if args
            .size
            .map_or(false, |size| size > self.config.server.message_size_limit)
        {
            return self.reply_in_config(CodeID::MessageSizeExceeded);
        }

        if self.pipeline.gate.is_blocked(&self.envelope.peer_ip).await {
            let reply = self.reply_in_config(CodeID::BlockedByPolicy);
            tracing::info!(peer_ip = %self.envelope.peer_ip, %reply, "Sender rejected.");
            return reply;
        }

        self.envelope.mail_from = args.reverse_path;
        self.envelope.mail_options = args.options;
        self.envelope.smtp_utf8 = args.smtp_utf8;
        self.stage = Stage::SenderSet;

        self.reply_in_config(CodeID::Ok)
    }

    async fn on_rcpt_to(&mut self, _: &mut ReceiverContext, args: RcptToArgs) -> Reply {
        if self.envelope.rcpt_tos.len() >= self.config.server.smtp.rcpt_count_max {
            return self.reply_in_config(CodeID::TooManyRecipients);
        }

        if !self.pipeline.validator.accepts(&args.forward_path) {
            let reply = self.reply_in_config(CodeID::NoSuchUser);
            tracing::info!(forward_path = %args.forward_path, %reply, "Recipient rejected.");
            return reply;
        }

        self.envelope.rcpt_tos.push(args.forward_path);
        self.envelope.rcpt_options.extend(args.options);
        self.stage = Stage::RecipientsCollected;

        self.reply_in_config(CodeID::Ok)
    }

    async fn on_message(
        &mut self,
        ctx: &mut ReceiverContext,
        mut stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply {
        let timestamp = time::OffsetDateTime::now_utc();
        let mut content = vec![];
        let mut too_long = None;

        while let Some(line) = stream.next().await {
            match line {
                Ok(line) => content.extend_from_slice(&line),
                Err(Error::MessageTooLong { limit, size }) => too_long = Some((limit, size)),
                Err(error) => {
                    tracing::warn!(%error, "Message reception failure.");
                    self.reset();
                    ctx.deny();
                    return self.reply_in_config(CodeID::StorageFailure);
                }
            }
        }

        if let Some((limit, size)) = too_long {
            tracing::info!(limit, size, "Message too long, discarded.");
            self.reset();
            return self.reply_in_config(CodeID::MessageSizeExceeded);
        }

        self.stage = Stage::DataReceived;
        self.envelope.content = Some(content);
        let reply = self.archive(timestamp).await;

        self.reset();
        reply
    }

    fn counts_as_error(&self, reply: &Reply) -> bool {
        reply.code().is_error()
            && ![CodeID::BlockedByPolicy, CodeID::NoSuchUser]
                .into_iter()
                .any(|code| *reply == self.reply_in_config(code))
    }

    async fn on_error_threshold(
        &mut self,
        ctx: &mut ReceiverContext,
        level: Escalation,
        reply: Reply,
    ) -> Reply {
        match level {
            Escalation::Hard => {
                ctx.deny();
                reply.extended(&self.reply_in_config(CodeID::TooManyError))
            }
            Escalation::Soft | Escalation::None => {
                tokio::time::sleep(self.config.server.smtp.error.delay).await;
                reply
            }
        }
    }

    async fn on_rset(&mut self) -> Reply {
        self.reset();
        self.reply_in_config(CodeID::Ok)
    }

    async fn on_data(&mut self) -> Reply {
        self.reply_in_config(CodeID::DataStart)
    }

    async fn on_quit(&mut self) -> Reply {
        self.reply_in_config(CodeID::Closing)
    }

    async fn on_noop(&mut self) -> Reply {
        self.reply_in_config(CodeID::Ok)
    }

    async fn on_help(&mut self, _: UnparsedArgs) -> Reply {
        self.reply_in_config(CodeID::Help)
    }

    async fn on_timeout(&mut self) -> Reply {
        self.reply_in_config(CodeID::Timeout)
    }

    async fn on_unknown(&mut self, buffer: Vec<u8>) -> Reply {
        let unimplemented_command = [b"VRFY" as &[u8], b"EXPN" as &[u8], b"TURN" as &[u8]];

        if unimplemented_command
            .iter()
            .any(|c| buffer.len() >= c.len() && buffer[..c.len()].eq_ignore_ascii_case(c))
        {
            self.reply_in_config(CodeID::Unimplemented)
        } else {
            self.reply_in_config(CodeID::UnrecognizedCommand)
        }
    }

    async fn on_bad_sequence(&mut self, (verb, stage): (Verb, Stage)) -> Reply {
        tracing::debug!(?verb, %stage, "Bad sequence of commands.");
        self.reply_in_config(CodeID::BadSequence)
    }

    async fn on_args_error(&mut self, error: ParseArgsError) -> Reply {
        tracing::debug!(%error, "Invalid arguments.");
        self.reply_in_config(CodeID::SyntaxErrorParams)
    }
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, TransactionHandler};
    use crate::{
        archive::ArchivalWriter, recipient::RecipientValidator, reputation::ReputationGate,
        storage::MemoryStore,
    };
    use mailstash_common::{Stage, StorageKey};
    use mailstash_protocol::{
        AcceptArgs, EhloArgs, Error, MailFromArgs, RcptToArgs, ReceiverContext, ReceiverHandler,
    };

    fn handler(store: std::sync::Arc<MemoryStore>) -> TransactionHandler {
        let config = std::sync::Arc::new(mailstash_test::config::local_test());

        TransactionHandler::new(
            config.clone(),
            Pipeline {
                gate: std::sync::Arc::new(ReputationGate::disabled()),
                validator: std::sync::Arc::new(RecipientValidator::from_config(&config)),
                writer: std::sync::Arc::new(ArchivalWriter::new(
                    store,
                    config.storage.compression,
                )),
            },
        )
    }

    async fn open(handler: &mut TransactionHandler, ctx: &mut ReceiverContext) {
        handler
            .on_accept(
                ctx,
                AcceptArgs {
                    client_addr: "[::ffff:10.0.0.1]:4242".parse().unwrap(),
                    server_addr: "127.0.0.1:8025".parse().unwrap(),
                    timestamp: time::OffsetDateTime::now_utc(),
                    uuid: uuid::Uuid::new_v4(),
                },
            )
            .await;
        handler
            .on_ehlo(
                ctx,
                EhloArgs {
                    client_name: "client.example.org".to_string(),
                },
            )
            .await;
    }

    fn mail_from(reverse_path: &str) -> MailFromArgs {
        MailFromArgs {
            reverse_path: Some(reverse_path.to_string()),
            options: vec![],
            size: None,
            smtp_utf8: false,
        }
    }

    fn rcpt_to(forward_path: &str) -> RcptToArgs {
        RcptToArgs {
            forward_path: forward_path.to_string(),
            options: vec![],
        }
    }

    #[tokio::test]
    async fn transaction() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut handler = handler(store.clone());
        let mut ctx = ReceiverContext::default();

        open(&mut handler, &mut ctx).await;
        pretty_assertions::assert_eq!(handler.envelope().peer_ip, "10.0.0.1");
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::Idle);

        let reply = handler.on_mail_from(&mut ctx, mail_from("anne@example.org")).await;
        pretty_assertions::assert_eq!(reply.to_string(), "250 OK\r\n");
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::SenderSet);

        let reply = handler.on_rcpt_to(&mut ctx, rcpt_to("not an address")).await;
        pretty_assertions::assert_eq!(reply.to_string(), "550 5.1.1 No such user\r\n");
        assert!(handler.envelope().rcpt_tos.is_empty());
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::SenderSet);

        let reply = handler.on_rcpt_to(&mut ctx, rcpt_to("bob@example.com")).await;
        pretty_assertions::assert_eq!(reply.to_string(), "250 OK\r\n");
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::RecipientsCollected);

        let body: Vec<Result<Vec<u8>, Error>> = vec![
            Ok(b"Message-ID: <abc@example.com>\r\n".to_vec()),
            Ok(b"\r\n".to_vec()),
            Ok(b"hello\r\n".to_vec()),
        ];
        let body = tokio_stream::iter(body);
        let reply = handler.on_message(&mut ctx, body).await;
        pretty_assertions::assert_eq!(reply.to_string(), "250 OK\r\n");
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::Idle);
        assert!(handler.envelope().rcpt_tos.is_empty());
        pretty_assertions::assert_eq!(handler.envelope().peer_ip, "10.0.0.1");

        let keys = store.keys();
        pretty_assertions::assert_eq!(keys.len(), 2);
        let key = keys[0].parse::<StorageKey>().unwrap();
        pretty_assertions::assert_eq!(key.bucket, "mailstash-test");
    }

    #[tokio::test]
    async fn storage_failure() {
        let store = std::sync::Arc::new(MemoryStore::default().failing_on(".json"));
        let mut handler = handler(store.clone());
        let mut ctx = ReceiverContext::default();

        open(&mut handler, &mut ctx).await;
        handler.on_mail_from(&mut ctx, mail_from("anne@example.org")).await;
        handler.on_rcpt_to(&mut ctx, rcpt_to("bob@example.com")).await;

        let body: Vec<Result<Vec<u8>, Error>> = vec![Ok(b"Subject: hi\r\n\r\nhello\r\n".to_vec())];
        let body = tokio_stream::iter(body);
        let reply = handler.on_message(&mut ctx, body).await;

        pretty_assertions::assert_eq!(
            reply.to_string(),
            "451 4.3.0 Temporary failure storing message.\r\n"
        );
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::Idle);
        pretty_assertions::assert_eq!(store.keys().len(), 1);
    }

    #[tokio::test]
    async fn too_long() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut handler = handler(store.clone());
        let mut ctx = ReceiverContext::default();

        open(&mut handler, &mut ctx).await;
        handler.on_mail_from(&mut ctx, mail_from("anne@example.org")).await;
        handler.on_rcpt_to(&mut ctx, rcpt_to("bob@example.com")).await;

        let body: Vec<Result<Vec<u8>, Error>> = vec![
            Ok(b"Subject: hi\r\n".to_vec()),
            Err(Error::MessageTooLong {
                limit: 10,
                size: 20,
            }),
        ];
        let body = tokio_stream::iter(body);
        let reply = handler.on_message(&mut ctx, body).await;

        assert!(reply.to_string().starts_with("552 5.3.4 "), "{reply}");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn rcpt_count_max() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut handler = handler(store);
        let mut ctx = ReceiverContext::default();

        open(&mut handler, &mut ctx).await;
        handler.on_mail_from(&mut ctx, mail_from("anne@example.org")).await;

        for i in 0..handler.config.server.smtp.rcpt_count_max {
            let reply = handler
                .on_rcpt_to(&mut ctx, rcpt_to(&format!("rcpt{i}@example.com")))
                .await;
            pretty_assertions::assert_eq!(reply.to_string(), "250 OK\r\n");
        }

        let reply = handler.on_rcpt_to(&mut ctx, rcpt_to("late@example.com")).await;
        assert!(reply.to_string().starts_with("452 4.5.3 "), "{reply}");
    }

    #[tokio::test]
    async fn size_parameter() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut handler = handler(store);
        let mut ctx = ReceiverContext::default();

        open(&mut handler, &mut ctx).await;
        let reply = handler
            .on_mail_from(
                &mut ctx,
                MailFromArgs {
                    size: Some(handler.config.server.message_size_limit + 1),
                    ..mail_from("anne@example.org")
                },
            )
            .await;

        assert!(reply.to_string().starts_with("552 "), "{reply}");
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn rset_before_greeting() {
        let mut handler = handler(std::sync::Arc::new(MemoryStore::default()));

        handler.on_rset().await;
        pretty_assertions::assert_eq!(handler.get_stage(), Stage::Connect);
    }
}
