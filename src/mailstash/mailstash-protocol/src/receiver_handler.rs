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
    AcceptArgs, EhloArgs, Error, Escalation, HeloArgs, MailFromArgs, ParseArgsError, RcptToArgs,
    ReceiverContext, UnparsedArgs, Verb,
};
use mailstash_common::{Reply, ReplyCode, Stage};

fn reply(code: u16, text: &str) -> Reply {
    Reply::new(ReplyCode::Code { code }, text)
}

const NOT_IMPLEMENTED: [&[u8]; 3] = [b"VRFY", b"EXPN", b"TURN"];

/// Session logic driven by the [`Receiver`](crate::Receiver).
///
/// The receiver owns the connection and the command grammar, every decision
/// about the transaction is delegated here. The hooks with a default body
/// answer with a fixed reply.
#[async_trait::async_trait]
pub trait ReceiverHandler {
    /// Stage of the current transaction, checked against each command.
    fn get_stage(&self) -> Stage;

    /// Greet the new client.
    async fn on_accept(&mut self, ctx: &mut ReceiverContext, args: AcceptArgs) -> Reply;

    /// `HELO <domain>`
    async fn on_helo(&mut self, ctx: &mut ReceiverContext, args: HeloArgs) -> Reply;

    /// `EHLO <domain>`
    async fn on_ehlo(&mut self, ctx: &mut ReceiverContext, args: EhloArgs) -> Reply;

    /// `MAIL FROM:<reverse-path> [params]`
    async fn on_mail_from(&mut self, ctx: &mut ReceiverContext, args: MailFromArgs) -> Reply;

    /// `RCPT TO:<forward-path> [params]`
    async fn on_rcpt_to(&mut self, ctx: &mut ReceiverContext, args: RcptToArgs) -> Reply;

    /// `DATA`, before the message is read.
    async fn on_data(&mut self) -> Reply {
        reply(354, "Start mail input; end with <CRLF>.<CRLF>")
    }

    /// Consume the message. The stream yields the lines with dot-stuffing
    /// removed, and ends on `.<CRLF>`.
    async fn on_message(
        &mut self,
        ctx: &mut ReceiverContext,
        stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply;

    /// `RSET`
    async fn on_rset(&mut self) -> Reply;

    /// `NOOP`
    async fn on_noop(&mut self) -> Reply {
        reply(250, "Ok")
    }

    /// `HELP [topic]`
    async fn on_help(&mut self, _: UnparsedArgs) -> Reply {
        reply(214, "Supported commands: EHLO HELO MAIL RCPT DATA RSET NOOP QUIT HELP")
    }

    /// `QUIT`, the connection is closed after the reply.
    async fn on_quit(&mut self) -> Reply {
        reply(221, "Service closing transmission channel")
    }

    /// No command received in time, the connection is closed after the reply.
    async fn on_timeout(&mut self) -> Reply {
        reply(451, "Timeout - closing connection")
    }

    /// A line which is not a known command.
    async fn on_unknown(&mut self, buffer: Vec<u8>) -> Reply {
        let verb = buffer.get(..4).unwrap_or(&buffer);

        if NOT_IMPLEMENTED
            .iter()
            .any(|known| verb.eq_ignore_ascii_case(known))
        {
            reply(502, "Command not implemented")
        } else {
            reply(500, "Syntax error command unrecognized")
        }
    }

    /// A command valid in another stage of the transaction.
    async fn on_bad_sequence(&mut self, _: (Verb, Stage)) -> Reply {
        reply(503, "Bad sequence of commands")
    }

    /// A known command with invalid arguments.
    async fn on_args_error(&mut self, _: ParseArgsError) -> Reply {
        reply(501, "Syntax error in parameters or arguments")
    }

    /// The reply is recorded by the [`ErrorCounter`](crate::ErrorCounter).
    fn counts_as_error(&self, reply: &Reply) -> bool {
        reply.code().is_error()
    }

    /// An error reply crossed a threshold of the
    /// [`ErrorCounter`](crate::ErrorCounter). By default the client is
    /// disconnected on [`Escalation::Hard`].
    async fn on_error_threshold(
        &mut self,
        ctx: &mut ReceiverContext,
        level: Escalation,
        reply: Reply,
    ) -> Reply {
        if level == Escalation::Hard {
            ctx.deny();
        }
        reply
    }
}
