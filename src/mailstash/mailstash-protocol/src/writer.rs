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

use crate::{ReceiverContext, ReceiverHandler};
use mailstash_common::Reply;
use tokio::io::AsyncWriteExt;

/// Threshold reached by an error reply, see [`ReceiverHandler::on_error_threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Below both thresholds.
    None,
    /// The soft threshold is reached.
    Soft,
    /// The hard threshold is reached.
    Hard,
}

/// Number of error replies sent during the session, compared to the
/// soft and hard thresholds (`-1` disables a threshold).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCounter {
    count: i64,
    soft: i64,
    hard: i64,
}

impl ErrorCounter {
    /// Counter with no error recorded yet.
    #[must_use]
    pub const fn new(soft: i64, hard: i64) -> Self {
        Self {
            count: 0,
            soft,
            hard,
        }
    }

    /// Error replies recorded so far.
    #[must_use]
    pub const fn count(&self) -> i64 {
        self.count
    }

    /// Record one more error reply.
    pub fn record(&mut self) -> Escalation {
        self.count += 1;
        let reached = |threshold: i64| threshold != -1 && self.count >= threshold;

        if reached(self.hard) {
            Escalation::Hard
        } else if reached(self.soft) {
            Escalation::Soft
        } else {
            Escalation::None
        }
    }
}

/// Write half of the session, every reply goes through it.
pub struct Writer<W: tokio::io::AsyncWrite + Unpin + Send> {
    sink: W,
}

impl<W: tokio::io::AsyncWrite + Unpin + Send> Writer<W> {
    ///
    #[must_use]
    pub const fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Write `buffer` and flush it.
    ///
    /// # Errors
    ///
    /// * [`std::io::Error`] produced by the underlying writer
    pub async fn write_all(&mut self, buffer: &str) -> std::io::Result<()> {
        tracing::trace!(">> {:?}", buffer);
        self.sink.write_all(buffer.as_bytes()).await?;
        self.sink.flush().await
    }

    /// Send `reply`. Replies the handler counts as errors are recorded in
    /// `errors`, and rewritten by the handler once they cross a threshold.
    ///
    /// # Errors
    ///
    /// * [`std::io::Error`] produced by the underlying writer
    pub async fn send_reply<T: ReceiverHandler + Send>(
        &mut self,
        ctx: &mut ReceiverContext,
        errors: &mut ErrorCounter,
        handler: &mut T,
        reply: Reply,
    ) -> std::io::Result<()> {
        let reply = match handler.counts_as_error(&reply).then(|| errors.record()) {
            None | Some(Escalation::None) => reply,
            Some(level) => handler.on_error_threshold(ctx, level, reply).await,
        };

        self.write_all(reply.as_ref()).await
    }
}
