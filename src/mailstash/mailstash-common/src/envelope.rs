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

/// Participants and content of one SMTP transaction.
///
/// Owned by a single session; a new value replaces it at every transaction
/// boundary, see [`Envelope::next_transaction`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse path of `MAIL FROM`, `None` for the null sender `<>` or before the command.
    pub mail_from: Option<String>,
    /// ESMTP parameters of `MAIL FROM`.
    pub mail_options: Vec<String>,
    /// Accepted forward paths, in arrival order.
    pub rcpt_tos: Vec<String>,
    /// ESMTP parameters of every accepted `RCPT TO`.
    pub rcpt_options: Vec<String>,
    /// Message received after `DATA`, dot-stuffing removed.
    pub content: Option<Vec<u8>>,
    /// Address of the client.
    pub peer_ip: String,
    /// The client requested `SMTPUTF8` on `MAIL FROM`.
    pub smtp_utf8: bool,
}

impl Envelope {
    /// Create an empty envelope for a client.
    #[must_use]
    pub fn new(peer_ip: impl Into<String>) -> Self {
        Self {
            peer_ip: peer_ip.into(),
            ..Self::default()
        }
    }

    /// Produce the envelope of the next transaction of the same session.
    #[must_use]
    pub fn next_transaction(&self) -> Self {
        Self::new(self.peer_ip.clone())
    }
}
