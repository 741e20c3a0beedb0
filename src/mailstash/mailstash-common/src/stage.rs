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

/// Step of the SMTP session, used by the receiver to accept or refuse a command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// The client has just connected to the server.
    #[default]
    Connect,
    /// The client has greeted the server, no transaction is open.
    Idle,
    /// The `MAIL FROM` command has been accepted.
    SenderSet,
    /// At least one `RCPT TO` command has been accepted.
    RecipientsCollected,
    /// The message has been received and is being archived.
    DataReceived,
}
