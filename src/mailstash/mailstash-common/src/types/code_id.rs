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

/// Key of every reply the relay sends, in the `[server.smtp.codes]` table.
///
/// The default of each reply is given in brackets; the text of any of them can
/// be replaced, `{name}` standing for the server name.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::EnumString,
    strum::EnumVariantNames,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
#[must_use]
pub enum CodeID {
    /// Banner of a new session (`220`).
    Greetings,
    /// The server is full, sent instead of [`CodeID::Greetings`] (`554`).
    ConnectionMaxReached,
    /// `HELO` accepted (`250`).
    Helo,
    /// `EHLO` accepted (`250`), followed by the advertised extensions.
    Ehlo,
    /// Generic success of `MAIL`, `RCPT`, `RSET`, `NOOP` and of the archival (`250`).
    Ok,
    /// Answer to `DATA` (`354`).
    DataStart,
    /// Answer to `HELP` (`214`).
    Help,
    /// Answer to `QUIT` (`221`).
    Closing,

    /// The client address is listed by a reputation zone (`554 5.7.1`).
    BlockedByPolicy,
    /// The recipient is outside the accepted pattern (`550 5.1.1`).
    NoSuchUser,
    /// `rcpt_count_max` recipients already accepted (`452 4.5.3`).
    TooManyRecipients,
    /// The message or its announced `SIZE` is over the limit (`552 5.3.4`).
    MessageSizeExceeded,
    /// The message or its metadata could not be archived (`451 4.3.0`).
    StorageFailure,

    /// `500`
    UnrecognizedCommand,
    /// `501`
    SyntaxErrorParams,
    /// `502`
    Unimplemented,
    /// `503`
    BadSequence,

    /// Appended to the error reply crossing the hard error threshold, the
    /// connection is then closed (`451`).
    TooManyError,
    /// No command received within `timeout_client`, the connection is then closed (`451`).
    Timeout,
}
