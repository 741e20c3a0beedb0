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

/// Failure while receiving the content of a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The content exceeds the size limit, the rest of the message has been
    /// read and discarded.
    #[error("message of {size} bytes exceeds the limit of {limit} bytes")]
    MessageTooLong {
        /// Size limit of the server.
        limit: usize,
        /// Size of the received content, dot-stuffing removed.
        size: usize,
    },
    /// The client closed the connection before the end of the message.
    #[error("connection closed before the end of the message")]
    Disconnected,
    /// Reading the connection failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
