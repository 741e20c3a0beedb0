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

//! mailstash server
//!
//! Accept SMTP clients, screen them against the reputation zones and the
//! recipient pattern, and archive every accepted message with its envelope
//! metadata into an S3 compatible object storage.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//

mod archive;
mod message_id;
mod recipient;
mod reputation;
mod runtime;
mod server;
mod storage;

mod receiver {
    pub mod handler;
}

pub use archive::{ArchivalWriter, ArchivedPaths, Metadata, StorageWriteError};
pub use message_id::{MessageId, MessageIdentifier};
pub use receiver::handler::{Pipeline, TransactionHandler};
pub use recipient::RecipientValidator;
pub use reputation::{DnsLookup, LookupOutcome, ReputationGate};
pub use runtime::start_runtime;
pub use server::{socket_bind_anyhow, Server};
#[cfg(any(test, feature = "testing"))]
pub use storage::MemoryStore;
pub use storage::{ObjectStore, S3Store};
