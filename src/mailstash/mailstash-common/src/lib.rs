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

//! mailstash common definition

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
#![allow(clippy::missing_const_for_fn)] // see https://github.com/rust-lang/rust-clippy/issues/9271

/// Default port of the relay, unprivileged.
pub const SMTP_PORT: u16 = 8025;

mod types {
    pub mod code_id;
    pub mod reply;
    pub mod reply_code;
}

mod envelope;
mod path_template;
mod stage;

pub use envelope::Envelope;
pub use path_template::{PathTemplate, PathTemplateError, StorageKey, STORAGE_SCHEME};
pub use stage::Stage;
pub use types::{code_id::CodeID, reply::Reply, reply_code::ReplyCode};
