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

use mailstash_common::StorageKey;

#[cfg(any(test, feature = "testing"))]
mod memory;
mod s3;

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Destination of the archived objects.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `content` at `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// * the backend refused or failed the write
    async fn put(&self, key: &StorageKey, content: Vec<u8>) -> anyhow::Result<()>;
}
