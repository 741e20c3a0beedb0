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

use super::ObjectStore;
use mailstash_common::StorageKey;

/// Store the objects in memory, indexed by their `s3://` url.
#[derive(Default)]
pub struct MemoryStore {
    objects: std::sync::Mutex<std::collections::BTreeMap<String, Vec<u8>>>,
    failing_suffixes: Vec<String>,
}

impl MemoryStore {
    /// Fail every write of a key ending with `suffix`.
    #[must_use]
    pub fn failing_on(mut self, suffix: impl Into<String>) -> Self {
        self.failing_suffixes.push(suffix.into());
        self
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, std::collections::BTreeMap<String, Vec<u8>>> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Content of the object at `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.objects().get(url).cloned()
    }

    /// Url of every object, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    ///
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &StorageKey, content: Vec<u8>) -> anyhow::Result<()> {
        let url = key.to_string();
        if self.failing_suffixes.iter().any(|suffix| url.ends_with(suffix)) {
            anyhow::bail!("write refused for `{url}`");
        }

        self.objects().insert(url, content);
        Ok(())
    }
}
