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
use anyhow::Context;
use mailstash_common::StorageKey;
use mailstash_config::field::FieldStorage;

/// Object storage speaking the S3 protocol.
///
/// One operator is built per bucket, on its first write.
pub struct S3Store {
    config: FieldStorage,
    operators: std::sync::Mutex<std::collections::HashMap<String, opendal::Operator>>,
}

impl S3Store {
    ///
    #[must_use]
    pub fn new(config: FieldStorage) -> Self {
        Self {
            config,
            operators: std::sync::Mutex::default(),
        }
    }

    fn build_operator(&self, bucket: &str) -> anyhow::Result<opendal::Operator> {
        let mut builder = opendal::services::S3::default()
            .bucket(bucket)
            .region(&self.config.region);

        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.endpoint(endpoint.as_str().trim_end_matches('/'));
        }
        if let Some(credentials) = &self.config.credentials {
            builder = builder
                .access_key_id(&credentials.access_key_id)
                .secret_access_key(&credentials.secret_access_key);
        }

        Ok(opendal::Operator::new(builder)
            .with_context(|| format!("cannot build the storage client for bucket `{bucket}`"))?
            .finish())
    }

    fn operator(&self, bucket: &str) -> anyhow::Result<opendal::Operator> {
        let mut operators = self
            .operators
            .lock()
            .map_err(|_| anyhow::anyhow!("storage client cache poisoned"))?;

        if let Some(operator) = operators.get(bucket) {
            return Ok(operator.clone());
        }

        let operator = self.build_operator(bucket)?;
        tracing::debug!(%bucket, endpoint = ?self.config.endpoint, "Storage client built.");
        operators.insert(bucket.to_string(), operator.clone());

        Ok(operator)
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &StorageKey, content: Vec<u8>) -> anyhow::Result<()> {
        let operator = self.operator(&key.bucket)?;

        operator
            .write(&key.key, content)
            .await
            .with_context(|| format!("cannot write `{key}`"))?;

        Ok(())
    }
}
