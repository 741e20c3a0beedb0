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

/// Scheme of every storage key.
pub const STORAGE_SCHEME: &str = "s3";

/// The pattern cannot produce a valid storage key prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathTemplateError {
    /// The rendered prefix is not an url.
    #[error("storage prefix pattern `{pattern}` does not render to an url: {source}")]
    InvalidUrl {
        /// Offending pattern.
        pattern: String,
        /// Parsing error of the rendered prefix.
        source: url::ParseError,
    },
    /// The rendered prefix does not use [`STORAGE_SCHEME`].
    #[error("storage prefix pattern `{pattern}` must use the `s3` scheme, got `{scheme}`")]
    Scheme {
        /// Offending pattern.
        pattern: String,
        /// Scheme found.
        scheme: String,
    },
    /// The rendered prefix has no bucket.
    #[error("storage prefix pattern `{pattern}` does not specify a bucket name")]
    MissingBucket {
        /// Offending pattern.
        pattern: String,
    },
}

/// Pattern of the storage key prefix, with the timestamp placeholders
/// `{YYYY}`, `{MM}`, `{dd}`, `{HH}` and `{mm}`.
///
/// ```
/// # use mailstash_common::PathTemplate;
/// let timestamp = time::macros::datetime!(2024-03-15 10:30:00 UTC);
///
/// assert_eq!(
///     PathTemplate::render_pattern("s3://mybucket/emails/{YYYY}/{MM}", timestamp).unwrap(),
///     "s3://mybucket/emails/2024/03/"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
    pattern: String,
}

impl PathTemplate {
    /// Create a template, checking the pattern renders a valid prefix for the
    /// current time.
    ///
    /// # Errors
    ///
    /// * see [`PathTemplateError`]
    pub fn new(pattern: impl Into<String>) -> Result<Self, PathTemplateError> {
        let this = Self {
            pattern: pattern.into(),
        };
        this.render(time::OffsetDateTime::now_utc())?;
        Ok(this)
    }

    /// The raw pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render the prefix for `timestamp`.
    ///
    /// # Errors
    ///
    /// * see [`PathTemplateError`]
    pub fn render(&self, timestamp: time::OffsetDateTime) -> Result<String, PathTemplateError> {
        Self::render_pattern(&self.pattern, timestamp)
    }

    /// Substitute the placeholders of `pattern` with the fields of `timestamp`,
    /// and ensure the output is an `s3://<bucket>/...` url ending with a single `/`.
    ///
    /// # Errors
    ///
    /// * see [`PathTemplateError`]
    pub fn render_pattern(
        pattern: &str,
        timestamp: time::OffsetDateTime,
    ) -> Result<String, PathTemplateError> {
        let mut prefix = pattern
            .trim_end_matches('/')
            .replace("{YYYY}", &format!("{:04}", timestamp.year()))
            .replace("{MM}", &format!("{:02}", u8::from(timestamp.month())))
            .replace("{dd}", &format!("{:02}", timestamp.day()))
            .replace("{HH}", &format!("{:02}", timestamp.hour()))
            .replace("{mm}", &format!("{:02}", timestamp.minute()));
        prefix.push('/');

        let url = url::Url::parse(&prefix).map_err(|source| PathTemplateError::InvalidUrl {
            pattern: pattern.to_string(),
            source,
        })?;

        if url.scheme() != STORAGE_SCHEME {
            return Err(PathTemplateError::Scheme {
                pattern: pattern.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(PathTemplateError::MissingBucket {
                pattern: pattern.to_string(),
            });
        }

        Ok(prefix)
    }
}

impl TryFrom<String> for PathTemplate {
    type Error = PathTemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PathTemplate> for String {
    fn from(value: PathTemplate) -> Self {
        value.pattern
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// A rendered `s3://<bucket>/<key>` location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    /// Name of the bucket.
    pub bucket: String,
    /// Key of the object inside the bucket, without leading `/`.
    pub key: String,
}

impl std::str::FromStr for StorageKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let location = s
            .strip_prefix(STORAGE_SCHEME)
            .and_then(|s| s.strip_prefix("://"))
            .ok_or_else(|| anyhow::anyhow!("storage key `{s}` does not use the `s3` scheme"))?;

        let (bucket, key) = location.split_once('/').unwrap_or((location, ""));
        anyhow::ensure!(!bucket.is_empty(), "storage key `{s}` has no bucket");
        anyhow::ensure!(!key.is_empty(), "storage key `{s}` has no object key");

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{STORAGE_SCHEME}://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::{PathTemplate, PathTemplateError, StorageKey};
    use time::macros::datetime;

    #[rstest::rstest]
    #[case("s3://mybucket", "s3://mybucket/")]
    #[case("s3://mybucket/", "s3://mybucket/")]
    #[case("s3://mybucket//", "s3://mybucket/")]
    #[case("s3://mybucket/emails/{YYYY}/{MM}", "s3://mybucket/emails/2024/03/")]
    #[case(
        "s3://mybucket/{YYYY}/{MM}/{dd}/{HH}/{mm}/",
        "s3://mybucket/2024/03/15/10/30/"
    )]
    #[case("s3://mybucket/{mm}{HH}{dd}{MM}{YYYY}", "s3://mybucket/301015032024/")]
    #[case("s3://mybucket/{MM}/{MM}", "s3://mybucket/03/03/")]
    #[case("s3://mybucket/{unknown}", "s3://mybucket/{unknown}/")]
    fn render(#[case] pattern: &str, #[case] expected: &str) {
        let timestamp = datetime!(2024-03-15 10:30:00 UTC);

        let first = PathTemplate::render_pattern(pattern, timestamp).unwrap();
        pretty_assertions::assert_eq!(first, expected);
        pretty_assertions::assert_eq!(
            PathTemplate::render_pattern(pattern, timestamp).unwrap(),
            first
        );
        assert!(first.ends_with('/') && !first.ends_with("//"));
    }

    #[test]
    fn zero_padding() {
        let timestamp = datetime!(2023-01-02 03:04:00 UTC);
        pretty_assertions::assert_eq!(
            PathTemplate::render_pattern("s3://b/{YYYY}-{MM}-{dd}T{HH}:{mm}", timestamp).unwrap(),
            "s3://b/2023-01-02T03:04/"
        );
    }

    #[test]
    fn no_scheme() {
        let timestamp = datetime!(2024-03-15 10:30:00 UTC);
        assert!(matches!(
            PathTemplate::render_pattern("/mybucket", timestamp),
            Err(PathTemplateError::InvalidUrl { pattern, .. }) if pattern == "/mybucket"
        ));
    }

    #[test]
    fn wrong_scheme() {
        let timestamp = datetime!(2024-03-15 10:30:00 UTC);
        assert_eq!(
            PathTemplate::render_pattern("https://mybucket/emails", timestamp),
            Err(PathTemplateError::Scheme {
                pattern: "https://mybucket/emails".to_string(),
                scheme: "https".to_string()
            })
        );
    }

    #[test]
    fn empty_bucket() {
        let timestamp = datetime!(2024-03-15 10:30:00 UTC);
        for pattern in ["s3://", "s3:///emails"] {
            assert_eq!(
                PathTemplate::render_pattern(pattern, timestamp),
                Err(PathTemplateError::MissingBucket {
                    pattern: pattern.to_string()
                }),
                "{pattern}"
            );
        }
    }

    #[test]
    fn new_validates() {
        assert!(PathTemplate::new("s3://mybucket/{YYYY}").is_ok());
        assert!(PathTemplate::new("mybucket").is_err());
    }

    #[test]
    fn deserialize() {
        #[derive(Debug, serde::Deserialize)]
        struct S {
            p: PathTemplate,
        }

        assert_eq!(
            serde_json::from_str::<S>(r#"{"p": "s3://mybucket/{YYYY}"}"#)
                .unwrap()
                .p
                .pattern(),
            "s3://mybucket/{YYYY}"
        );
        assert!(serde_json::from_str::<S>(r#"{"p": "s3://"}"#).is_err());
    }

    #[test]
    fn storage_key() {
        let key = "s3://mybucket/emails/2024/03/abc.json"
            .parse::<StorageKey>()
            .unwrap();
        pretty_assertions::assert_eq!(
            key,
            StorageKey {
                bucket: "mybucket".to_string(),
                key: "emails/2024/03/abc.json".to_string()
            }
        );
        pretty_assertions::assert_eq!(key.to_string(), "s3://mybucket/emails/2024/03/abc.json");

        assert!("s3://mybucket/".parse::<StorageKey>().is_err());
        assert!("s3:///key".parse::<StorageKey>().is_err());
        assert!("file:///tmp/key".parse::<StorageKey>().is_err());
    }
}
