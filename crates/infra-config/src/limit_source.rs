// FileLimitSource - loads queue limit documents through the config crate

use async_trait::async_trait;
use config::{Config, File, FileFormat};
use gantry_core::domain::{QueueLimits, ResourceVector};
use gantry_core::port::{LimitEntry, LimitProvider};
use gantry_core::{AppError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Document shape:
///
/// ```toml
/// [[queues]]
/// path = "root.engineering"
/// max_applications = 5
///
/// [queues.max_resources]
/// mem = 50
/// vcore = 50
/// ```
///
/// Omitted `max_resources` / `max_applications` mean "no limit"; a present
/// but empty table is a real (fully closed) resource limit.
#[derive(Debug, Deserialize)]
struct LimitsDocument {
    #[serde(default)]
    queues: Vec<RawLimitEntry>,
}

#[derive(Debug, Deserialize)]
struct RawLimitEntry {
    path: String,
    max_resources: Option<BTreeMap<String, i64>>,
    max_applications: Option<u32>,
}

impl From<RawLimitEntry> for LimitEntry {
    fn from(raw: RawLimitEntry) -> Self {
        LimitEntry::new(
            raw.path,
            QueueLimits::new(
                raw.max_resources.map(ResourceVector::from_pairs),
                raw.max_applications,
            ),
        )
    }
}

enum Source {
    File(PathBuf),
    Inline(String),
}

/// File-backed [`LimitProvider`]. Reads the document fresh on every pull so
/// a reconcile pass always sees the file as it currently is.
pub struct FileLimitSource {
    source: Source,
}

impl FileLimitSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// An inline TOML document instead of a file (tests, embedded defaults).
    pub fn from_toml_str(document: impl Into<String>) -> Self {
        Self {
            source: Source::Inline(document.into()),
        }
    }

    fn load(&self) -> Result<Vec<LimitEntry>> {
        let builder = match &self.source {
            Source::File(path) => Config::builder().add_source(File::from(path.as_path())),
            Source::Inline(document) => {
                Config::builder().add_source(File::from_str(document, FileFormat::Toml))
            }
        };
        let document: LimitsDocument = builder
            .build()
            .map_err(|error| AppError::Config(error.to_string()))?
            .try_deserialize()
            .map_err(|error| AppError::Config(error.to_string()))?;
        debug!(entries = document.queues.len(), "loaded limit document");
        Ok(document.queues.into_iter().map(LimitEntry::from).collect())
    }
}

#[async_trait]
impl LimitProvider for FileLimitSource {
    async fn load_limits(&self) -> Result<Vec<LimitEntry>> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_document() {
        let source = FileLimitSource::from_toml_str(
            r#"
            [[queues]]
            path = "root.engineering"
            max_applications = 5

            [queues.max_resources]
            mem = 50
            vcore = 50

            [[queues]]
            path = "root.research"
            "#,
        );
        let entries = source.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].queue_path, "root.engineering");
        assert_eq!(entries[0].limits.max_applications, Some(5));
        assert_eq!(
            entries[0].limits.max_resources,
            Some(ResourceVector::from_pairs([("mem", 50), ("vcore", 50)]))
        );
        // no tables at all: both ceilings unset
        assert!(entries[1].limits.is_unlimited());
    }

    #[test]
    fn test_empty_document_has_no_entries() {
        let source = FileLimitSource::from_toml_str("");
        assert!(source.load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document_is_a_config_error() {
        let source = FileLimitSource::from_toml_str("queues = 7");
        let err = source.load().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let source = FileLimitSource::new("/nonexistent/gantry-limits.toml");
        let err = source.load().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_provider_round_trip() {
        let source = FileLimitSource::from_toml_str(
            r#"
            [[queues]]
            path = "root.batch"
            max_applications = 2
            "#,
        );
        let entries = source.load_limits().await.unwrap();
        assert_eq!(entries[0].queue_path, "root.batch");
        assert_eq!(entries[0].limits.max_applications, Some(2));
    }
}
