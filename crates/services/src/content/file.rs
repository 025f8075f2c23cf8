use std::path::{Path, PathBuf};

use async_trait::async_trait;
use learnpath_core::filter::ContentFilter;
use learnpath_core::model::{ContentKind, ContentResponse};
use tracing::warn;

use super::ContentSource;
use crate::error::ContentFetchError;

/// Reads `{root}/themes/themes.json`, `{root}/topics/topics.json` and
/// `{root}/exercises/exercises.json`.
///
/// Unreadable or malformed files yield `{ "data": [] }` with a warning.
/// Filters are ignored.
#[derive(Clone, Debug)]
pub struct FileContentSource {
    root: PathBuf,
}

impl FileContentSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, kind: ContentKind) -> PathBuf {
        let name = match kind {
            ContentKind::Themes => "themes",
            ContentKind::Topics => "topics",
            ContentKind::Exercises => "exercises",
        };
        self.root.join(name).join(format!("{name}.json"))
    }

    async fn read(&self, kind: ContentKind) -> ContentResponse {
        let path = self.path_for(kind);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "content file unreadable");
                return ContentResponse::empty();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(response) => response,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "content file malformed");
                ContentResponse::empty()
            }
        }
    }
}

#[async_trait]
impl ContentSource for FileContentSource {
    async fn fetch(
        &self,
        kind: ContentKind,
        _filter: Option<&ContentFilter>,
    ) -> Result<ContentResponse, ContentFetchError> {
        Ok(self.read(kind).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("learnpath-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn paths_follow_kind_layout() {
        let source = FileContentSource::new("/content");
        assert_eq!(
            source.path_for(ContentKind::Topics),
            PathBuf::from("/content/topics/topics.json")
        );
        assert_eq!(
            source.path_for(ContentKind::Exercises),
            PathBuf::from("/content/exercises/exercises.json")
        );
    }

    #[tokio::test]
    async fn reads_records_from_json_file() {
        let root = scratch_dir("file-read");
        fs::create_dir_all(root.join("themes")).unwrap();
        fs::write(
            root.join("themes/themes.json"),
            r#"{"data":[{"id":"th1","field":{"topicsInfo":"t1,t2"}}]}"#,
        )
        .unwrap();

        let source = FileContentSource::new(&root);
        let themes = source.fetch(ContentKind::Themes, None).await.unwrap();

        assert_eq!(themes.len(), 1);
        assert_eq!(themes.data[0].topics_info(), Some("t1,t2"));
        fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn missing_or_malformed_file_is_empty() {
        let root = scratch_dir("file-soft-fail");
        fs::create_dir_all(root.join("topics")).unwrap();
        fs::write(root.join("topics/topics.json"), "{ not json").unwrap();

        let source = FileContentSource::new(&root);
        let topics = source.fetch(ContentKind::Topics, None).await.unwrap();
        let exercises = source.fetch(ContentKind::Exercises, None).await.unwrap();

        assert!(topics.is_empty());
        assert!(exercises.is_empty());
        fs::remove_dir_all(root).unwrap();
    }
}
