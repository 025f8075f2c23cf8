use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseEnumError;
use crate::model::ids::ContentId;

//
// ─── CONTENT KIND ──────────────────────────────────────────────────────────────
//

/// The three content collections served by a content source.
///
/// The string form doubles as the upstream endpoint name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Themes,
    Topics,
    Exercises,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Themes => "Themes",
            ContentKind::Topics => "Topics",
            ContentKind::Exercises => "Exercises",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Themes" | "themes" => Ok(Self::Themes),
            "Topics" | "topics" => Ok(Self::Topics),
            "Exercises" | "exercises" => Ok(Self::Exercises),
            other => Err(ParseEnumError::new("ContentKind", other)),
        }
    }
}

//
// ─── CONTENT RECORD ────────────────────────────────────────────────────────────
//

/// Field names inside a record's `field` bag.
pub mod fields {
    pub const TOPICS_INFO: &str = "topicsInfo";
    pub const EXERCISES_INFO: &str = "exercisesInfo";
    pub const VIDEO_INFO: &str = "videoInfo";
}

/// A theme, topic or exercise as delivered by a content source.
///
/// The `field` bag is loosely structured; only the relation fields the
/// aggregator needs are given typed accessors. File-backed content may carry
/// parent links (`themeId`, `topicId`) and a `type` tag at the top level.
/// Anything else is kept in `extra` so records survive a cache round-trip
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: ContentId,
    #[serde(default)]
    pub field: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<ContentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<ContentId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentRecord {
    #[must_use]
    pub fn new(id: impl Into<ContentId>) -> Self {
        Self {
            id: id.into(),
            field: Map::new(),
            theme_id: None,
            topic_id: None,
            item_type: None,
            extra: Map::new(),
        }
    }

    /// Builder-style helper to set a string entry in the `field` bag.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.field
            .insert(name.to_string(), Value::String(value.into()));
        self
    }

    #[must_use]
    pub fn with_theme_id(mut self, theme_id: impl Into<ContentId>) -> Self {
        self.theme_id = Some(theme_id.into());
        self
    }

    #[must_use]
    pub fn with_topic_id(mut self, topic_id: impl Into<ContentId>) -> Self {
        self.topic_id = Some(topic_id.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// String value of a `field` entry. Non-string values read as absent.
    #[must_use]
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.field.get(name).and_then(Value::as_str)
    }

    /// Raw `topicsInfo` of a theme.
    #[must_use]
    pub fn topics_info(&self) -> Option<&str> {
        self.text_field(fields::TOPICS_INFO)
    }

    /// Raw `exercisesInfo` of a topic.
    #[must_use]
    pub fn exercises_info(&self) -> Option<&str> {
        self.text_field(fields::EXERCISES_INFO)
    }

    /// Raw `videoInfo` of a topic.
    #[must_use]
    pub fn video_info(&self) -> Option<&str> {
        self.text_field(fields::VIDEO_INFO)
    }
}

/// Uniform result shape of every content fetch: `{ "data": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse {
    #[serde(default)]
    pub data: Vec<ContentRecord>,
}

impl ContentResponse {
    #[must_use]
    pub fn new(data: Vec<ContentRecord>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// First record with the given id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ContentRecord> {
        self.data.iter().find(|record| record.id.as_str() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
