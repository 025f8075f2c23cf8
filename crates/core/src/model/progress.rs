use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;
use crate::model::content::ContentKind;
use crate::model::ids::{ContentId, UserId};

//
// ─── ENUMERATIONS ──────────────────────────────────────────────────────────────
//

/// Completion state of a single completable unit for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::NotStarted => "NotStarted",
            ItemStatus::InProgress => "InProgress",
            ItemStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotStarted" => Ok(Self::NotStarted),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            other => Err(ParseEnumError::new("ItemStatus", other)),
        }
    }
}

/// Which kind of completable unit a ledger record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[serde(alias = "Exercise")]
    Exercise,
    #[serde(alias = "Video")]
    Video,
}

impl ElementType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Exercise => "exercise",
            ElementType::Video => "video",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exercise" | "Exercise" => Ok(Self::Exercise),
            "video" | "Video" => Ok(Self::Video),
            other => Err(ParseEnumError::new("ElementType", other)),
        }
    }
}

/// Scope discriminator of a progress query: by owning topic or owning theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    #[serde(rename = "topicId")]
    TopicId,
    #[serde(rename = "themeId")]
    ThemeId,
}

impl IdType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IdType::TopicId => "topicId",
            IdType::ThemeId => "themeId",
        }
    }

    /// Content collection whose records define the total for this scope.
    #[must_use]
    pub fn content_kind(self) -> ContentKind {
        match self {
            IdType::TopicId => ContentKind::Topics,
            IdType::ThemeId => ContentKind::Themes,
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topicId" => Ok(Self::TopicId),
            "themeId" => Ok(Self::ThemeId),
            other => Err(ParseEnumError::new("IdType", other)),
        }
    }
}

//
// ─── LEDGER RECORD ─────────────────────────────────────────────────────────────
//

/// One user's status for one completable unit.
///
/// `(item_id, user_id)` is unique across the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: i64,
    pub item_id: ContentId,
    pub user_id: UserId,
    pub element_type: ElementType,
    pub topic_id: ContentId,
    pub theme_id: ContentId,
    pub item_status: ItemStatus,
    pub modified_at: DateTime<Utc>,
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

/// Progress lookup for one topic or theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub user_id: UserId,
    pub id: ContentId,
    pub id_type: IdType,
}

impl ProgressQuery {
    #[must_use]
    pub fn new(user_id: UserId, id: impl Into<ContentId>, id_type: IdType) -> Self {
        Self {
            user_id,
            id: id.into(),
            id_type,
        }
    }
}

/// Status write for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatusProgress {
    pub item_id: ContentId,
    pub user_id: UserId,
    pub item_status: ItemStatus,
    pub element_type: ElementType,
    pub topic_id: ContentId,
    pub theme_id: ContentId,
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// A completion percentage. Values above 100 are possible when the ledger
/// holds more completed records than the content currently lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub progress: u64,
}

impl Progress {
    #[must_use]
    pub fn new(progress: u64) -> Self {
        Self { progress }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub topic_id: ContentId,
    pub progress: u64,
}

/// Theme-scoped result; always carries the per-topic breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeProgress {
    pub progress: u64,
    pub topics: Vec<TopicProgress>,
}

/// Result of a progress lookup. Serializes as `{progress}` for topics and
/// `{progress, topics}` for themes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressResult {
    Theme(ThemeProgress),
    Topic(Progress),
}

impl ProgressResult {
    #[must_use]
    pub fn progress(&self) -> u64 {
        match self {
            ProgressResult::Theme(theme) => theme.progress,
            ProgressResult::Topic(topic) => topic.progress,
        }
    }

    #[must_use]
    pub fn topics(&self) -> Option<&[TopicProgress]> {
        match self {
            ProgressResult::Theme(theme) => Some(&theme.topics),
            ProgressResult::Topic(_) => None,
        }
    }
}

/// Entry of the all-themes progress listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeProgressSummary {
    pub id: ContentId,
    pub progress: u64,
}

//
// ─── ARITHMETIC ────────────────────────────────────────────────────────────────
//

/// `floor(completed / total * 100)`, or 0 when either side is 0.
///
/// There is no upper clamp.
///
/// ```
/// use learnpath_core::model::calculate_progress_percentage;
///
/// assert_eq!(calculate_progress_percentage(1, 3).progress, 33);
/// assert_eq!(calculate_progress_percentage(10, 2).progress, 500);
/// assert_eq!(calculate_progress_percentage(4, 0).progress, 0);
/// ```
#[must_use]
pub fn calculate_progress_percentage(completed: u64, total: u64) -> Progress {
    if completed == 0 || total == 0 {
        return Progress::default();
    }
    let percent = u128::from(completed) * 100 / u128::from(total);
    Progress::new(u64::try_from(percent).unwrap_or(u64::MAX))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_on_either_side_is_zero() {
        for n in [0, 1, 7, 1_000] {
            assert_eq!(calculate_progress_percentage(0, n), Progress::new(0));
            assert_eq!(calculate_progress_percentage(n, 0), Progress::new(0));
        }
    }

    #[test]
    fn floors_instead_of_rounding() {
        assert_eq!(calculate_progress_percentage(6, 12).progress, 50);
        assert_eq!(calculate_progress_percentage(1, 3).progress, 33);
        assert_eq!(calculate_progress_percentage(2, 3).progress, 66);
        assert_eq!(calculate_progress_percentage(29, 100).progress, 29);
    }

    #[test]
    fn does_not_clamp_above_one_hundred() {
        assert_eq!(calculate_progress_percentage(10, 2).progress, 500);
    }

    #[test]
    fn topic_and_theme_results_have_distinct_shapes() {
        let topic = ProgressResult::Topic(Progress::new(50));
        assert_eq!(serde_json::to_string(&topic).unwrap(), r#"{"progress":50}"#);

        let theme = ProgressResult::Theme(ThemeProgress::default());
        assert_eq!(
            serde_json::to_string(&theme).unwrap(),
            r#"{"progress":0,"topics":[]}"#
        );
    }

    #[test]
    fn id_type_uses_ledger_column_names() {
        assert_eq!(serde_json::to_string(&IdType::TopicId).unwrap(), "\"topicId\"");
        assert_eq!("themeId".parse::<IdType>().unwrap(), IdType::ThemeId);
        assert_eq!(IdType::ThemeId.content_kind(), ContentKind::Themes);
    }

    #[test]
    fn element_type_accepts_both_casings() {
        let parsed: ElementType = serde_json::from_str("\"Video\"").unwrap();
        assert_eq!(parsed, ElementType::Video);
        assert_eq!("exercise".parse::<ElementType>().unwrap(), ElementType::Exercise);
    }
}
