use std::collections::HashSet;
use std::sync::Arc;

use learnpath_core::filter::ContentFilter;
use learnpath_core::model::{ContentId, ContentKind, ContentRecord, ContentResponse};
use serde::{Deserialize, Serialize};

use crate::content::ContentSource;
use crate::error::ContentFetchError;

/// All content in one payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullContent {
    pub themes: Vec<ContentRecord>,
    pub topics: Vec<ContentRecord>,
    pub exercises: Vec<ContentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStats {
    pub theme_id: ContentId,
    pub total_topics: u64,
    pub total_exercises: u64,
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStats {
    pub topic_id: ContentId,
    pub total_exercises: u64,
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_themes: u64,
    pub total_topics: u64,
    pub total_exercises: u64,
    pub total_items: u64,
}

/// Content counts, shaped by what was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentStats {
    Theme(ThemeStats),
    Topic(TopicStats),
    Overall(OverallStats),
}

/// Which slice of content `ContentService::stats` counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatsScope {
    #[default]
    All,
    Theme(ContentId),
    Topic(ContentId),
}

/// Exercise listing restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExerciseFilter {
    #[default]
    All,
    Topic(ContentId),
    /// Exercise `type` tag, e.g. `video` or `exercise`.
    Type(String),
}

/// Read-side queries over a content source. Lookups by id that match
/// nothing return `Ok(None)`.
#[derive(Clone)]
pub struct ContentService {
    source: Arc<dyn ContentSource>,
}

impl ContentService {
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> Arc<dyn ContentSource> {
        Arc::clone(&self.source)
    }

    async fn fetch(&self, kind: ContentKind) -> Result<ContentResponse, ContentFetchError> {
        self.fetch_filtered(kind, None).await
    }

    /// Raw listing of one collection with an upstream filter applied.
    ///
    /// Only the Stackby source honours `filter`; it also keys the cache on it.
    ///
    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn fetch_filtered(
        &self,
        kind: ContentKind,
        filter: Option<&ContentFilter>,
    ) -> Result<ContentResponse, ContentFetchError> {
        self.source.fetch(kind, filter).await
    }

    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn themes(&self) -> Result<ContentResponse, ContentFetchError> {
        self.fetch(ContentKind::Themes).await
    }

    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn theme_by_id(&self, id: &str) -> Result<Option<ContentRecord>, ContentFetchError> {
        Ok(find_owned(self.themes().await?, id))
    }

    /// Topics, optionally only those whose `themeId` matches.
    ///
    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn topics(
        &self,
        theme_id: Option<&ContentId>,
    ) -> Result<ContentResponse, ContentFetchError> {
        let mut topics = self.fetch(ContentKind::Topics).await?;
        if let Some(theme_id) = theme_id {
            topics
                .data
                .retain(|topic| topic.theme_id.as_ref() == Some(theme_id));
        }
        Ok(topics)
    }

    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn topic_by_id(&self, id: &str) -> Result<Option<ContentRecord>, ContentFetchError> {
        Ok(find_owned(self.fetch(ContentKind::Topics).await?, id))
    }

    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn exercises(
        &self,
        filter: &ExerciseFilter,
    ) -> Result<ContentResponse, ContentFetchError> {
        let mut exercises = self.fetch(ContentKind::Exercises).await?;
        match filter {
            ExerciseFilter::All => {}
            ExerciseFilter::Topic(topic_id) => exercises
                .data
                .retain(|exercise| exercise.topic_id.as_ref() == Some(topic_id)),
            ExerciseFilter::Type(item_type) => exercises
                .data
                .retain(|exercise| exercise.item_type.as_deref() == Some(item_type.as_str())),
        }
        Ok(exercises)
    }

    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn exercise_by_id(
        &self,
        id: &str,
    ) -> Result<Option<ContentRecord>, ContentFetchError> {
        Ok(find_owned(self.fetch(ContentKind::Exercises).await?, id))
    }

    /// Themes, topics and exercises, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first `ContentFetchError` of the three fetches.
    pub async fn full_content(&self) -> Result<FullContent, ContentFetchError> {
        let (themes, topics, exercises) = futures::try_join!(
            self.fetch(ContentKind::Themes),
            self.fetch(ContentKind::Topics),
            self.fetch(ContentKind::Exercises),
        )?;
        Ok(FullContent {
            themes: themes.data,
            topics: topics.data,
            exercises: exercises.data,
        })
    }

    /// # Errors
    ///
    /// Returns `ContentFetchError` if the source fails.
    pub async fn stats(&self, scope: &StatsScope) -> Result<ContentStats, ContentFetchError> {
        let content = self.full_content().await?;
        Ok(content_stats(&content, scope))
    }
}

fn find_owned(response: ContentResponse, id: &str) -> Option<ContentRecord> {
    response.data.into_iter().find(|record| record.id.as_str() == id)
}

fn count<'a>(records: impl Iterator<Item = &'a ContentRecord>) -> u64 {
    records.count() as u64
}

/// Theme counts cover topics whose `themeId` is the theme and the exercises
/// of those topics. Topic counts cover its exercises only.
#[must_use]
pub fn content_stats(content: &FullContent, scope: &StatsScope) -> ContentStats {
    match scope {
        StatsScope::Theme(theme_id) => {
            let topics: Vec<&ContentRecord> = content
                .topics
                .iter()
                .filter(|t| t.theme_id.as_ref() == Some(theme_id))
                .collect();
            let topic_ids: HashSet<&ContentId> = topics.iter().map(|t| &t.id).collect();
            let total_topics = topics.len() as u64;
            let total_exercises = count(content.exercises.iter().filter(|e| {
                e.topic_id
                    .as_ref()
                    .is_some_and(|topic_id| topic_ids.contains(topic_id))
            }));
            ContentStats::Theme(ThemeStats {
                theme_id: theme_id.clone(),
                total_topics,
                total_exercises,
                total_items: total_topics + total_exercises,
            })
        }
        StatsScope::Topic(topic_id) => {
            let total_exercises = count(
                content
                    .exercises
                    .iter()
                    .filter(|e| e.topic_id.as_ref() == Some(topic_id)),
            );
            ContentStats::Topic(TopicStats {
                topic_id: topic_id.clone(),
                total_exercises,
                total_items: total_exercises,
            })
        }
        StatsScope::All => {
            let total_themes = content.themes.len() as u64;
            let total_topics = content.topics.len() as u64;
            let total_exercises = content.exercises.len() as u64;
            ContentStats::Overall(OverallStats {
                total_themes,
                total_topics,
                total_exercises,
                total_items: total_themes + total_topics + total_exercises,
            })
        }
    }
}
