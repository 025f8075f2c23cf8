use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use learnpath_core::aggregate::{theme_topic_ids, topic_record_items};
use learnpath_core::model::{
    self, ContentId, ContentRecord, ContentResponse, IdType, Progress, ProgressQuery,
    ProgressRecord, ProgressResult, SaveStatusProgress, ThemeProgress, TopicProgress, UserId,
};
use storage::repository::{NewProgressRecord, ProgressCountFilter, ProgressRepository, ProgressScope};
use tracing::debug;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Computes completion percentages from the progress ledger and records
/// status changes.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    #[must_use]
    pub fn calculate_progress_percentage(&self, completed: u64, total: u64) -> Progress {
        model::calculate_progress_percentage(completed, total)
    }

    /// Completion percentage of a topic or theme for one user.
    ///
    /// Topic lookups return `{progress}`. Theme lookups with `themes` and
    /// `topics` supplied return `{progress, topics}` where every referenced
    /// topic known to `topics` gets its own percentage; an unknown theme
    /// yields `{progress: 0, topics: []}`. Without content records a theme
    /// lookup counts completed records by `themeId` only.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Fetch` if any ledger query fails.
    pub async fn get_progress_percentage_by_id(
        &self,
        query: &ProgressQuery,
        total_items: u64,
        themes: Option<&ContentResponse>,
        topics: Option<&ContentResponse>,
    ) -> Result<ProgressResult, ProgressServiceError> {
        if let (IdType::ThemeId, Some(themes), Some(topics)) = (query.id_type, themes, topics) {
            let theme = self
                .theme_progress(query.user_id, &query.id, total_items, themes, topics)
                .await?;
            return Ok(ProgressResult::Theme(theme));
        }

        let scope = ProgressScope::new(query.id_type, query.id.clone());
        let completed = self.completed_count(query.user_id, scope).await?;
        Ok(ProgressResult::Topic(
            self.calculate_progress_percentage(completed, total_items),
        ))
    }

    async fn theme_progress(
        &self,
        user_id: UserId,
        theme_id: &ContentId,
        total_items: u64,
        themes: &ContentResponse,
        topics: &ContentResponse,
    ) -> Result<ThemeProgress, ProgressServiceError> {
        let Some(theme) = themes.find(theme_id.as_str()) else {
            debug!(theme_id = %theme_id, "theme not found; reporting zero progress");
            return Ok(ThemeProgress::default());
        };

        let mut seen = HashSet::new();
        let referenced: Vec<&ContentRecord> = theme_topic_ids(theme)
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| topics.find(id))
            .collect();

        // try_join_all keeps input order
        let breakdown = try_join_all(
            referenced
                .into_iter()
                .map(|topic| self.topic_breakdown(user_id, topic)),
        )
        .await?;

        let completed: u64 = breakdown.iter().map(|(_, done)| done).sum();
        Ok(ThemeProgress {
            progress: self
                .calculate_progress_percentage(completed, total_items)
                .progress,
            topics: breakdown.into_iter().map(|(topic, _)| topic).collect(),
        })
    }

    async fn topic_breakdown(
        &self,
        user_id: UserId,
        topic: &ContentRecord,
    ) -> Result<(TopicProgress, u64), ProgressServiceError> {
        let total = topic_record_items(topic);
        let completed = self
            .completed_count(user_id, ProgressScope::Topic(topic.id.clone()))
            .await?;
        let progress = TopicProgress {
            topic_id: topic.id.clone(),
            progress: self.calculate_progress_percentage(completed, total).progress,
        };
        Ok((progress, completed))
    }

    async fn completed_count(
        &self,
        user_id: UserId,
        scope: ProgressScope,
    ) -> Result<u64, ProgressServiceError> {
        self.progress
            .count(&ProgressCountFilter::completed(user_id, scope))
            .await
            .map_err(ProgressServiceError::Fetch)
    }

    /// The ledger record for `(item_id, user_id)`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Fetch` if the ledger read fails.
    pub async fn get_single_status_progress_by_item_id(
        &self,
        item_id: &ContentId,
        user_id: UserId,
    ) -> Result<Option<ProgressRecord>, ProgressServiceError> {
        self.progress
            .find_first(user_id, item_id)
            .await
            .map_err(ProgressServiceError::Fetch)
    }

    /// Every ledger record of the user inside the queried topic or theme.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Fetch` if the ledger read fails.
    pub async fn get_all_status_progress_by_id(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let scope = ProgressScope::new(query.id_type, query.id.clone());
        self.progress
            .find_many(query.user_id, &scope)
            .await
            .map_err(ProgressServiceError::Fetch)
    }

    /// Create or update the status of one unit.
    ///
    /// An existing record keeps its element type, topic and theme; only the
    /// status and modification time change.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Save` if the ledger write fails.
    pub async fn save_status_progress(
        &self,
        request: SaveStatusProgress,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let record = NewProgressRecord::from_request(request, self.clock.now());
        let saved = self
            .progress
            .upsert(record)
            .await
            .map_err(ProgressServiceError::Save)?;
        debug!(item_id = %saved.item_id, status = saved.item_status.as_str(), "progress saved");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Duration;
    use learnpath_core::aggregate::{count_theme_items, count_topic_items};
    use learnpath_core::model::content::fields::{EXERCISES_INFO, TOPICS_INFO, VIDEO_INFO};
    use learnpath_core::model::{ElementType, ItemStatus};
    use learnpath_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, StorageError};

    struct FailingRepository;

    #[async_trait]
    impl ProgressRepository for FailingRepository {
        async fn count(&self, _filter: &ProgressCountFilter) -> Result<u64, StorageError> {
            Err(StorageError::Connection("down".into()))
        }

        async fn find_first(
            &self,
            _user_id: UserId,
            _item_id: &ContentId,
        ) -> Result<Option<ProgressRecord>, StorageError> {
            Err(StorageError::Connection("down".into()))
        }

        async fn find_many(
            &self,
            _user_id: UserId,
            _scope: &ProgressScope,
        ) -> Result<Vec<ProgressRecord>, StorageError> {
            Err(StorageError::Connection("down".into()))
        }

        async fn upsert(&self, _record: NewProgressRecord) -> Result<ProgressRecord, StorageError> {
            Err(StorageError::Connection("down".into()))
        }
    }

    fn service() -> ProgressService {
        ProgressService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    fn save(item: &str, user: u64, topic: &str, theme: &str, status: ItemStatus) -> SaveStatusProgress {
        SaveStatusProgress {
            item_id: ContentId::new(item),
            user_id: UserId::new(user),
            item_status: status,
            element_type: ElementType::Exercise,
            topic_id: ContentId::new(topic),
            theme_id: ContentId::new(theme),
        }
    }

    fn content() -> (ContentResponse, ContentResponse) {
        let themes = ContentResponse::new(vec![
            ContentRecord::new("th1").with_field(TOPICS_INFO, "t1,t2"),
        ]);
        let topics = ContentResponse::new(vec![
            ContentRecord::new("t1")
                .with_field(EXERCISES_INFO, "ex1,ex2,ex3")
                .with_field(VIDEO_INFO, "video1"),
            ContentRecord::new("t2"),
        ]);
        (themes, topics)
    }

    #[test]
    fn percentage_floors_and_does_not_clamp() {
        let svc = service();
        assert_eq!(svc.calculate_progress_percentage(0, 7).progress, 0);
        assert_eq!(svc.calculate_progress_percentage(7, 0).progress, 0);
        assert_eq!(svc.calculate_progress_percentage(6, 12).progress, 50);
        assert_eq!(svc.calculate_progress_percentage(1, 3).progress, 33);
        assert_eq!(svc.calculate_progress_percentage(10, 2).progress, 500);
    }

    #[tokio::test]
    async fn topic_progress_counts_completed_records() {
        let svc = service();
        svc.save_status_progress(save("ex1", 1, "t1", "th1", ItemStatus::Completed))
            .await
            .unwrap();
        svc.save_status_progress(save("ex2", 1, "t1", "th1", ItemStatus::InProgress))
            .await
            .unwrap();

        let topics = ContentResponse::new(vec![
            ContentRecord::new("t1").with_field(EXERCISES_INFO, "ex1,ex2"),
        ]);
        let total = count_topic_items("t1", &topics);
        let query = ProgressQuery::new(UserId::new(1), "t1", IdType::TopicId);

        let result = svc
            .get_progress_percentage_by_id(&query, total, None, Some(&topics))
            .await
            .unwrap();

        assert_eq!(result, ProgressResult::Topic(Progress::new(50)));
        assert!(result.topics().is_none());
    }

    #[tokio::test]
    async fn theme_progress_reports_each_referenced_topic() {
        let svc = service();
        svc.save_status_progress(save("ex1", 1, "t1", "th1", ItemStatus::Completed))
            .await
            .unwrap();
        let (themes, topics) = content();
        let total = count_theme_items("th1", &themes, &topics);
        let query = ProgressQuery::new(UserId::new(1), "th1", IdType::ThemeId);

        let result = svc
            .get_progress_percentage_by_id(&query, total, Some(&themes), Some(&topics))
            .await
            .unwrap();

        assert_eq!(total, 4);
        assert_eq!(
            result,
            ProgressResult::Theme(ThemeProgress {
                progress: 25,
                topics: vec![
                    TopicProgress {
                        topic_id: ContentId::new("t1"),
                        progress: 25,
                    },
                    TopicProgress {
                        topic_id: ContentId::new("t2"),
                        progress: 0,
                    },
                ],
            })
        );
    }

    #[tokio::test]
    async fn unknown_theme_is_zero_with_empty_breakdown() {
        let (themes, topics) = content();
        let query = ProgressQuery::new(UserId::new(1), "missing", IdType::ThemeId);

        let result = service()
            .get_progress_percentage_by_id(&query, 0, Some(&themes), Some(&topics))
            .await
            .unwrap();

        assert_eq!(result, ProgressResult::Theme(ThemeProgress::default()));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"progress": 0, "topics": []})
        );
    }

    #[tokio::test]
    async fn theme_breakdown_skips_unknown_and_repeated_topics() {
        let themes = ContentResponse::new(vec![
            ContentRecord::new("th1").with_field(TOPICS_INFO, "t2,ghost,t1,t2"),
        ]);
        let (_, topics) = content();
        let query = ProgressQuery::new(UserId::new(1), "th1", IdType::ThemeId);

        let result = service()
            .get_progress_percentage_by_id(&query, 4, Some(&themes), Some(&topics))
            .await
            .unwrap();

        let ids: Vec<&str> = result
            .topics()
            .unwrap()
            .iter()
            .map(|t| t.topic_id.as_str())
            .collect();
        assert_eq!(ids, vec!["t2", "t1"]);
    }

    #[tokio::test]
    async fn theme_without_content_falls_back_to_flat_count() {
        let svc = service();
        svc.save_status_progress(save("ex1", 1, "t1", "th1", ItemStatus::Completed))
            .await
            .unwrap();
        svc.save_status_progress(save("v1", 1, "t2", "th1", ItemStatus::Completed))
            .await
            .unwrap();
        let query = ProgressQuery::new(UserId::new(1), "th1", IdType::ThemeId);

        let result = svc
            .get_progress_percentage_by_id(&query, 8, None, None)
            .await
            .unwrap();

        assert_eq!(result, ProgressResult::Topic(Progress::new(25)));
    }

    #[tokio::test]
    async fn save_twice_keeps_one_record_with_latest_status() {
        let repo = InMemoryRepository::new();
        let mut svc = ProgressService::new(fixed_clock(), Arc::new(repo.clone()));

        let first = svc
            .save_status_progress(save("ex1", 1, "t1", "th1", ItemStatus::InProgress))
            .await
            .unwrap();
        svc.clock = fixed_clock().advanced(Duration::minutes(5));
        let second = svc
            .save_status_progress(save("ex1", 1, "t9", "th9", ItemStatus::Completed))
            .await
            .unwrap();

        assert_eq!(repo.len().unwrap(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.item_status, ItemStatus::Completed);
        assert_eq!(second.topic_id, ContentId::new("t1"));
        assert_eq!(second.modified_at, fixed_now() + Duration::minutes(5));
    }

    #[tokio::test]
    async fn lookups_return_absent_or_empty_without_error() {
        let svc = service();
        svc.save_status_progress(save("ex1", 1, "t1", "th1", ItemStatus::Completed))
            .await
            .unwrap();

        let found = svc
            .get_single_status_progress_by_item_id(&ContentId::new("ex1"), UserId::new(1))
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.item_status), Some(ItemStatus::Completed));

        let absent = svc
            .get_single_status_progress_by_item_id(&ContentId::new("ex1"), UserId::new(2))
            .await
            .unwrap();
        assert!(absent.is_none());

        let by_theme = svc
            .get_all_status_progress_by_id(&ProgressQuery::new(UserId::new(1), "th1", IdType::ThemeId))
            .await
            .unwrap();
        assert_eq!(by_theme.len(), 1);

        let none = svc
            .get_all_status_progress_by_id(&ProgressQuery::new(UserId::new(1), "t7", IdType::TopicId))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn ledger_failures_map_to_fetch_and_save_errors() {
        let svc = ProgressService::new(fixed_clock(), Arc::new(FailingRepository));
        let (themes, topics) = content();
        let query = ProgressQuery::new(UserId::new(1), "th1", IdType::ThemeId);

        let err = svc
            .get_progress_percentage_by_id(&query, 4, Some(&themes), Some(&topics))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::Fetch(_)));
        assert_eq!(err.to_string(), "Error fetching user progress from database");

        let err = svc
            .save_status_progress(save("ex1", 1, "t1", "th1", ItemStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::Save(_)));
        assert_eq!(err.to_string(), "Error saving progress status");
    }
}
