use std::sync::Arc;

use futures::future::try_join_all;
use learnpath_core::aggregate::count_items;
use learnpath_core::model::{
    ContentId, ContentKind, ContentResponse, IdType, ProgressQuery, ProgressRecord,
    ProgressResult, ThemeProgressSummary, UserId,
};

use crate::content::ContentSource;
use crate::error::ProgressReportError;
use crate::progress_service::ProgressService;

/// Joins content totals with ledger counts to answer progress queries.
#[derive(Clone)]
pub struct ProgressReportService {
    content: Arc<dyn ContentSource>,
    progress: ProgressService,
}

impl ProgressReportService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentSource>, progress: ProgressService) -> Self {
        Self { content, progress }
    }

    #[must_use]
    pub fn progress_service(&self) -> &ProgressService {
        &self.progress
    }

    async fn fetch(&self, kind: ContentKind) -> Result<ContentResponse, ProgressReportError> {
        Ok(self.content.fetch(kind, None).await?)
    }

    /// Progress of `user_id` in one topic or theme.
    ///
    /// # Errors
    ///
    /// Returns `ProgressReportError::Content` if content cannot be fetched and
    /// `ProgressReportError::Progress` if the ledger fails.
    pub async fn progress_by_id(
        &self,
        user_id: UserId,
        id: ContentId,
        id_type: IdType,
    ) -> Result<ProgressResult, ProgressReportError> {
        let query = ProgressQuery::new(user_id, id, id_type);
        let topics = self.fetch(ContentKind::Topics).await?;

        let result = match id_type {
            IdType::TopicId => {
                let total = count_items(ContentKind::Topics, query.id.as_str(), &topics, &topics);
                self.progress
                    .get_progress_percentage_by_id(&query, total, None, Some(&topics))
                    .await?
            }
            IdType::ThemeId => {
                let themes = self.fetch(ContentKind::Themes).await?;
                let total = count_items(ContentKind::Themes, query.id.as_str(), &themes, &topics);
                self.progress
                    .get_progress_percentage_by_id(&query, total, Some(&themes), Some(&topics))
                    .await?
            }
        };
        Ok(result)
    }

    /// Progress of `user_id` in every theme, in theme order.
    ///
    /// With `ids` given only those themes are reported; unknown ids are
    /// skipped.
    ///
    /// # Errors
    ///
    /// See [`ProgressReportService::progress_by_id`].
    pub async fn themes_progress(
        &self,
        user_id: UserId,
        ids: Option<&[ContentId]>,
    ) -> Result<Vec<ThemeProgressSummary>, ProgressReportError> {
        let (themes, topics) = futures::try_join!(
            self.fetch(ContentKind::Themes),
            self.fetch(ContentKind::Topics),
        )?;

        let selected = themes
            .data
            .iter()
            .filter(|theme| ids.is_none_or(|ids| ids.contains(&theme.id)));

        let summaries = try_join_all(selected.map(|theme| {
            let query = ProgressQuery::new(user_id, theme.id.clone(), IdType::ThemeId);
            let total = count_items(ContentKind::Themes, theme.id.as_str(), &themes, &topics);
            let themes = &themes;
            let topics = &topics;
            async move {
                let result = self
                    .progress
                    .get_progress_percentage_by_id(&query, total, Some(themes), Some(topics))
                    .await?;
                Ok::<_, ProgressReportError>(ThemeProgressSummary {
                    id: query.id,
                    progress: result.progress(),
                })
            }
        }))
        .await?;

        Ok(summaries)
    }

    /// Every ledger record of `user_id` in `topic_id`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressReportError::Progress` if the ledger fails.
    pub async fn topic_statuses(
        &self,
        user_id: UserId,
        topic_id: ContentId,
    ) -> Result<Vec<ProgressRecord>, ProgressReportError> {
        let query = ProgressQuery::new(user_id, topic_id, IdType::TopicId);
        Ok(self.progress.get_all_status_progress_by_id(&query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use learnpath_core::filter::ContentFilter;
    use learnpath_core::model::content::fields::{EXERCISES_INFO, TOPICS_INFO, VIDEO_INFO};
    use learnpath_core::model::{ContentRecord, ElementType, ItemStatus, SaveStatusProgress};
    use learnpath_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    use crate::error::ContentFetchError;

    struct Fixture;

    #[async_trait]
    impl ContentSource for Fixture {
        async fn fetch(
            &self,
            kind: ContentKind,
            _filter: Option<&ContentFilter>,
        ) -> Result<ContentResponse, ContentFetchError> {
            let data = match kind {
                ContentKind::Themes => vec![
                    ContentRecord::new("th1").with_field(TOPICS_INFO, "t1,t2"),
                    ContentRecord::new("th2").with_field(TOPICS_INFO, "t3"),
                ],
                ContentKind::Topics => vec![
                    ContentRecord::new("t1")
                        .with_field(EXERCISES_INFO, "ex1,ex2,ex3")
                        .with_field(VIDEO_INFO, "video1"),
                    ContentRecord::new("t2"),
                    ContentRecord::new("t3").with_field(EXERCISES_INFO, "ex4,ex5"),
                ],
                ContentKind::Exercises => Vec::new(),
            };
            Ok(ContentResponse::new(data))
        }
    }

    async fn report() -> ProgressReportService {
        let progress = ProgressService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        for (item, topic, theme) in [("ex1", "t1", "th1"), ("ex4", "t3", "th2")] {
            progress
                .save_status_progress(SaveStatusProgress {
                    item_id: ContentId::new(item),
                    user_id: UserId::new(1),
                    item_status: ItemStatus::Completed,
                    element_type: ElementType::Exercise,
                    topic_id: ContentId::new(topic),
                    theme_id: ContentId::new(theme),
                })
                .await
                .unwrap();
        }
        ProgressReportService::new(Arc::new(Fixture), progress)
    }

    #[tokio::test]
    async fn topic_progress_uses_topic_totals() {
        let result = report()
            .await
            .progress_by_id(UserId::new(1), ContentId::new("t3"), IdType::TopicId)
            .await
            .unwrap();
        assert_eq!(result.progress(), 50);
        assert!(result.topics().is_none());
    }

    #[tokio::test]
    async fn theme_progress_uses_theme_totals() {
        let result = report()
            .await
            .progress_by_id(UserId::new(1), ContentId::new("th1"), IdType::ThemeId)
            .await
            .unwrap();
        assert_eq!(result.progress(), 25);
        assert_eq!(result.topics().map(<[_]>::len), Some(2));
    }

    #[tokio::test]
    async fn themes_progress_lists_all_or_selected_themes() {
        let svc = report().await;

        let all = svc.themes_progress(UserId::new(1), None).await.unwrap();
        assert_eq!(
            all,
            vec![
                ThemeProgressSummary {
                    id: ContentId::new("th1"),
                    progress: 25,
                },
                ThemeProgressSummary {
                    id: ContentId::new("th2"),
                    progress: 50,
                },
            ]
        );

        let selected = svc
            .themes_progress(UserId::new(1), Some(&[ContentId::new("th2"), ContentId::new("zz")]))
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, ContentId::new("th2"));
    }

    #[tokio::test]
    async fn topic_statuses_lists_ledger_records() {
        let records = report()
            .await
            .topic_statuses(UserId::new(1), ContentId::new("t1"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_id, ContentId::new("ex1"));
    }
}
