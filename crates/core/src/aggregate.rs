//! Completable-item counts derived from content relation fields.
//!
//! Totals are never stored upstream, so they are recomputed from the
//! comma-separated id lists on each record. A missing theme or topic counts as
//! zero items instead of failing, so one inconsistent record cannot break
//! progress for unrelated content.

use crate::model::{ContentKind, ContentRecord, ContentResponse};

/// Placeholder value the content tool writes into an empty exercise list.
pub const UNTITLED_SENTINEL: &str = "Untitle";

/// Splits a relation field on commas, dropping empty segments.
#[must_use]
pub fn parse_id_list(raw: Option<&str>) -> Vec<&str> {
    raw.map(|value| value.split(',').filter(|id| !id.is_empty()).collect())
        .unwrap_or_default()
}

/// Exercise ids of a topic record; the sentinel means none.
#[must_use]
pub fn topic_exercise_ids(topic: &ContentRecord) -> Vec<&str> {
    match topic.exercises_info() {
        Some(UNTITLED_SENTINEL) | None => Vec::new(),
        raw => parse_id_list(raw),
    }
}

/// Topic ids referenced by a theme record, in reference order.
#[must_use]
pub fn theme_topic_ids(theme: &ContentRecord) -> Vec<&str> {
    parse_id_list(theme.topics_info())
}

/// Items of an already resolved topic record: its exercises plus one for a video.
#[must_use]
pub fn topic_record_items(topic: &ContentRecord) -> u64 {
    let exercises = topic_exercise_ids(topic).len() as u64;
    let video = u64::from(topic.video_info().is_some_and(|v| !v.is_empty()));
    exercises + video
}

/// Completable items of the topic `topic_id`; 0 when it is not in `topics`.
#[must_use]
pub fn count_topic_items(topic_id: &str, topics: &ContentResponse) -> u64 {
    topics.find(topic_id).map_or(0, topic_record_items)
}

/// Sum of the item counts of every topic referenced by theme `theme_id`.
///
/// Unknown themes, empty `topicsInfo` and unknown topic references all add 0.
#[must_use]
pub fn count_theme_items(theme_id: &str, themes: &ContentResponse, topics: &ContentResponse) -> u64 {
    let Some(theme) = themes.find(theme_id) else {
        return 0;
    };
    theme_topic_ids(theme)
        .into_iter()
        .map(|topic_id| count_topic_items(topic_id, topics))
        .sum()
}

/// Counts items for `id` according to the collection `kind` it belongs to.
///
/// `records` holds the collection named by `kind`; `topics` is only consulted
/// for themes. Exercises are leaves and always count 0.
#[must_use]
pub fn count_items(
    kind: ContentKind,
    id: &str,
    records: &ContentResponse,
    topics: &ContentResponse,
) -> u64 {
    match kind {
        ContentKind::Topics => count_topic_items(id, records),
        ContentKind::Themes => count_theme_items(id, records, topics),
        ContentKind::Exercises => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::fields::{EXERCISES_INFO, TOPICS_INFO, VIDEO_INFO};

    fn topic(id: &str, exercises: Option<&str>, video: Option<&str>) -> ContentRecord {
        let mut record = ContentRecord::new(id);
        if let Some(exercises) = exercises {
            record = record.with_field(EXERCISES_INFO, exercises);
        }
        if let Some(video) = video {
            record = record.with_field(VIDEO_INFO, video);
        }
        record
    }

    fn theme(id: &str, topics: Option<&str>) -> ContentRecord {
        match topics {
            Some(topics) => ContentRecord::new(id).with_field(TOPICS_INFO, topics),
            None => ContentRecord::new(id),
        }
    }

    #[test]
    fn parse_drops_empty_segments() {
        assert_eq!(parse_id_list(Some("a,,b,")), vec!["a", "b"]);
        assert!(parse_id_list(Some("")).is_empty());
        assert!(parse_id_list(None).is_empty());
    }

    #[test]
    fn unknown_topic_counts_zero() {
        let topics = ContentResponse::new(vec![topic("t1", Some("ex1"), None)]);
        assert_eq!(count_topic_items("nope", &topics), 0);
    }

    #[test]
    fn topic_counts_exercises_plus_video() {
        let topics = ContentResponse::new(vec![topic("t1", Some("ex1,ex2,ex3"), Some("video1"))]);
        assert_eq!(count_topic_items("t1", &topics), 4);
    }

    #[test]
    fn sentinel_means_no_exercises_but_video_still_counts() {
        let topics = ContentResponse::new(vec![
            topic("t1", Some("Untitle"), None),
            topic("t2", Some("Untitle"), Some("v")),
        ]);
        assert_eq!(count_topic_items("t1", &topics), 0);
        assert_eq!(count_topic_items("t2", &topics), 1);
    }

    #[test]
    fn empty_video_does_not_count() {
        let topics = ContentResponse::new(vec![topic("t1", Some("ex1"), Some(""))]);
        assert_eq!(count_topic_items("t1", &topics), 1);
    }

    #[test]
    fn theme_sums_referenced_topics_and_ignores_unknown() {
        let topics = ContentResponse::new(vec![
            topic("t1", Some("ex1,ex2,ex3"), Some("v")),
            topic("t2", None, None),
            topic("t3", Some("ex9"), None),
        ]);
        let themes = ContentResponse::new(vec![theme("th1", Some("t1,t2,missing,t3"))]);
        assert_eq!(count_theme_items("th1", &themes, &topics), 5);
    }

    #[test]
    fn theme_without_topics_or_unknown_counts_zero() {
        let topics = ContentResponse::new(vec![topic("t1", Some("ex1"), None)]);
        let themes = ContentResponse::new(vec![theme("th1", None), theme("th2", Some(""))]);
        assert_eq!(count_theme_items("th1", &themes, &topics), 0);
        assert_eq!(count_theme_items("th2", &themes, &topics), 0);
        assert_eq!(count_theme_items("th9", &themes, &topics), 0);
    }

    #[test]
    fn dispatch_matches_direct_calls() {
        let topics = ContentResponse::new(vec![topic("t1", Some("ex1,ex2"), Some("v"))]);
        let themes = ContentResponse::new(vec![theme("th1", Some("t1"))]);

        assert_eq!(count_items(ContentKind::Topics, "t1", &topics, &topics), 3);
        assert_eq!(count_items(ContentKind::Themes, "th1", &themes, &topics), 3);
        assert_eq!(count_items(ContentKind::Exercises, "ex1", &topics, &topics), 0);
    }
}
