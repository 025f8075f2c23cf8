pub mod content;
mod ids;
pub mod progress;

pub use content::{ContentKind, ContentRecord, ContentResponse};
pub use ids::{ContentId, ParseIdError, UserId};

pub use progress::{
    ElementType, IdType, ItemStatus, Progress, ProgressQuery, ProgressRecord, ProgressResult,
    SaveStatusProgress, ThemeProgress, ThemeProgressSummary, TopicProgress,
    calculate_progress_percentage,
};
