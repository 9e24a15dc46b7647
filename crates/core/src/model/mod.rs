mod category;
mod curriculum;
mod event;
mod ids;
mod progress;
mod stats;
mod user;

pub use category::{Category, ParseCategoryError};
pub use curriculum::{Curriculum, DaySpec};
pub use event::{EventType, QueuedEvent};
pub use ids::{ParseIdError, SessionId, UserId};
pub use progress::{ProgressError, ProgressPatch, ProgressRecord, percent_of};
pub use stats::{LevelStat, OverallStats, ProgressStats};
pub use user::{DEFAULT_COHORT, Role, User};
