mod admin_vm;
mod curriculum_vm;
mod dashboard_vm;
mod page_vm;
mod time_fmt;

pub use admin_vm::{AdminVm, InternRowVm, map_admin};
pub use curriculum_vm::{CurriculumVm, DayVm, LevelVm, difficulty_label, map_curriculum};
pub use dashboard_vm::{CategoryCardVm, DashboardVm, map_dashboard};
pub use page_vm::PageModel;
pub use time_fmt::{format_datetime, format_last_updated};
