// Completion markers, export-date ordering and stage completion

pub mod manager;
pub mod stage;

pub use manager::{check_export_ordering, StateManager, DELETE_TASK_ID};
pub use stage::StageRun;
