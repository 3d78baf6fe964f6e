pub mod dashboard;
pub mod resolver;

pub use dashboard::{
    FormStatusCell, ProjectStats, StatusCounts, SubjectRow, VisitRow, project_stats,
    sort_subject_ids, subject_visit_grid, subjects_overview,
};
pub use resolver::{
    CompletionStatus, Resolution, find_record, resolve_status, resolve_status_detailed,
};
