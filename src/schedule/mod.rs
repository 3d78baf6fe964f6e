pub mod assignment_index;

pub use assignment_index::{AssignOutcome, AssignmentIndex};

use crate::types::FormVisitAssignment;

/// Builds the per-project lookup used by the by-visit dashboards.
pub fn build_assignment_index<I>(assignments: I) -> AssignmentIndex
where
    I: IntoIterator<Item = FormVisitAssignment>,
{
    AssignmentIndex::build(assignments)
}
