use crate::types::{SortBy, SortOrder, Task};
use std::cmp::Ordering;

/// Returns a sorted copy. The sort is stable, so ties keep list order in
/// both directions.
pub fn sort_tasks(tasks: &[Task], by: SortBy, order: SortOrder) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = compare(a, b, by);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    sorted
}

fn compare(a: &Task, b: &Task, by: SortBy) -> Ordering {
    match by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortBy::Priority => a.priority.cmp(&b.priority),
        SortBy::Text => a
            .text
            .to_lowercase()
            .cmp(&b.text.to_lowercase())
            .then_with(|| a.text.cmp(&b.text)),
    }
}
