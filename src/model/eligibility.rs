// File: src/model/eligibility.rs
//! Which tasks are actionable today, and how urgent they are.
use crate::model::date::compare_ymd;
use crate::model::{PriorityTags, Task};
use chrono::NaiveDate;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Only the first eligible task of the document.
    SingleNext,
    /// Every eligible task of the document.
    AllEligible,
}

/// A task is eligible when it is open and its start date, if any, is not in the future.
///
/// An unparseable start expression imposes no constraint.
pub fn is_eligible(task: &Task, today: NaiveDate) -> bool {
    if task.done {
        return false;
    }
    match task.start_date(today) {
        Some(start) => compare_ymd(&start, &today) != Ordering::Greater,
        None => true,
    }
}

pub fn select_eligible(tasks: &[Task], today: NaiveDate, mode: SelectionMode) -> Vec<&Task> {
    let mut eligible = tasks.iter().filter(|t| is_eligible(t, today));
    match mode {
        SelectionMode::SingleNext => eligible.next().into_iter().collect(),
        SelectionMode::AllEligible => eligible.collect(),
    }
}

/// The task's own tag wins, then `fallback` (usually the document's rank), then the
/// middle of the tag list. Always within `1..=tags.len()`.
pub fn resolve_priority(task: &Task, fallback: Option<usize>, tags: &PriorityTags) -> usize {
    tags.rank_in(&task.text)
        .or(fallback)
        .filter(|rank| (1..=tags.len()).contains(rank))
        .unwrap_or_else(|| tags.middle_rank())
}
