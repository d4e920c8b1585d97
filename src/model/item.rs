// File: ./src/model/item.rs
use crate::model::date::resolve_expr;
use crate::model::recurrence::RecurrenceRule;
use chrono::NaiveDate;
use serde::Serialize;

/// One checkbox line of a document.
///
/// Decorations are kept as the raw text found between the parentheses. A `Task` is a
/// snapshot: editing the document and re-parsing produces new values, and
/// `line_index` is only meaningful for the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub text: String,
    pub line_index: usize,
    pub done: bool,
    pub priority: Option<usize>,
    pub start: Option<String>,
    pub due: Option<String>,
    pub recur: Option<String>,
}

impl Task {
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.start.as_deref().and_then(|s| resolve_expr(s, today))
    }

    pub fn due_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.due.as_deref().and_then(|s| resolve_expr(s, today))
    }

    pub fn recurrence(&self) -> Option<RecurrenceRule> {
        self.recur.as_deref().and_then(RecurrenceRule::parse)
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence().is_some()
    }

    /// Rebuilds a canonical checkbox line from the parsed state.
    pub fn to_line(&self) -> String {
        format!("- [{}] {}", if self.done { 'x' } else { ' ' }, self.text)
    }
}
