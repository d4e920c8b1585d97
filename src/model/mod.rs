// File: ./src/model/mod.rs
pub mod date;
pub mod eligibility;
pub mod grammar;
pub mod item;
pub mod parser;
pub mod recurrence;
pub mod transition;

pub use eligibility::SelectionMode;
pub use grammar::{Decoration, PriorityTags};
pub use item::Task;
pub use recurrence::{DaySpec, IntervalUnit, RecurrenceRule};
pub use transition::{CompletionAction, Transition};
