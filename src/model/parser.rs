// File: src/model/parser.rs
use crate::model::grammar::{Decoration, PriorityTags, match_checkbox};
use crate::model::Task;

/// Parses a single line. Returns `None` for anything that is not a
/// `- [ ]` / `- [x]` checkbox line.
pub fn parse_line(line: &str, line_index: usize, tags: &PriorityTags) -> Option<Task> {
    let checkbox = match_checkbox(line)?;
    let text = checkbox.text.trim();

    Some(Task {
        text: text.to_string(),
        line_index,
        done: checkbox.done,
        priority: tags.rank_in(text),
        start: Decoration::Start.value(text),
        due: Decoration::Due.value(text),
        recur: Decoration::Recur.value(text),
    })
}

/// Extracts every checkbox task of a document, in document order.
pub fn parse_tasks(document: &str, tags: &PriorityTags) -> Vec<Task> {
    document
        .split('\n')
        .enumerate()
        .filter_map(|(i, line)| parse_line(line, i, tags))
        .collect()
}
