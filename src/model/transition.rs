// File: src/model/transition.rs
//! Completing and un-completing task lines.
//!
//! Recurring tasks never finish: completing one keeps the checkbox open and moves its
//! `@start(...)` to the next occurrence. Everything here is pure string rewriting;
//! writing the result back is the caller's job.
use crate::clock::Clock;
use crate::model::date::{format_ymd, resolve_expr};
use crate::model::grammar::{Checkbox, Decoration, PriorityTags, match_checkbox, set_marker};
use crate::model::parser::parse_tasks;
use crate::model::recurrence::RecurrenceRule;
use crate::model::Task;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    Complete,
    Undo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    MarkedDone,
    Reopened,
    /// A recurring task rolled forward to a new start date.
    Advanced(NaiveDate),
}

impl Transition {
    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineUpdate {
    pub line: String,
    pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub document: String,
    pub line_index: Option<usize>,
    pub transition: Transition,
}

impl CompletionOutcome {
    fn untouched(document: &str) -> Self {
        Self {
            document: document.to_string(),
            line_index: None,
            transition: Transition::Unchanged,
        }
    }
}

/// Applies `action` to a single line. Lines that are not checkbox tasks, and actions
/// that do not apply to the current state, come back unchanged.
pub fn transition_line(line: &str, action: CompletionAction, clock: &dyn Clock) -> LineUpdate {
    let (body, eol) = match line.strip_suffix('\r') {
        Some(body) => (body, "\r"),
        None => (line, ""),
    };
    let unchanged = || LineUpdate {
        line: line.to_string(),
        transition: Transition::Unchanged,
    };

    let Some(checkbox) = match_checkbox(body) else {
        return unchanged();
    };

    let (rewritten, transition) = match action {
        CompletionAction::Undo if checkbox.done => {
            (set_marker(body, &checkbox, false), Transition::Reopened)
        }
        CompletionAction::Undo => return unchanged(),
        CompletionAction::Complete => match next_start(&checkbox, clock) {
            Some(next) => (roll_forward(body, &checkbox, next), Transition::Advanced(next)),
            None if checkbox.done => return unchanged(),
            None => (set_marker(body, &checkbox, true), Transition::MarkedDone),
        },
    };

    LineUpdate {
        line: format!("{}{}", rewritten, eol),
        transition,
    }
}

fn next_start(checkbox: &Checkbox<'_>, clock: &dyn Clock) -> Option<NaiveDate> {
    let raw = Decoration::Recur.value(checkbox.text)?;
    let Some(rule) = RecurrenceRule::parse(&raw) else {
        log::debug!("Ignoring malformed recurrence '{}'", raw);
        return None;
    };

    let today = clock.today();
    let anchor = Decoration::Start
        .find(checkbox.text)
        .and_then(|m| resolve_expr(m.value, today))
        .unwrap_or(today);
    let reference = if rule.is_fixed_anchor() {
        clock.today_utc()
    } else {
        today
    };
    rule.next_occurrence(anchor, reference)
}

/// Reopens the checkbox and replaces the first `@start(...)`, or appends one.
fn roll_forward(body: &str, checkbox: &Checkbox<'_>, next: NaiveDate) -> String {
    // The marker swap is one byte for one byte, so `text_start` stays valid.
    let reopened = set_marker(body, checkbox, false);
    let rendered = Decoration::Start.render(&format_ymd(next));

    match Decoration::Start.find(&reopened[checkbox.text_start..]) {
        Some(m) => {
            let start = checkbox.text_start + m.span.start;
            let end = checkbox.text_start + m.span.end;
            format!("{}{}{}", &reopened[..start], rendered, &reopened[end..])
        }
        None => format!("{} {}", reopened.trim_end(), rendered),
    }
}

/// Applies `action` to the line at `line_index`, leaving every other line as is.
pub fn apply_completion_at(
    document: &str,
    line_index: usize,
    action: CompletionAction,
    clock: &dyn Clock,
) -> CompletionOutcome {
    let mut lines: Vec<&str> = document.split('\n').collect();
    let Some(line) = lines.get(line_index) else {
        return CompletionOutcome::untouched(document);
    };

    let update = transition_line(line, action, clock);
    lines[line_index] = &update.line;

    CompletionOutcome {
        document: lines.join("\n"),
        line_index: Some(line_index),
        transition: update.transition,
    }
}

/// Finds the line a completion action should target: the first task whose text equals
/// `target`, else the first whose text contains it. Only tasks the action can apply to
/// are considered. For `Complete`, open tasks are tried before done recurring ones, so a
/// finished copy never shadows the open task of the same text.
pub fn find_target(document: &str, target: &str, action: CompletionAction) -> Option<usize> {
    let wanted = target.trim();
    let tasks = parse_tasks(document, &PriorityTags::default());
    let candidates: Vec<&Task> = match action {
        CompletionAction::Complete => tasks
            .iter()
            .filter(|t| !t.done)
            .chain(tasks.iter().filter(|t| t.done && t.is_recurring()))
            .collect(),
        CompletionAction::Undo => tasks.iter().filter(|t| t.done).collect(),
    };

    candidates
        .iter()
        .find(|t| t.text == wanted)
        .or_else(|| {
            candidates
                .iter()
                .find(|t| !wanted.is_empty() && t.text.contains(wanted))
        })
        .map(|t| t.line_index)
}

/// Text of the task on `line_index`, if that line is a task.
pub fn task_text_at(document: &str, line_index: usize) -> Option<&str> {
    document
        .split('\n')
        .nth(line_index)
        .and_then(match_checkbox)
        .map(|cb| cb.text.trim())
}

pub fn complete_in_document(
    document: &str,
    target: &str,
    action: CompletionAction,
    clock: &dyn Clock,
) -> CompletionOutcome {
    match find_target(document, target, action) {
        Some(index) => apply_completion_at(document, index, action, clock),
        None => CompletionOutcome::untouched(document),
    }
}

/// Rewrites `document` with `action` applied to the task matching `target`.
pub fn apply_completion(
    document: &str,
    target: &str,
    action: CompletionAction,
    clock: &dyn Clock,
) -> String {
    complete_in_document(document, target, action, clock).document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn complete(line: &str, today: NaiveDate) -> LineUpdate {
        transition_line(line, CompletionAction::Complete, &FixedClock(today))
    }

    #[derive(Debug)]
    struct SplitClock {
        local: NaiveDate,
        utc: NaiveDate,
    }

    impl Clock for SplitClock {
        fn today(&self) -> NaiveDate {
            self.local
        }
        fn today_utc(&self) -> NaiveDate {
            self.utc
        }
    }

    #[test]
    fn test_pay_rent_clamps_to_february() {
        let update = complete(
            "- [ ] Pay rent #p2 @recur(1m) @start(2024-01-31)",
            ymd(2024, 2, 1),
        );
        assert_eq!(update.line, "- [ ] Pay rent #p2 @recur(1m) @start(2024-02-29)");
        assert_eq!(update.transition, Transition::Advanced(ymd(2024, 2, 29)));

        let update = complete(
            "- [ ] Pay rent #p2 @recur(1m) @start(2023-01-31)",
            ymd(2023, 2, 1),
        );
        assert_eq!(update.line, "- [ ] Pay rent #p2 @recur(1m) @start(2023-02-28)");
    }

    #[test]
    fn test_non_recurring_marks_done() {
        let update = complete("  * [ ] Email landlord @due(2024-02-01)", ymd(2024, 1, 1));
        assert_eq!(update.line, "  * [x] Email landlord @due(2024-02-01)");
        assert_eq!(update.transition, Transition::MarkedDone);
    }

    #[test]
    fn test_complete_already_done_is_noop() {
        let update = complete("- [X] Old thing", ymd(2024, 1, 1));
        assert_eq!(update.line, "- [X] Old thing");
        assert!(!update.transition.is_change());
    }

    #[test]
    fn test_undo_only_touches_marker() {
        let clock = FixedClock(ymd(2024, 1, 1));
        let update = transition_line(
            "- [x] Water plants @recur(3d) @start(2024-01-01)",
            CompletionAction::Undo,
            &clock,
        );
        assert_eq!(update.line, "- [ ] Water plants @recur(3d) @start(2024-01-01)");
        assert_eq!(update.transition, Transition::Reopened);

        let open = transition_line("- [ ] Already open", CompletionAction::Undo, &clock);
        assert_eq!(open.transition, Transition::Unchanged);
    }

    #[test]
    fn test_recurring_done_line_is_reopened() {
        let update = complete("- [x] Stretch @recur(mon,wed,fri) @start(2024-05-15)", ymd(2024, 5, 15));
        assert_eq!(update.line, "- [ ] Stretch @recur(mon,wed,fri) @start(2024-05-17)");
    }

    #[test]
    fn test_start_appended_from_today() {
        let update = complete("- [ ] Backup laptop @recur(2w)   ", ymd(2024, 3, 1));
        assert_eq!(update.line, "- [ ] Backup laptop @recur(2w) @start(2024-03-15)");
    }

    #[test]
    fn test_only_first_start_replaced_and_rest_verbatim() {
        let update = complete(
            "- [ ] Review @START(today+2d) @recur(monthly,day=last) #p1 @start(2020-01-01) trailing",
            ymd(2024, 2, 10),
        );
        // anchor resolves to 2024-02-12, next month's last day
        assert_eq!(
            update.line,
            "- [ ] Review @start(2024-03-31) @recur(monthly,day=last) #p1 @start(2020-01-01) trailing"
        );
    }

    #[test]
    fn test_malformed_recurrence_marks_done() {
        let update = complete("- [ ] Weird @recur(every so often)", ymd(2024, 1, 1));
        assert_eq!(update.line, "- [x] Weird @recur(every so often)");
    }

    #[test]
    fn test_fixed_anchor_uses_utc_day() {
        let clock = SplitClock {
            local: ymd(2024, 3, 3),
            utc: ymd(2024, 3, 4),
        };
        let update = transition_line(
            "- [ ] Team notes @recur(from:2024-01-01,every:7d)",
            CompletionAction::Complete,
            &clock,
        );
        assert_eq!(update.transition, Transition::Advanced(ymd(2024, 3, 11)));
    }

    #[test]
    fn test_crlf_is_preserved() {
        let update = complete("- [ ] Windows line @recur(1d)\r", ymd(2024, 1, 1));
        assert_eq!(update.line, "- [ ] Windows line @recur(1d) @start(2024-01-02)\r");
    }

    #[test]
    fn test_non_task_line_unchanged() {
        let update = complete("Just a note @recur(1d)", ymd(2024, 1, 1));
        assert_eq!(update.line, "Just a note @recur(1d)");
        assert_eq!(update.transition, Transition::Unchanged);
    }

    #[test]
    fn test_document_targets_single_line() {
        let doc = "# Chores #individualtasks\n- [ ] Laundry\n- [ ] Dishes @recur(1d)\n- [ ] Laundry\n";
        let clock = FixedClock(ymd(2024, 6, 1));
        let outcome = complete_in_document(doc, "Laundry", CompletionAction::Complete, &clock);
        assert_eq!(outcome.line_index, Some(1));
        assert_eq!(
            outcome.document,
            "# Chores #individualtasks\n- [x] Laundry\n- [ ] Dishes @recur(1d)\n- [ ] Laundry\n"
        );

        let rolled = apply_completion(doc, "Dishes", CompletionAction::Complete, &clock);
        assert!(rolled.contains("- [ ] Dishes @recur(1d) @start(2024-06-02)\n"));
    }

    #[test]
    fn test_document_exact_match_preferred_over_substring() {
        let doc = "- [ ] Call mom and dad\n- [ ] Call mom";
        assert_eq!(find_target(doc, "Call mom", CompletionAction::Complete), Some(1));
        assert_eq!(find_target(doc, "dad", CompletionAction::Complete), Some(0));
        assert_eq!(find_target(doc, "dad", CompletionAction::Undo), None);
    }

    #[test]
    fn test_open_task_preferred_over_done_recurring_copy() {
        let doc = "#projects\n\
                   - [x] Stretch @recur(1d) @start(2024-01-01)\n\
                   - [ ] Stretch @recur(1d) @start(2024-01-01)";
        let target = "Stretch @recur(1d) @start(2024-01-01)";
        assert_eq!(find_target(doc, target, CompletionAction::Complete), Some(2));
        assert_eq!(find_target(doc, "Stretch", CompletionAction::Complete), Some(2));
        assert_eq!(find_target(doc, target, CompletionAction::Undo), Some(1));

        let out = apply_completion(doc, target, CompletionAction::Complete, &FixedClock(ymd(2024, 1, 1)));
        assert_eq!(
            out,
            "#projects\n\
             - [x] Stretch @recur(1d) @start(2024-01-01)\n\
             - [ ] Stretch @recur(1d) @start(2024-01-02)"
        );

        // With no open copy left, the done recurring one is still reachable.
        let only_done = "- [x] Stretch @recur(1d)";
        assert_eq!(find_target(only_done, "Stretch", CompletionAction::Complete), Some(0));
    }

    #[test]
    fn test_unclosed_start_keeps_neighbouring_decoration() {
        let update = complete(
            "- [ ] Renew @recur(1y) @start(2024-01-01 @due(2024-02-01)",
            ymd(2024, 1, 1),
        );
        // The broken @start is not a decoration: the anchor is today and a new one is appended.
        assert_eq!(
            update.line,
            "- [ ] Renew @recur(1y) @start(2024-01-01 @due(2024-02-01) @start(2025-01-01)"
        );
    }

    #[test]
    fn test_task_text_at() {
        let doc = "intro\n- [ ]  Water plants \r\n- [x] Done";
        assert_eq!(task_text_at(doc, 0), None);
        assert_eq!(task_text_at(doc, 1), Some("Water plants"));
        assert_eq!(task_text_at(doc, 2), Some("Done"));
        assert_eq!(task_text_at(doc, 3), None);
    }

    #[test]
    fn test_document_without_match_is_untouched() {
        let doc = "- [ ] Something";
        let clock = FixedClock(ymd(2024, 1, 1));
        let outcome = complete_in_document(doc, "Nothing", CompletionAction::Complete, &clock);
        assert_eq!(outcome.document, doc);
        assert_eq!(outcome.line_index, None);

        let outcome = apply_completion_at(doc, 9, CompletionAction::Complete, &clock);
        assert_eq!(outcome.transition, Transition::Unchanged);
    }
}
