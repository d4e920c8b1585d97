// File: src/store.rs
//! Aggregates the next actions of many documents into one ordered list.
use crate::config::Config;
use crate::model::eligibility::{SelectionMode, resolve_priority, select_eligible};
use crate::model::grammar::contains_hashtag;
use crate::model::parser::parse_tasks;
use crate::storage::{DocumentHandle, DocumentSource};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub handle: DocumentHandle,
    pub text: String,
}

impl Document {
    pub fn new(handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            handle: DocumentHandle::new(handle),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Tagged with the project tag: only its next task is shown.
    Project,
    /// Tagged with the individual-task tag: every actionable task is shown.
    IndividualTasks,
}

impl DocumentKind {
    /// The individual-task tag wins when a document carries both.
    pub fn classify(text: &str, config: &Config) -> Option<Self> {
        if contains_hashtag(text, &config.individual_task_tag) {
            Some(Self::IndividualTasks)
        } else if contains_hashtag(text, &config.project_tag) {
            Some(Self::Project)
        } else {
            None
        }
    }

    pub fn selection_mode(self) -> SelectionMode {
        match self {
            Self::Project => SelectionMode::SingleNext,
            Self::IndividualTasks => SelectionMode::AllEligible,
        }
    }

    pub fn is_aggregate(self) -> bool {
        self == Self::IndividualTasks
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextAction {
    pub document: DocumentHandle,
    pub task_text: String,
    pub line_index: usize,
    pub priority: usize,
    pub is_aggregate_view: bool,
}

/// Collects the actionable tasks of every tagged document, highest priority first.
///
/// Tasks of equal priority keep the order they were found in: documents in the given
/// order, tasks in line order. A `(document, task text)` pair is reported once.
pub fn compute_next_actions(
    documents: &[Document],
    config: &Config,
    today: NaiveDate,
) -> Vec<NextAction> {
    let tags = config.priority_tags();
    let mut seen: HashSet<(DocumentHandle, String)> = HashSet::new();
    let mut actions = Vec::new();

    for doc in documents {
        let Some(kind) = DocumentKind::classify(&doc.text, config) else {
            continue;
        };

        let tasks = parse_tasks(&doc.text, &tags);
        let eligible = select_eligible(&tasks, today, kind.selection_mode());
        if eligible.is_empty() {
            log::debug!("No eligible task in {}", doc.handle);
            continue;
        }

        let document_rank = tags.rank_in(&doc.text);
        for task in eligible {
            if !seen.insert((doc.handle.clone(), task.text.clone())) {
                continue;
            }
            let priority = resolve_priority(task, document_rank, &tags);
            log::debug!(
                "{}: '{}' -> {}",
                doc.handle,
                task.text,
                tags.label(priority).unwrap_or("?")
            );
            actions.push(NextAction {
                document: doc.handle.clone(),
                task_text: task.text.clone(),
                line_index: task.line_index,
                priority,
                is_aggregate_view: kind.is_aggregate(),
            });
        }
    }

    actions.sort_by_key(|a| a.priority);
    actions
}

/// Reads every document of a source and computes its next actions.
#[derive(Debug)]
pub struct NextActionStore<'a> {
    source: &'a dyn DocumentSource,
}

impl<'a> NextActionStore<'a> {
    pub fn new(source: &'a dyn DocumentSource) -> Self {
        Self { source }
    }

    /// Unreadable documents are skipped with a warning; a failing listing is an error.
    pub fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for handle in self.source.list_documents()? {
            match self.source.read_text(&handle) {
                Ok(text) => documents.push(Document { handle, text }),
                Err(e) => log::warn!("Skipping {}: {:#}", handle, e),
            }
        }
        Ok(documents)
    }

    pub fn next_actions(&self, config: &Config, today: NaiveDate) -> Result<Vec<NextAction>> {
        let documents = self.load_documents()?;
        Ok(compute_next_actions(&documents, config, today))
    }
}
