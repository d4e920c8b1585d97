// File: src/controller.rs
//! Central logic controller for task operations.
//! Front ends (the CLI, an editor plugin host) delegate reads and completions here so
//! every write goes through the same source and the same re-entrancy bookkeeping.
use crate::clock::Clock;
use crate::config::Config;
use crate::model::transition::{
    CompletionAction, CompletionOutcome, Transition, apply_completion_at, complete_in_document,
    task_text_at,
};
use crate::storage::{DocumentHandle, DocumentSource};
use crate::store::{NextAction, NextActionStore};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Proof that the controller itself just wrote a document.
///
/// Hand it back through [`TaskController::on_document_changed`] (or drop it with
/// [`TaskController::release`]) once the write has been observed.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct WriteToken {
    handle: DocumentHandle,
}

impl WriteToken {
    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// The change came from one of our own writes and should not trigger a refresh.
    OwnWrite,
    External,
}

#[derive(Debug)]
pub struct CompletionReceipt {
    pub handle: DocumentHandle,
    pub line_index: Option<usize>,
    pub transition: Transition,
    /// Present only when the document was written.
    pub token: Option<WriteToken>,
}

/// Outstanding own writes, counted per document.
#[derive(Debug, Default)]
struct PendingWrites {
    counts: Mutex<HashMap<DocumentHandle, usize>>,
}

impl PendingWrites {
    fn issue(&self, handle: &DocumentHandle) -> Result<WriteToken> {
        let mut counts = self.lock()?;
        *counts.entry(handle.clone()).or_insert(0) += 1;
        Ok(WriteToken {
            handle: handle.clone(),
        })
    }

    /// Consumes one outstanding write for `handle`. Returns false if there was none.
    fn take(&self, handle: &DocumentHandle) -> Result<bool> {
        let mut counts = self.lock()?;
        match counts.get_mut(handle) {
            Some(n) if *n > 1 => {
                *n -= 1;
                Ok(true)
            }
            Some(_) => {
                counts.remove(handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<DocumentHandle, usize>>> {
        self.counts
            .lock()
            .map_err(|_| anyhow::anyhow!("Pending writes lock poisoned"))
    }
}

#[derive(Debug)]
pub struct TaskController {
    source: Arc<dyn DocumentSource>,
    config: Config,
    clock: Arc<dyn Clock>,
    pending: PendingWrites,
}

impl TaskController {
    pub fn new(source: Arc<dyn DocumentSource>, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            config,
            clock,
            pending: PendingWrites::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &dyn DocumentSource {
        self.source.as_ref()
    }

    /// Recomputes the next actions from the current contents of the source.
    pub fn next_actions(&self) -> Result<Vec<NextAction>> {
        NextActionStore::new(self.source.as_ref()).next_actions(&self.config, self.clock.today())
    }

    /// Resolves a user-supplied document name: an exact handle, else a unique
    /// case-insensitive match on the file name without extension.
    pub fn find_document(&self, name: &str) -> Result<DocumentHandle> {
        let wanted = DocumentHandle::new(name);
        let handles = self.source.list_documents()?;
        if handles.contains(&wanted) {
            return Ok(wanted);
        }

        let stem = wanted.name().to_lowercase();
        let mut matches = handles
            .into_iter()
            .filter(|h| h.name().to_lowercase() == stem);
        match (matches.next(), matches.next()) {
            (Some(handle), None) => Ok(handle),
            (Some(_), Some(_)) => Err(anyhow::anyhow!(
                "Document name '{}' is ambiguous, use its path",
                name
            )),
            (None, _) => Err(anyhow::anyhow!("No document named '{}'", name)),
        }
    }

    /// Applies `action` to the task of `handle` whose text matches `task_text`.
    ///
    /// The document is written back only if a line actually changed; the receipt then
    /// carries a token for the change notification that write will cause.
    pub fn complete(
        &self,
        handle: &DocumentHandle,
        task_text: &str,
        action: CompletionAction,
    ) -> Result<CompletionReceipt> {
        let original = self.source.read_text(handle)?;
        let outcome = complete_in_document(&original, task_text, action, self.clock.as_ref());
        self.commit(handle, task_text, outcome)
    }

    /// Applies `action` to the exact line a [`NextAction`] was listed from.
    ///
    /// Fails if the line no longer holds a task with `expected_text`, which happens when
    /// the document was edited after the list was computed.
    pub fn complete_at(
        &self,
        handle: &DocumentHandle,
        line_index: usize,
        expected_text: &str,
        action: CompletionAction,
    ) -> Result<CompletionReceipt> {
        let original = self.source.read_text(handle)?;
        let found = task_text_at(&original, line_index);
        if found != Some(expected_text.trim()) {
            return Err(anyhow::anyhow!(
                "{} line {} no longer holds '{}'",
                handle,
                line_index + 1,
                expected_text
            ));
        }
        let outcome = apply_completion_at(&original, line_index, action, self.clock.as_ref());
        self.commit(handle, expected_text, outcome)
    }

    /// Completes a listed action in place.
    pub fn complete_action(
        &self,
        next: &NextAction,
        action: CompletionAction,
    ) -> Result<CompletionReceipt> {
        self.complete_at(&next.document, next.line_index, &next.task_text, action)
    }

    fn commit(
        &self,
        handle: &DocumentHandle,
        task_text: &str,
        outcome: CompletionOutcome,
    ) -> Result<CompletionReceipt> {
        if !outcome.transition.is_change() {
            log::info!("{}: nothing to do for '{}'", handle, task_text);
            return Ok(CompletionReceipt {
                handle: handle.clone(),
                line_index: outcome.line_index,
                transition: outcome.transition,
                token: None,
            });
        }

        // Register before writing so a watcher firing mid-write is already suppressed.
        let token = self.pending.issue(handle)?;
        if let Err(e) = self.source.write_text(handle, &outcome.document) {
            if let Err(release_err) = self.pending.take(handle) {
                log::warn!("Could not drop pending write for {}: {:#}", handle, release_err);
            }
            return Err(e);
        }

        match outcome.transition {
            Transition::Advanced(next) => {
                log::info!("{}: '{}' advanced to {}", handle, task_text, next)
            }
            other => log::info!("{}: '{}' {:?}", handle, task_text, other),
        }

        Ok(CompletionReceipt {
            handle: handle.clone(),
            line_index: outcome.line_index,
            transition: outcome.transition,
            token: Some(token),
        })
    }

    /// Classifies a change notification for `handle`, consuming one of our own pending
    /// writes if there is one.
    pub fn on_document_changed(&self, handle: &DocumentHandle) -> Result<ChangeOrigin> {
        if self.pending.take(handle)? {
            log::debug!("Ignoring change to {} caused by our own write", handle);
            Ok(ChangeOrigin::OwnWrite)
        } else {
            Ok(ChangeOrigin::External)
        }
    }

    /// Gives up a token whose change notification will never arrive.
    pub fn release(&self, token: WriteToken) -> Result<()> {
        self.pending.take(&token.handle)?;
        Ok(())
    }
}
