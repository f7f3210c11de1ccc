//! Compensating actions for partially completed deploys.
//!
//! Each remote mutation that succeeds pushes an action that reverses it.
//! When a later step fails the stack is unwound newest-first; a failing
//! action is logged and recorded and the rest still run.

use std::fmt;

type UndoFn<'a> = Box<dyn FnOnce() -> anyhow::Result<()> + 'a>;

/// A reversal for one completed step.
pub struct CompensatingAction<'a> {
    description: String,
    action: UndoFn<'a>,
}

impl fmt::Debug for CompensatingAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensatingAction")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A compensating action that failed during unwind.
#[derive(Debug)]
pub struct UndoFailure {
    pub description: String,
    pub error: anyhow::Error,
}

impl fmt::Display for UndoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.description, self.error)
    }
}

/// LIFO stack of compensating actions.
#[derive(Debug, Default)]
pub struct UndoStack<'a> {
    actions: Vec<CompensatingAction<'a>>,
}

impl<'a> UndoStack<'a> {
    pub fn new() -> Self {
        UndoStack {
            actions: Vec::new(),
        }
    }

    /// Register the reversal of a step that just succeeded.
    pub fn push<F>(&mut self, description: impl Into<String>, action: F)
    where
        F: FnOnce() -> anyhow::Result<()> + 'a,
    {
        let description = description.into();
        tracing::debug!(action = %description, "registered undo");
        self.actions.push(CompensatingAction {
            description,
            action: Box::new(action),
        });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Descriptions of the pending actions, oldest first.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.description.as_str())
    }

    /// Run every action newest-first, consuming the stack.
    ///
    /// Returns the actions that failed, in the order they ran.
    pub fn unwind(self) -> Vec<UndoFailure> {
        let mut failures = Vec::new();
        let mut actions = self.actions;

        while let Some(CompensatingAction {
            description,
            action,
        }) = actions.pop()
        {
            tracing::debug!(action = %description, "undoing");
            if let Err(error) = action() {
                tracing::warn!("Failed to {}: {:#}", description, error);
                failures.push(UndoFailure { description, error });
            }
        }

        failures
    }

    /// Drop every action without running it.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
