use crate::error::Result;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use tracing::{debug, error, warn};

type Compensation = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Ordered list of undo actions for the steps a use case has completed.
///
/// On failure the actions run in reverse order of registration. A failed
/// undo is logged and never replaces the error that triggered the rollback.
/// Dropping a saga that still holds actions runs nothing.
pub struct Saga {
    name: &'static str,
    steps: Vec<(&'static str, Compensation)>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Register the undo action for a step that just completed.
    pub fn push<F, Fut>(&mut self, label: &'static str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        debug!(saga = self.name, step = label, "Compensation registered");
        self.steps.push((label, Box::new(move || undo().boxed())));
    }

    pub fn pending(&self) -> usize {
        self.steps.len()
    }

    /// Pass `result` through, rolling back first if it is an error.
    pub async fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(saga = self.name, error = %e, "Step failed, rolling back");
                let failed = self.compensate().await;
                if failed > 0 {
                    error!(
                        saga = self.name,
                        failed,
                        "Rollback incomplete; manual cleanup may be required"
                    );
                }
                Err(e)
            }
        }
    }

    /// Run every pending undo action, most recent first. Returns the number that failed.
    pub async fn compensate(&mut self) -> usize {
        let mut failed = 0;
        while let Some((label, undo)) = self.steps.pop() {
            match undo().await {
                Ok(()) => debug!(saga = self.name, step = label, "Compensation applied"),
                Err(e) => {
                    failed += 1;
                    error!(saga = self.name, step = label, error = %e, "Compensation failed");
                }
            }
        }
        failed
    }

    /// Discard the undo actions; the saga succeeded.
    pub fn commit(mut self) {
        self.steps.clear();
    }
}

impl Drop for Saga {
    fn drop(&mut self) {
        if !self.steps.is_empty() {
            warn!(
                saga = self.name,
                pending = self.steps.len(),
                "Saga dropped before completion; completed steps were not undone"
            );
        }
    }
}
