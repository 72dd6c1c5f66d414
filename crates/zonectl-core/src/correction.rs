//! Corrections: named units of work
//!
//! A correction is a human-readable message plus an optional action. A
//! correction without an action is a pure report line. Actions are lazy
//! futures: nothing touches the provider until the pipeline awaits them.

use crate::error::Result;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// The deferred side effect of a correction
pub type CorrectionAction = BoxFuture<'static, Result<()>>;

/// A named piece of work produced by a provider from a diff
pub struct Correction {
    /// What will happen, one line per affected record
    pub msg: String,
    action: Option<CorrectionAction>,
}

impl Correction {
    /// A correction that performs `action` when executed
    pub fn new<F>(msg: impl Into<String>, action: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            msg: msg.into(),
            action: Some(Box::pin(action)),
        }
    }

    /// A report-only line
    pub fn report(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            action: None,
        }
    }

    /// Whether this correction has no action
    pub fn is_report(&self) -> bool {
        self.action.is_none()
    }

    /// Detach the action, leaving a report
    pub fn take_action(&mut self) -> Option<CorrectionAction> {
        self.action.take()
    }

    /// Run the action, if any
    pub async fn execute(mut self) -> Result<()> {
        match self.action.take() {
            Some(action) => action.await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correction")
            .field("msg", &self.msg)
            .field("report", &self.is_report())
            .finish()
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}
