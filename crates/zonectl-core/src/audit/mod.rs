//! Record auditor framework
//!
//! An auditor maps a type token (or `"*"` for every record) to a list of
//! predicates. Auditing returns one line per failing (record, predicate)
//! pair; an empty list means the provider accepts every record.
//!
//! ```rust,ignore
//! use zonectl_core::audit::{RecordAuditor, rejectif};
//!
//! let mut a = RecordAuditor::new();
//! a.add("TXT", rejectif::txt_has_backticks);
//! a.add("TXT", rejectif::txt_longer_than(255));
//! a.add("*", rejectif::label_not_apex);
//! let violations = a.audit(&records);
//! ```

pub mod rejectif;

use crate::models::RecordConfig;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a predicate rejected a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Rejection(String);

impl Rejection {
    /// Create a rejection
    pub fn new(why: impl Into<String>) -> Self {
        Self(why.into())
    }
}

/// A boxed auditor predicate
pub type Check = Box<dyn Fn(&RecordConfig) -> std::result::Result<(), Rejection> + Send + Sync>;

/// Type-keyed collection of predicates
#[derive(Default)]
pub struct RecordAuditor {
    checks: BTreeMap<String, Vec<Check>>,
}

impl RecordAuditor {
    /// An auditor that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` for records of type `rtype` (`"*"` for all records)
    pub fn add<F>(&mut self, rtype: &str, check: F) -> &mut Self
    where
        F: Fn(&RecordConfig) -> std::result::Result<(), Rejection> + Send + Sync + 'static,
    {
        self.checks
            .entry(rtype.to_string())
            .or_default()
            .push(Box::new(check));
        self
    }

    /// Number of registered predicates
    pub fn len(&self) -> usize {
        self.checks.values().map(Vec::len).sum()
    }

    /// Whether no predicate is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every applicable predicate over `records`
    pub fn audit(&self, records: &[RecordConfig]) -> Vec<String> {
        let mut violations = Vec::new();
        for rc in records {
            let generic = self.checks.get("*").into_iter().flatten();
            let typed = self.checks.get(rc.rtype().as_str()).into_iter().flatten();
            for check in generic.chain(typed) {
                if let Err(rejection) = check(rc) {
                    violations.push(format!("{} {}: {rejection}", rc.rtype(), rc.name_fqdn));
                }
            }
        }
        violations
    }
}

impl std::fmt::Debug for RecordAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .checks
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("RecordAuditor").field("checks", &counts).finish()
    }
}
