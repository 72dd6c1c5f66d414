//! Ignore rules compiled to glob matchers
//!
//! Compiled once per zone; both the validator (desired side) and the
//! observed-record filter use the same matcher.

use crate::error::{Error, Result};
use crate::models::{DomainConfig, RecordConfig};
use glob::Pattern;
use tracing::debug;

struct NameRule {
    pattern: Pattern,
    types: Vec<String>,
}

struct TargetRule {
    pattern: Pattern,
    rtype: String,
}

/// Compiled `ignored_names` / `ignored_targets` of one zone
#[derive(Default)]
pub struct IgnoreMatcher {
    names: Vec<NameRule>,
    targets: Vec<TargetRule>,
}

impl IgnoreMatcher {
    /// Compile the zone's ignore rules
    pub fn compile(dc: &DomainConfig) -> Result<Self> {
        let compile = |raw: &str| {
            Pattern::new(&raw.to_ascii_lowercase()).map_err(|e| {
                Error::config(format!("domain {}: bad ignore pattern {raw:?}: {e}", dc.name))
            })
        };
        let names = dc
            .ignored_names
            .iter()
            .map(|rule| {
                Ok(NameRule {
                    pattern: compile(&rule.pattern)?,
                    types: rule.type_list(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let targets = dc
            .ignored_targets
            .iter()
            .map(|rule| {
                Ok(TargetRule {
                    pattern: compile(&rule.pattern)?,
                    rtype: rule.rtype.to_ascii_uppercase(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { names, targets })
    }

    /// Whether no rule is configured
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.targets.is_empty()
    }

    /// Whether `rc` is covered by any rule
    pub fn matches(&self, rc: &RecordConfig) -> bool {
        let rtype = rc.rtype().as_str();
        let label = rc.name.to_ascii_lowercase();
        let name_hit = self.names.iter().any(|rule| {
            (rule.types.is_empty() || rule.types.iter().any(|t| t == rtype))
                && rule.pattern.matches(&label)
        });
        if name_hit {
            return true;
        }

        let target = rc.target().to_ascii_lowercase();
        let bare = target.trim_end_matches('.');
        self.targets.iter().any(|rule| {
            (rule.rtype.is_empty() || rule.rtype == rtype)
                && (rule.pattern.matches(&target) || rule.pattern.matches(bare))
        })
    }

    /// Drop records covered by a rule; returns the survivors
    pub fn filter(&self, records: Vec<RecordConfig>) -> Vec<RecordConfig> {
        if self.is_empty() {
            return records;
        }
        let before = records.len();
        let kept: Vec<RecordConfig> = records.into_iter().filter(|rc| !self.matches(rc)).collect();
        if kept.len() != before {
            debug!(ignored = before - kept.len(), "filtered ignored records");
        }
        kept
    }
}
