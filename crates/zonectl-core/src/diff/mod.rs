//! Differ
//!
//! Compares the desired and observed record lists of one zone and reports
//! what has to change. Four groupings are offered because providers expose
//! different update primitives:
//! - [`Differ::by_record`]: one change per individual record
//! - [`Differ::by_record_set`]: one change per `(name, type)`
//! - [`Differ::by_label`]: one change per name
//! - [`Differ::by_zone`]: a single change carrying the whole zone
//!
//! All four reconcile records the same way (see `analyze`), so the record
//! tally of a [`ChangeList`] is independent of the grouping. Output order is
//! deterministic: REPORT first, then every DELETE, CHANGE and CREATE, each
//! block sorted by record key.

mod analyze;

use crate::correction::{Correction, CorrectionAction};
use crate::models::{DomainConfig, RecordConfig, RecordKey};
use analyze::{BucketDiff, Rules, analyze_bucket};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What a change does
///
/// The declaration order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    /// Informational only; nothing is mutated
    Report,
    Delete,
    Change,
    Create,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeType::Report => "REPORT",
            ChangeType::Delete => "DELETE",
            ChangeType::Change => "CHANGE",
            ChangeType::Create => "CREATE",
        })
    }
}

/// One unit of work produced by a grouping
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub change_type: ChangeType,
    /// Name the change applies to; empty for whole-zone changes
    pub name_fqdn: String,
    /// Record type the change applies to; `None` for label and zone changes
    pub rtype: Option<String>,
    /// Observed records affected (for set-based changes: the whole set)
    pub old: Vec<RecordConfig>,
    /// Records after the change (for set-based changes: the whole set)
    pub new: Vec<RecordConfig>,
    /// Human-readable lines, one per record-level effect
    pub msgs: Vec<String>,
}

impl Change {
    /// All message lines joined
    pub fn msg(&self) -> String {
        self.msgs.join("\n")
    }

    /// Key of the change, when it targets a single record set
    pub fn key(&self) -> Option<RecordKey> {
        self.rtype.as_ref().map(|rtype| RecordKey {
            name_fqdn: self.name_fqdn.clone(),
            rtype: rtype.clone(),
        })
    }
}

/// Record-level counts, identical across groupings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub unchanged: usize,
    pub creates: usize,
    pub modifies: usize,
    pub deletes: usize,
    /// Unknown observed records left in place
    pub kept: usize,
}

/// Ordered result of a diff
#[derive(Debug, Clone, Default)]
pub struct ChangeList {
    pub changes: Vec<Change>,
    pub tally: Tally,
}

impl ChangeList {
    /// Number of record-level mutations (REPORT entries excluded)
    pub fn actual_change_count(&self) -> usize {
        self.tally.creates + self.tally.modifies + self.tally.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes that mutate something
    pub fn mutations(&self) -> impl Iterator<Item = &Change> {
        self.changes
            .iter()
            .filter(|c| c.change_type != ChangeType::Report)
    }

    /// Turn the changes into corrections
    ///
    /// REPORT changes become message-only corrections; every other change
    /// gets the action built by `action`.
    pub fn into_corrections<F>(self, mut action: F) -> Vec<Correction>
    where
        F: FnMut(&Change) -> CorrectionAction,
    {
        self.changes
            .into_iter()
            .map(|change| match change.change_type {
                ChangeType::Report => Correction::report(change.msg()),
                _ => {
                    let fut = action(&change);
                    Correction::new(change.msg(), fut)
                }
            })
            .collect()
    }
}

/// Zone-wide diff parameters
///
/// Desired records, ensure-absent records and the keep-unknown flag come
/// from the zone; `extras` lists metadata keys that take part in record
/// comparison (provider-specific, e.g. a proxy flag).
pub struct Differ<'a> {
    dc: &'a DomainConfig,
    extras: Vec<String>,
}

impl<'a> Differ<'a> {
    pub fn new(dc: &'a DomainConfig, extras: Vec<String>) -> Self {
        Self { dc, extras }
    }

    /// One change per record
    pub fn by_record(&self, observed: &[RecordConfig]) -> ChangeList {
        let mut out = Collector::default();
        for (key, diff) in self.buckets(observed) {
            out.tally(&diff);
            let name = key.name_fqdn.clone();
            let rtype = Some(key.rtype.clone());
            for rc in &diff.kept {
                out.push(change(ChangeType::Report, &name, rtype.clone(), vec![rc.clone()], vec![], vec![msg_kept(rc, &self.extras)]));
            }
            for rc in diff.delete {
                let m = msg_delete(&rc, &self.extras);
                out.push(change(ChangeType::Delete, &name, rtype.clone(), vec![rc], vec![], vec![m]));
            }
            for (old, new) in diff.modify {
                let m = msg_modify(&old, &new, &self.extras);
                out.push(change(ChangeType::Change, &name, rtype.clone(), vec![old], vec![new], vec![m]));
            }
            for rc in diff.create {
                let m = msg_create(&rc, &self.extras);
                out.push(change(ChangeType::Create, &name, rtype.clone(), vec![], vec![rc], vec![m]));
            }
        }
        out.finish()
    }

    /// One change per `(name, type)` set
    ///
    /// `old` is the full observed set and `new` the full resulting set
    /// (desired plus kept unknown records).
    pub fn by_record_set(&self, observed: &[RecordConfig]) -> ChangeList {
        let mut out = Collector::default();
        for (key, diff) in self.buckets(observed) {
            out.tally(&diff);
            self.push_set(&mut out, &key.name_fqdn, Some(key.rtype.clone()), vec![diff]);
        }
        out.finish()
    }

    /// One change per name, covering every type at that name
    pub fn by_label(&self, observed: &[RecordConfig]) -> ChangeList {
        let mut out = Collector::default();
        let mut labels: BTreeMap<String, Vec<BucketDiff>> = BTreeMap::new();
        for (key, diff) in self.buckets(observed) {
            out.tally(&diff);
            labels.entry(key.name_fqdn).or_default().push(diff);
        }
        for (name, diffs) in labels {
            self.push_set(&mut out, &name, None, diffs);
        }
        out.finish()
    }

    /// A single CHANGE carrying the complete zone, if anything differs
    pub fn by_zone(&self, observed: &[RecordConfig]) -> ChangeList {
        let mut out = Collector::default();
        let mut diffs = Vec::new();
        for (_, diff) in self.buckets(observed) {
            out.tally(&diff);
            diffs.push(diff);
        }
        if !diffs.iter().any(BucketDiff::has_mutations) {
            // kept records still get surfaced
            let msgs: Vec<String> = diffs
                .iter()
                .flat_map(|d| d.kept.iter().map(|rc| msg_kept(rc, &self.extras)))
                .collect();
            if !msgs.is_empty() {
                out.push(change(ChangeType::Report, "", None, vec![], vec![], msgs));
            }
            return out.finish();
        }

        let mut old = Vec::new();
        let mut new = Vec::new();
        let mut msgs = Vec::new();
        for diff in diffs {
            self.collect_set(diff, &mut old, &mut new, &mut msgs);
        }
        out.push(change(ChangeType::Change, "", None, old, new, msgs));
        out.finish()
    }

    fn rules(&self) -> Rules<'_> {
        Rules {
            ensure_absent: &self.dc.ensure_absent,
            keep_unknown: self.dc.keep_unknown,
            extras: &self.extras,
        }
    }

    fn buckets(&self, observed: &[RecordConfig]) -> BTreeMap<RecordKey, BucketDiff> {
        let mut sides: BTreeMap<RecordKey, (Vec<RecordConfig>, Vec<RecordConfig>)> = BTreeMap::new();
        for rc in observed {
            sides.entry(rc.key()).or_default().0.push(rc.clone());
        }
        for rc in &self.dc.records {
            sides.entry(rc.key()).or_default().1.push(rc.clone());
        }
        let rules = self.rules();
        sides
            .into_iter()
            .map(|(key, (obs, des))| (key, analyze_bucket(obs, des, &rules)))
            .collect()
    }

    fn push_set(&self, out: &mut Collector, name: &str, rtype: Option<String>, diffs: Vec<BucketDiff>) {
        if !diffs.iter().any(BucketDiff::has_mutations) {
            for diff in &diffs {
                for rc in &diff.kept {
                    out.push(change(ChangeType::Report, name, rtype.clone(), vec![rc.clone()], vec![], vec![msg_kept(rc, &self.extras)]));
                }
            }
            return;
        }

        let mut old = Vec::new();
        let mut new = Vec::new();
        let mut msgs = Vec::new();
        for diff in diffs {
            self.collect_set(diff, &mut old, &mut new, &mut msgs);
        }
        let change_type = match (old.is_empty(), new.is_empty()) {
            (true, _) => ChangeType::Create,
            (false, true) => ChangeType::Delete,
            (false, false) => ChangeType::Change,
        };
        out.push(change(change_type, name, rtype, old, new, msgs));
    }

    /// Fold one bucket into set-level old/new lists
    fn collect_set(
        &self,
        diff: BucketDiff,
        old: &mut Vec<RecordConfig>,
        new: &mut Vec<RecordConfig>,
        msgs: &mut Vec<String>,
    ) {
        let extras = &self.extras;
        for rc in diff.unchanged {
            old.push(rc.clone());
            new.push(rc);
        }
        for rc in diff.kept {
            msgs.push(msg_kept(&rc, extras));
            old.push(rc.clone());
            new.push(rc);
        }
        for rc in diff.delete {
            msgs.push(msg_delete(&rc, extras));
            old.push(rc);
        }
        for (o, n) in diff.modify {
            msgs.push(msg_modify(&o, &n, extras));
            old.push(o);
            new.push(n);
        }
        for rc in diff.create {
            msgs.push(msg_create(&rc, extras));
            new.push(rc);
        }
    }
}

#[derive(Default)]
struct Collector {
    changes: Vec<Change>,
    tally: Tally,
}

impl Collector {
    fn tally(&mut self, diff: &BucketDiff) {
        self.tally.unchanged += diff.unchanged.len();
        self.tally.creates += diff.create.len();
        self.tally.modifies += diff.modify.len();
        self.tally.deletes += diff.delete.len();
        self.tally.kept += diff.kept.len();
    }

    fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    fn finish(mut self) -> ChangeList {
        // stable: keeps key order inside each block
        self.changes.sort_by_key(|c| c.change_type);
        ChangeList {
            changes: self.changes,
            tally: self.tally,
        }
    }
}

fn change(
    change_type: ChangeType,
    name: &str,
    rtype: Option<String>,
    old: Vec<RecordConfig>,
    new: Vec<RecordConfig>,
    msgs: Vec<String>,
) -> Change {
    Change {
        change_type,
        name_fqdn: name.to_string(),
        rtype,
        old,
        new,
        msgs,
    }
}

fn describe(rc: &RecordConfig, extras: &[String]) -> String {
    format!("{} ttl={}", rc.comparable(extras), rc.ttl)
}

fn msg_create(rc: &RecordConfig, extras: &[String]) -> String {
    format!("+ CREATE {} {} → {}", rc.rtype(), rc.name, describe(rc, extras))
}

fn msg_modify(old: &RecordConfig, new: &RecordConfig, extras: &[String]) -> String {
    format!(
        "± MODIFY {} {} ({}) → {}",
        new.rtype(),
        new.name,
        describe(old, extras),
        describe(new, extras)
    )
}

fn msg_delete(rc: &RecordConfig, extras: &[String]) -> String {
    format!("- DELETE {} {} {}", rc.rtype(), rc.name, describe(rc, extras))
}

fn msg_kept(rc: &RecordConfig, extras: &[String]) -> String {
    format!("· KEEP {} {} {} (unmanaged)", rc.rtype(), rc.name, describe(rc, extras))
}
