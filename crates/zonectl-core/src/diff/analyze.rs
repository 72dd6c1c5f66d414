//! Per-bucket reconciliation shared by every grouping
//!
//! Both sides of one `(name, type)` bucket are matched in three passes:
//! exact (TTL included), same data with a different TTL, then positional
//! pairing of what is left after a deterministic sort.

use crate::models::RecordConfig;

/// Outcome of reconciling one bucket
#[derive(Debug, Default, Clone)]
pub(crate) struct BucketDiff {
    /// Observed records already matching a desired record
    pub unchanged: Vec<RecordConfig>,
    /// (observed, desired) pairs
    pub modify: Vec<(RecordConfig, RecordConfig)>,
    /// Desired records with no counterpart
    pub create: Vec<RecordConfig>,
    /// Observed records to remove
    pub delete: Vec<RecordConfig>,
    /// Observed records left alone because the zone keeps unknown records
    pub kept: Vec<RecordConfig>,
}

impl BucketDiff {
    pub fn has_mutations(&self) -> bool {
        !(self.modify.is_empty() && self.create.is_empty() && self.delete.is_empty())
    }
}

/// Reconciliation parameters that do not vary per bucket
pub(crate) struct Rules<'a> {
    pub ensure_absent: &'a [RecordConfig],
    pub keep_unknown: bool,
    pub extras: &'a [String],
}

fn sort_key(rc: &RecordConfig, extras: &[String]) -> (String, u32) {
    (rc.comparable(extras), rc.ttl)
}

/// Reconcile one bucket; both inputs share a [`RecordKey`](crate::models::RecordKey)
pub(crate) fn analyze_bucket(
    mut observed: Vec<RecordConfig>,
    mut desired: Vec<RecordConfig>,
    rules: &Rules<'_>,
) -> BucketDiff {
    let extras = rules.extras;
    let mut out = BucketDiff::default();

    for rc in observed.iter().chain(desired.iter()) {
        assert!(
            !rc.name_fqdn.ends_with('.'),
            "record name {:?} reached the diff engine with a trailing dot",
            rc.name_fqdn
        );
    }

    observed.sort_by_cached_key(|rc| sort_key(rc, extras));
    desired.sort_by_cached_key(|rc| sort_key(rc, extras));

    // ensure-absent wins over everything else
    let mut forced = Vec::new();
    observed.retain(|o| {
        let absent = rules.ensure_absent.iter().any(|a| {
            a.key() == o.key() && a.comparable(&[]) == o.comparable(&[])
        });
        if absent {
            forced.push(o.clone());
        }
        !absent
    });

    // exact matches
    let mut rest_observed = Vec::with_capacity(observed.len());
    for o in observed {
        let want = o.comparable_with_ttl(extras);
        match desired
            .iter()
            .position(|d| d.comparable_with_ttl(extras) == want)
        {
            Some(i) => {
                desired.remove(i);
                out.unchanged.push(o);
            }
            None => rest_observed.push(o),
        }
    }

    // same data, different TTL
    let mut unpaired_observed = Vec::with_capacity(rest_observed.len());
    for o in rest_observed {
        let want = o.comparable(extras);
        match desired.iter().position(|d| d.comparable(extras) == want) {
            Some(i) => {
                let d = desired.remove(i);
                out.modify.push((o, d));
            }
            None => unpaired_observed.push(o),
        }
    }

    // positional pairing of the remainder
    let mut desired_rest = desired.into_iter();
    for o in unpaired_observed {
        match desired_rest.next() {
            Some(d) => out.modify.push((o, d)),
            None if rules.keep_unknown => out.kept.push(o),
            None => out.delete.push(o),
        }
    }
    out.create.extend(desired_rest);

    // forced deletes go first within the bucket
    forced.append(&mut out.delete);
    out.delete = forced;
    out
}
