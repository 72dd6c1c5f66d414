//! Reusable auditor predicates
//!
//! Each predicate returns `Err(Rejection)` when the record has the named
//! property. Predicates ignore records of types they do not inspect, so they
//! are safe to register under `"*"`.

use super::Rejection;
use crate::models::{RecordConfig, RecordData};

type Outcome = std::result::Result<(), Rejection>;

fn reject_if(cond: bool, why: impl Into<String>) -> Outcome {
    if cond { Err(Rejection::new(why)) } else { Ok(()) }
}

fn txt(rc: &RecordConfig) -> Option<&str> {
    match &rc.data {
        RecordData::Txt { txt } => Some(txt),
        _ => None,
    }
}

/// TXT with an empty value
pub fn txt_is_empty(rc: &RecordConfig) -> Outcome {
    reject_if(txt(rc).is_some_and(str::is_empty), "txt is empty")
}

/// TXT longer than `max` octets
pub fn txt_longer_than(max: usize) -> impl Fn(&RecordConfig) -> Outcome + Send + Sync + 'static {
    move |rc| match txt(rc) {
        Some(t) if t.len() > max => Err(Rejection::new(format!(
            "txt is {} octets, longer than {max}",
            t.len()
        ))),
        _ => Ok(()),
    }
}

pub fn txt_has_unpaired_double_quotes(rc: &RecordConfig) -> Outcome {
    reject_if(
        txt(rc).is_some_and(|t| t.matches('"').count() % 2 == 1),
        "txt has unpaired double quotes",
    )
}

pub fn txt_has_trailing_space(rc: &RecordConfig) -> Outcome {
    reject_if(
        txt(rc).is_some_and(|t| t.ends_with(' ')),
        "txt has trailing space",
    )
}

pub fn txt_has_backslash(rc: &RecordConfig) -> Outcome {
    reject_if(txt(rc).is_some_and(|t| t.contains('\\')), "txt has backslash")
}

pub fn txt_has_double_quotes(rc: &RecordConfig) -> Outcome {
    reject_if(txt(rc).is_some_and(|t| t.contains('"')), "txt has double quotes")
}

pub fn txt_has_backticks(rc: &RecordConfig) -> Outcome {
    reject_if(txt(rc).is_some_and(|t| t.contains('`')), "txt has backticks")
}

/// MX whose target is `"."` (RFC 7505 null MX)
pub fn mx_null(rc: &RecordConfig) -> Outcome {
    let null = matches!(&rc.data, RecordData::Mx { mx, .. } if mx.is_null());
    reject_if(null, "mx has null target")
}

pub fn mx_priority_more_than_100(rc: &RecordConfig) -> Outcome {
    match &rc.data {
        RecordData::Mx { preference, .. } if *preference > 100 => Err(Rejection::new(format!(
            "mx preference {preference} is more than 100"
        ))),
        _ => Ok(()),
    }
}

pub fn caa_flag_is_non_zero(rc: &RecordConfig) -> Outcome {
    match &rc.data {
        RecordData::Caa { flag, .. } if *flag != 0 => {
            Err(Rejection::new(format!("caa flag is {flag}, not 0")))
        }
        _ => Ok(()),
    }
}

pub fn caa_target_contains_whitespace(rc: &RecordConfig) -> Outcome {
    let ws = matches!(&rc.data, RecordData::Caa { value, .. } if value.chars().any(char::is_whitespace));
    reject_if(ws, "caa value contains whitespace")
}

/// SRV whose target is `"."` (service not available)
pub fn srv_has_null_target(rc: &RecordConfig) -> Outcome {
    let null = matches!(&rc.data, RecordData::Srv { target, .. } if target.is_null());
    reject_if(null, "srv has null target")
}

/// SRV without a usable target
///
/// Parsed hostnames are never empty, so the root name is the empty form.
pub fn srv_has_empty_target(rc: &RecordConfig) -> Outcome {
    let empty = matches!(&rc.data, RecordData::Srv { target, .. } if target.without_dot().trim_matches('.').is_empty());
    reject_if(empty, "srv has empty target")
}

pub fn srv_has_zero_port(rc: &RecordConfig) -> Outcome {
    let zero = matches!(&rc.data, RecordData::Srv { port: 0, .. });
    reject_if(zero, "srv has port 0")
}

pub fn ns_at_apex(rc: &RecordConfig) -> Outcome {
    let apex_ns = matches!(&rc.data, RecordData::Ns { .. }) && rc.is_apex();
    reject_if(apex_ns, "ns at apex is not supported")
}

pub fn label_not_apex(rc: &RecordConfig) -> Outcome {
    reject_if(!rc.is_apex(), "only allowed at the apex")
}

/// NAPTR with neither replacement nor regexp
pub fn naptr_has_empty_target(rc: &RecordConfig) -> Outcome {
    let empty = matches!(
        &rc.data,
        RecordData::Naptr { replacement, regexp, .. } if replacement.is_null() && regexp.is_empty()
    );
    reject_if(empty, "naptr has neither replacement nor regexp")
}
