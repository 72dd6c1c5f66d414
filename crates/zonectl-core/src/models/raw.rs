//! Pre-typed record shapes produced by the configuration front-end
//!
//! [`RawRecordConfig`] is the positional form (`type` + `args`);
//! [`LegacyRecord`] is the older flat form where every field of every type
//! sits side by side. Both are lifted into [`RecordConfig`] by the type
//! registry.
//!
//! [`RecordConfig`]: super::RecordConfig

use super::rdata::RecordType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A record in positional form; `args[0]` is the label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecordConfig {
    /// Type token
    #[serde(rename = "type")]
    pub rtype: String,
    /// Label followed by the type's fields; strings, numbers or booleans
    #[serde(default)]
    pub args: Vec<Value>,
    /// Metadata maps, merged in order
    #[serde(default)]
    pub metas: Vec<BTreeMap<String, Value>>,
    #[serde(default)]
    pub ttl: u32,
    /// Subdomain the label is relative to
    #[serde(default)]
    pub subdomain: String,
    /// The record must not exist
    #[serde(default)]
    pub ensure_absent: bool,
}

impl RawRecordConfig {
    /// Arguments as strings
    pub fn string_args(&self) -> Vec<String> {
        self.args.iter().map(value_to_string).collect()
    }

    /// All metas merged into one map
    pub fn merged_metas(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for meta in &self.metas {
            for (k, v) in meta {
                out.insert(k.clone(), value_to_string(v));
            }
        }
        out
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A record in the legacy flat form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyRecord {
    #[serde(rename = "type")]
    pub rtype: String,
    pub name: String,
    pub subdomain: String,
    pub ttl: u32,
    pub target: String,
    pub mxpreference: u16,
    pub srvpriority: u16,
    pub srvweight: u16,
    pub srvport: u16,
    pub caaflag: u8,
    pub caatag: String,
    pub tlsausage: u8,
    pub tlsaselector: u8,
    pub tlsamatchingtype: u8,
    pub sshfpalgorithm: u8,
    pub sshfpfingerprint: u8,
    pub dsalgorithm: u8,
    pub dsdigesttype: u8,
    pub dsdigest: String,
    pub dskeytag: u16,
    pub dnskeyflags: u16,
    pub dnskeyprotocol: u8,
    pub dnskeyalgorithm: u8,
    pub naptrorder: u16,
    pub naptrpreference: u16,
    pub naptrflags: String,
    pub naptrservice: String,
    pub naptrregexp: String,
    pub svcpriority: u16,
    pub svcparams: String,
    pub soambox: String,
    pub soaserial: u32,
    pub soarefresh: u32,
    pub soaretry: u32,
    pub soaexpire: u32,
    pub soaminttl: u32,
    pub meta: BTreeMap<String, String>,
}

impl LegacyRecord {
    /// Rebuild the positional field list for `rtype` (label excluded)
    pub fn to_args(&self, rtype: RecordType) -> Vec<String> {
        let meta = |key: &str| self.meta.get(key).cloned().unwrap_or_default();
        let target = self.target.clone();
        match rtype {
            RecordType::Mx => vec![self.mxpreference.to_string(), target],
            RecordType::Srv => vec![
                self.srvpriority.to_string(),
                self.srvweight.to_string(),
                self.srvport.to_string(),
                target,
            ],
            RecordType::Caa => vec![self.caaflag.to_string(), self.caatag.clone(), target],
            RecordType::Tlsa => vec![
                self.tlsausage.to_string(),
                self.tlsaselector.to_string(),
                self.tlsamatchingtype.to_string(),
                target,
            ],
            RecordType::Sshfp => vec![
                self.sshfpalgorithm.to_string(),
                self.sshfpfingerprint.to_string(),
                target,
            ],
            RecordType::Ds => vec![
                self.dskeytag.to_string(),
                self.dsalgorithm.to_string(),
                self.dsdigesttype.to_string(),
                self.dsdigest.clone(),
            ],
            RecordType::Dnskey => vec![
                self.dnskeyflags.to_string(),
                self.dnskeyprotocol.to_string(),
                self.dnskeyalgorithm.to_string(),
                target,
            ],
            RecordType::Naptr => vec![
                self.naptrorder.to_string(),
                self.naptrpreference.to_string(),
                self.naptrflags.clone(),
                self.naptrservice.clone(),
                self.naptrregexp.clone(),
                target,
            ],
            RecordType::Https | RecordType::Svcb => {
                let mut args = vec![self.svcpriority.to_string(), target];
                if !self.svcparams.is_empty() {
                    args.push(self.svcparams.clone());
                }
                args
            }
            RecordType::Soa => vec![
                target,
                self.soambox.clone(),
                self.soaserial.to_string(),
                self.soarefresh.to_string(),
                self.soaretry.to_string(),
                self.soaexpire.to_string(),
                self.soaminttl.to_string(),
            ],
            RecordType::R53Alias => {
                let mut args = vec![meta("alias_type"), target];
                let zone_id = meta("zone_id");
                if !zone_id.is_empty() {
                    args.push(zone_id);
                }
                args
            }
            RecordType::AzureAlias => vec![meta("alias_type"), target],
            RecordType::CfSingleRedirect => vec![
                meta("sr_name"),
                meta("sr_code"),
                meta("sr_when"),
                target,
            ],
            RecordType::AkamaiTlc => vec![meta("answer_type"), target],
            RecordType::PageRule => vec![
                meta("pr_from"),
                target,
                meta("pr_priority"),
                meta("pr_code"),
            ],
            RecordType::ImportTransform => vec![target, meta("transform_table")],
            _ => vec![target],
        }
    }
}
