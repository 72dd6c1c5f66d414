//! Mapping between Cloudflare records and the record model

use crate::PROXY_META;
use crate::api::DnsRecord;
use serde_json::{Value, json};
use zonectl_core::models::{LegacyRecord, RecordData, RecordType};
use zonectl_core::{Error, RecordConfig, Result, TypeRegistry};

/// Cloudflare's TTL value meaning "automatic"
pub const AUTO_TTL: u32 = 1;

/// Types whose traffic Cloudflare can proxy
pub fn is_proxiable(rtype: RecordType) -> bool {
    matches!(rtype, RecordType::A | RecordType::Aaaa | RecordType::Cname)
}

/// Lift an API record into the model
///
/// Automatic TTL stays [`AUTO_TTL`], so it never equals an explicit TTL.
pub fn to_record_config(raw: &DnsRecord, zone: &str) -> Result<RecordConfig> {
    let rtype: RecordType = raw.rtype.parse()?;
    let ttl = raw.ttl;

    let mut legacy = LegacyRecord {
        rtype: raw.rtype.clone(),
        name: absolute(&raw.name),
        ttl,
        ..LegacyRecord::default()
    };
    let rc = match rtype {
        RecordType::Mx => {
            legacy.mxpreference = raw
                .priority
                .ok_or_else(|| Error::parse(&raw.content, "MX record has no priority"))?;
            legacy.target = absolute(&raw.content);
            import(&legacy, zone)?
        }
        RecordType::Txt => {
            legacy.target = unquote_txt(&raw.content);
            import(&legacy, zone)?
        }
        RecordType::Srv => {
            let data = structured(raw)?;
            legacy.srvpriority = number(data, "priority")?;
            legacy.srvweight = number(data, "weight")?;
            legacy.srvport = number(data, "port")?;
            legacy.target = absolute(text(data, "target")?);
            import(&legacy, zone)?
        }
        RecordType::Caa => {
            let data = structured(raw)?;
            legacy.caaflag = number(data, "flags")?;
            legacy.caatag = text(data, "tag")?.to_string();
            legacy.target = text(data, "value")?.to_string();
            import(&legacy, zone)?
        }
        t if t.is_hostname_valued() => {
            legacy.target = absolute(&raw.content);
            import(&legacy, zone)?
        }
        RecordType::A | RecordType::Aaaa => {
            legacy.target = raw.content.clone();
            import(&legacy, zone)?
        }
        // anything else only needs to be read so it can be deleted
        other => {
            let args: Vec<String> = raw.content.split_whitespace().map(str::to_string).collect();
            let data = RecordData::from_args(other, &args, zone)?;
            RecordConfig::from_fqdn(&raw.name, zone, ttl, data)?
        }
    };

    Ok(if is_proxiable(rtype) {
        let proxied = if raw.proxied == Some(true) { "on" } else { "off" };
        rc.with_metadata(PROXY_META, proxied)
    } else {
        rc
    })
}

fn import(legacy: &LegacyRecord, zone: &str) -> Result<RecordConfig> {
    TypeRegistry::global().import_from_legacy(legacy, zone)
}

/// The API body that creates or replaces `rc`
pub fn to_api_record(rc: &RecordConfig) -> DnsRecord {
    let mut record = DnsRecord {
        rtype: rc.rtype().as_str().to_string(),
        name: rc.name_fqdn.clone(),
        ttl: rc.ttl,
        ..DnsRecord::default()
    };
    match &rc.data {
        RecordData::Mx { preference, mx } => {
            record.priority = Some(*preference);
            record.content = mx.without_dot().to_string();
        }
        RecordData::Txt { .. } => record.content = rc.txt_quoted(),
        RecordData::Srv {
            priority,
            weight,
            port,
            target,
        } => {
            record.data = Some(json!({
                "priority": priority,
                "weight": weight,
                "port": port,
                "target": target.without_dot(),
            }));
        }
        RecordData::Caa { flag, tag, value } => {
            record.data = Some(json!({ "flags": flag, "tag": tag, "value": value }));
        }
        data => {
            record.content = match data.hostname_target() {
                Some(target) => target.without_dot().to_string(),
                None => rc.rdata(),
            };
        }
    }
    if is_proxiable(rc.rtype()) {
        record.proxied = Some(rc.metadata.get(PROXY_META).is_some_and(|v| v == "on"));
    }
    record
}

/// Cloudflare returns names and hostnames without the trailing dot
fn absolute(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Undo `"..." "..."` quoting, if present
fn unquote_txt(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('"') || !trimmed.ends_with('"') {
        return content.to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut chars = trimmed.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            c if in_quotes => out.push(c),
            // whitespace between segments
            _ => {}
        }
    }
    out
}

fn structured(raw: &DnsRecord) -> Result<&Value> {
    raw.data
        .as_ref()
        .ok_or_else(|| Error::parse(&raw.content, format!("{} record has no data object", raw.rtype)))
}

fn number<T: TryFrom<u64>>(data: &Value, key: &str) -> Result<T> {
    data.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| Error::parse(data.to_string(), format!("field {key} is missing or out of range")))
}

fn text<'a>(data: &'a Value, key: &str) -> Result<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::parse(data.to_string(), format!("field {key} is missing")))
}
