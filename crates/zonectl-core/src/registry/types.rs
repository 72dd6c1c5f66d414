//! Record type registry
//!
//! Maps a type token to the function that turns positional fields into a
//! typed payload. The built-in table covers every [`RecordType`]; it is
//! built once and read without locking afterwards.

use crate::error::{Error, Result};
use crate::models::label::parse_label3;
use crate::models::{LegacyRecord, RawRecordConfig, RecordConfig, RecordData, RecordType};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::trace;

/// Parse positional fields (label excluded) relative to an origin
pub type PopulateFn = fn(RecordType, &[String], &str) -> Result<RecordData>;

/// Registration record for one type
#[derive(Debug, Clone)]
pub struct RecordTypeInfo {
    /// The type
    pub rtype: RecordType,
    /// Field names in argument order
    pub field_names: &'static [&'static str],
    /// Payload constructor
    pub populate: PopulateFn,
    /// Provider pseudo-type
    pub pseudo: bool,
}

impl RecordTypeInfo {
    /// The standard registration for a built-in type
    pub fn builtin(rtype: RecordType) -> Self {
        Self {
            rtype,
            field_names: rtype.field_names(),
            populate: RecordData::from_args,
            pseudo: rtype.is_pseudo(),
        }
    }
}

/// Table of known record types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: BTreeMap<&'static str, RecordTypeInfo>,
}

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in type
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rtype in RecordType::ALL {
            // the table is duplicate-free by construction
            if let Err(e) = registry.register(RecordTypeInfo::builtin(*rtype)) {
                panic!("built-in type table is inconsistent: {e}");
            }
        }
        registry
    }

    /// The process-wide built-in registry
    pub fn global() -> &'static TypeRegistry {
        GLOBAL.get_or_init(TypeRegistry::builtin)
    }

    /// Register a type; registering the same token twice is an error
    pub fn register(&mut self, info: RecordTypeInfo) -> Result<()> {
        let token = info.rtype.as_str();
        if self.types.contains_key(token) {
            return Err(Error::config(format!(
                "record type {token} registered twice"
            )));
        }
        trace!(rtype = token, "registered record type");
        self.types.insert(token, info);
        Ok(())
    }

    /// Look up a type token
    pub fn lookup(&self, token: &str) -> Result<&RecordTypeInfo> {
        self.types
            .get(token)
            .ok_or_else(|| Error::UnknownRecordType(token.to_string()))
    }

    /// Whether a token is registered
    pub fn is_registered(&self, token: &str) -> bool {
        self.types.contains_key(token)
    }

    /// Registered types in token order
    pub fn types(&self) -> impl Iterator<Item = RecordType> + '_ {
        self.types.values().map(|info| info.rtype)
    }

    /// Turn a raw record into a [`RecordConfig`]
    ///
    /// `args[0]` is the label; relative hostnames in the remaining fields are
    /// resolved against the subdomain (when given) within `origin`.
    pub fn populate_from_raw(&self, raw: &RawRecordConfig, origin: &str) -> Result<RecordConfig> {
        let info = self.lookup(&raw.rtype)?;
        let args = raw.string_args();
        let (label, fields) = args
            .split_first()
            .ok_or_else(|| Error::parse(&raw.rtype, "record has no label"))?;
        let (name, name_fqdn) = parse_label3(label, &raw.subdomain, origin)?;

        let data = (info.populate)(info.rtype, fields, &field_origin(&raw.subdomain, origin))
            .map_err(|e| annotate(e, &format!("{} {name_fqdn}", raw.rtype)))?;
        debug_assert_eq!(data.record_type(), info.rtype);

        Ok(RecordConfig {
            name,
            name_fqdn,
            ttl: raw.ttl,
            data,
            metadata: raw.merged_metas(),
            original: None,
        })
    }

    /// Lift a legacy flat record into a [`RecordConfig`]
    ///
    /// Relative targets resolve the same way as in [`Self::populate_from_raw`].
    pub fn import_from_legacy(&self, legacy: &LegacyRecord, origin: &str) -> Result<RecordConfig> {
        let info = self.lookup(&legacy.rtype)?;
        let (name, name_fqdn) = parse_label3(&legacy.name, &legacy.subdomain, origin)?;
        let fields = legacy.to_args(info.rtype);
        let data = (info.populate)(info.rtype, &fields, &field_origin(&legacy.subdomain, origin))
            .map_err(|e| annotate(e, &format!("{} {name_fqdn}", legacy.rtype)))?;
        Ok(RecordConfig {
            name,
            name_fqdn,
            ttl: legacy.ttl,
            data,
            metadata: legacy.meta.clone(),
            original: None,
        })
    }
}

/// Origin relative hostnames in a record's fields resolve against
fn field_origin(subdomain: &str, origin: &str) -> String {
    if subdomain.is_empty() {
        origin.to_string()
    } else {
        format!("{subdomain}.{origin}")
    }
}

fn annotate(err: Error, context: &str) -> Error {
    match err {
        Error::Parse { input, reason } => Error::Parse {
            input,
            reason: format!("{context}: {reason}"),
        },
        other => other,
    }
}
