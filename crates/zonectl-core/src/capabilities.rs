//! Provider capability tokens and documentation notes
//!
//! A provider's capability set is the union of what the registry can derive
//! from its metadata (listed record types, zone listing, zone creation) and
//! what the adapter declares explicitly in its [`DocumentationNotes`].

use crate::error::{Error, Result};
use crate::models::RecordType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A named boolean feature of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// The provider can manage records of this type
    CanUse(RecordType),
    /// DS records are allowed below the apex only
    CanUseDsForChildren,
    /// DNSSEC can be switched on/off
    CanAutoDnssec,
    /// The adapter is safe for concurrent use across zones
    CanConcur,
    /// The adapter can list zones
    CanGetZones,
    /// The adapter can create zones
    DocCreateDomains,
    /// Apex NS records may be managed alongside another provider
    DocDualHost,
    /// Maintained by the project itself
    DocOfficiallySupported,
}

impl Capability {
    /// Capabilities that do not correspond to a record type
    pub const FEATURES: &'static [Capability] = &[
        Capability::CanUseDsForChildren,
        Capability::CanAutoDnssec,
        Capability::CanConcur,
        Capability::CanGetZones,
        Capability::DocCreateDomains,
        Capability::DocDualHost,
        Capability::DocOfficiallySupported,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::CanUse(RecordType::Alias) => f.write_str("CanUseAlias"),
            Capability::CanUse(RecordType::R53Alias) => f.write_str("CanUseRoute53Alias"),
            Capability::CanUse(RecordType::AzureAlias) => f.write_str("CanUseAzureAlias"),
            Capability::CanUse(t) => write!(f, "CanUse{}", t.as_str()),
            Capability::CanUseDsForChildren => f.write_str("CanUseDSForChildren"),
            Capability::CanAutoDnssec => f.write_str("CanAutoDNSSEC"),
            Capability::CanConcur => f.write_str("CanConcur"),
            Capability::CanGetZones => f.write_str("CanGetZones"),
            Capability::DocCreateDomains => f.write_str("DocCreateDomains"),
            Capability::DocDualHost => f.write_str("DocDualHost"),
            Capability::DocOfficiallySupported => f.write_str("DocOfficiallySupported"),
        }
    }
}

/// Documentation attached to one capability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationNote {
    /// Whether the feature is available
    pub has_feature: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    /// Listed but not implemented
    #[serde(default)]
    pub unimplemented: bool,
}

impl DocumentationNote {
    /// Feature available, no comment
    pub fn can() -> Self {
        Self {
            has_feature: true,
            ..Default::default()
        }
    }

    /// Feature available with a comment
    pub fn can_with(comment: impl Into<String>) -> Self {
        Self {
            has_feature: true,
            comment: comment.into(),
            ..Default::default()
        }
    }

    /// Feature unavailable
    pub fn cannot(comment: impl Into<String>) -> Self {
        Self {
            has_feature: false,
            comment: comment.into(),
            ..Default::default()
        }
    }

    /// Present in the API but not implemented by the adapter
    pub fn unimplemented(comment: impl Into<String>) -> Self {
        Self {
            has_feature: false,
            comment: comment.into(),
            link: String::new(),
            unimplemented: true,
        }
    }
}

/// Capability → note, as declared by an adapter
pub type DocumentationNotes = BTreeMap<Capability, DocumentationNote>;

/// Parse a record-type spec element `TYPE[:verb[:note]]`
///
/// `verb` is `""` (supported), `"note"` (supported, with a note) or
/// `"unimplemented"`.
pub fn parse_type_spec(spec: &str) -> Result<(RecordType, DocumentationNote)> {
    let mut parts = spec.splitn(3, ':');
    let token = parts.next().unwrap_or_default();
    let verb = parts.next().unwrap_or_default();
    let note = parts.next().unwrap_or_default();
    let rtype: RecordType = token.parse()?;
    let doc = match verb {
        "" => DocumentationNote::can(),
        "note" => DocumentationNote::can_with(note),
        "unimplemented" => DocumentationNote::unimplemented(note),
        other => {
            return Err(Error::config(format!(
                "record type spec {spec:?}: unknown verb {other:?}"
            )));
        }
    };
    Ok((rtype, doc))
}

/// The resolved capability set of one provider type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    caps: BTreeSet<Capability>,
    notes: DocumentationNotes,
}

impl ProviderCapabilities {
    /// Build from resolved notes; a capability is held when its note says so
    pub fn from_notes(notes: DocumentationNotes) -> Self {
        let caps = notes
            .iter()
            .filter(|(_, note)| note.has_feature)
            .map(|(cap, _)| *cap)
            .collect();
        Self { caps, notes }
    }

    /// Whether the provider has `cap`
    pub fn has(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    /// Whether records of `rtype` may be used
    pub fn can_use(&self, rtype: RecordType) -> bool {
        self.has(Capability::CanUse(rtype))
    }

    /// The note behind a capability, if any
    pub fn note(&self, cap: Capability) -> Option<&DocumentationNote> {
        self.notes.get(&cap)
    }

    /// Every capability held, sorted
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.caps.iter().copied()
    }
}
