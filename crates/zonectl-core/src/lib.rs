// # zonectl-core
//
// Core library for the zonectl DNS-as-code control plane.
//
// ## Architecture Overview
//
// A zone's desired state (a `DomainConfig`) is reconciled against what each
// bound provider currently serves:
// - **models**: the canonical record entity, typed payloads, label algebra
// - **registry**: record-type table and the plugin registry of adapters
// - **normalize**: lowercasing, punycoding, default TTLs, ignore rules, validation
// - **audit**: per-provider predicates rejecting records before any change
// - **diff**: by-record / by-record-set / by-label / by-zone reconciliation
// - **engine**: the correction pipeline (preview, push, partial failure)
// - **traits**: `DnsServiceProvider` and `Registrar`, implemented by adapters
//
// ## Design Principles
//
// 1. **Library-First**: the CLI is a thin shell over this crate
// 2. **Plugin-Based**: adapters are registered by type name, no hard-coded dispatch
// 3. **Deterministic**: diff output is a pure function of its inputs
// 4. **Plan, then apply**: every check runs before the first mutating call

pub mod audit;
pub mod capabilities;
pub mod config;
pub mod correction;
pub mod diff;
pub mod engine;
pub mod error;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use audit::RecordAuditor;
pub use capabilities::{Capability, DocumentationNote, DocumentationNotes, ProviderCapabilities};
pub use config::{Credentials, EngineConfig, ProviderInstanceConfig, ZoneConfigFile};
pub use correction::Correction;
pub use diff::{Change, ChangeList, ChangeType, Differ};
pub use engine::{Engine, EngineEvent, ProviderSet, RunMode, RunOptions, RunReport};
pub use error::{Error, Result};
pub use models::{DomainConfig, RecordConfig, RecordData, RecordKey, RecordType};
pub use registry::ProviderRegistry;
pub use registry::types::TypeRegistry;
pub use traits::{DnsServiceProvider, DnsServiceProviderFactory, Registrar, RegistrarFactory};
