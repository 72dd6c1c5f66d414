//! Record and zone data model

pub mod domain;
pub mod fields;
pub mod label;
pub mod loc;
pub mod raw;
pub mod rdata;
pub mod record;

pub use domain::{AutoDnssec, DomainConfig, IgnoreName, IgnoreTarget, Nameserver};
pub use fields::{FieldParse, HostnameDot};
pub use label::{make_fqdn, parse_label3, shorten_fqdn};
pub use loc::Loc;
pub use raw::{LegacyRecord, RawRecordConfig};
pub use rdata::{RecordData, RecordType, SvcbData, segment_txt};
pub use record::{Original, RecordConfig, RecordKey};
