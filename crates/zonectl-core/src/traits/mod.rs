//! Core traits for the zonectl system
//!
//! This module defines the abstract interfaces provider adapters implement.

pub mod dns_provider;
pub mod registrar;

pub use dns_provider::{DnsServiceProvider, DnsServiceProviderFactory};
pub use registrar::{DelegationChange, Registrar, RegistrarFactory, delegation_change};
