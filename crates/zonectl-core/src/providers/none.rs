// # NONE Provider
//
// A registrar and DNS provider that does nothing: no delegation, no
// records, no corrections. Zones that are managed elsewhere (or whose
// delegation is not managed at all) are bound to it.

use crate::audit::RecordAuditor;
use crate::config::ProviderInstanceConfig;
use crate::correction::Correction;
use crate::error::Result;
use crate::models::{DomainConfig, Nameserver, RecordConfig};
use crate::registry::{ProviderMetadata, RegistrarMetadata};
use crate::traits::{DnsServiceProvider, DnsServiceProviderFactory, Registrar, RegistrarFactory};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Type name of the no-op adapters
pub const NONE_TYPE: &str = "NONE";

/// No-op DNS provider and registrar
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneProvider;

#[async_trait]
impl DnsServiceProvider for NoneProvider {
    fn provider_name(&self) -> &str {
        NONE_TYPE
    }

    async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
        Ok(Vec::new())
    }

    async fn get_zone_records(
        &self,
        _domain: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<RecordConfig>> {
        Ok(Vec::new())
    }

    async fn get_zone_records_corrections(
        &self,
        _dc: &DomainConfig,
        _observed: Vec<RecordConfig>,
    ) -> Result<(Vec<Correction>, usize)> {
        Ok((Vec::new(), 0))
    }

    fn auditor(&self) -> RecordAuditor {
        RecordAuditor::new()
    }
}

#[async_trait]
impl Registrar for NoneProvider {
    fn registrar_name(&self) -> &str {
        NONE_TYPE
    }

    async fn get_registrar_corrections(&self, _dc: &DomainConfig) -> Result<Vec<Correction>> {
        Ok(Vec::new())
    }
}

/// Factory for [`NoneProvider`] in both roles
pub struct NoneFactory;

impl DnsServiceProviderFactory for NoneFactory {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: NONE_TYPE.to_string(),
            maintainer: "zonectl".to_string(),
            ..Default::default()
        }
    }

    fn create(&self, _config: &ProviderInstanceConfig) -> Result<Box<dyn DnsServiceProvider>> {
        Ok(Box::new(NoneProvider))
    }
}

impl RegistrarFactory for NoneFactory {
    fn metadata(&self) -> RegistrarMetadata {
        RegistrarMetadata {
            type_name: NONE_TYPE.to_string(),
            maintainer: "zonectl".to_string(),
            creds_schema: Vec::new(),
        }
    }

    fn create(&self, _config: &ProviderInstanceConfig) -> Result<Box<dyn Registrar>> {
        Ok(Box::new(NoneProvider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordData;

    #[tokio::test]
    async fn never_produces_corrections() {
        let mut dc = DomainConfig::new("example.com");
        dc.records.push(
            RecordConfig::new("@", "example.com", 300, RecordData::A {
                address: "1.2.3.4".parse().unwrap(),
            })
            .unwrap(),
        );
        let p = NoneProvider;
        assert!(p.get_zone_records("example.com", &BTreeMap::new()).await.unwrap().is_empty());
        let (corrections, changes) = p.get_zone_records_corrections(&dc, vec![]).await.unwrap();
        assert!(corrections.is_empty());
        assert_eq!(changes, 0);
        assert!(p.get_registrar_corrections(&dc).await.unwrap().is_empty());
    }
}
