//! Built-in adapters
//!
//! - `NONE`: a registrar and DNS provider that never changes anything
//! - `MEMORY`: an in-memory DNS provider for tests and dry runs

pub mod memory;
pub mod none;

pub use memory::{MEMORY_TYPE, MemoryProvider, MemoryProviderFactory, MemoryZones};
pub use none::{NONE_TYPE, NoneFactory, NoneProvider};

use crate::error::Result;
use crate::registry::ProviderRegistry;

/// Register the built-in adapters
pub fn register_builtins(registry: &mut ProviderRegistry) -> Result<()> {
    registry.register_dns_provider(Box::new(NoneFactory))?;
    registry.register_registrar(Box::new(NoneFactory))?;
    registry.register_dns_provider(Box::new(MemoryProviderFactory::new()))?;
    Ok(())
}
