//! Static instrument registry
//!
//! Map-backed [`InstrumentRegistry`], loadable from a JSON array of
//! snapshots. Lookups are case-insensitive.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use pulse_core::{InstrumentKind, InstrumentRegistry, InstrumentSnapshot, PulseError, PulseResult};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct StaticInstrumentRegistry {
    snapshots: HashMap<String, InstrumentSnapshot>,
}

impl StaticInstrumentRegistry {
    /// Registry that knows nothing; disables the unknown-instrument check
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = InstrumentSnapshot>) -> Self {
        let snapshots = snapshots
            .into_iter()
            .map(|s| (s.symbol.to_lowercase(), s))
            .collect();
        Self { snapshots }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PulseResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PulseError::config(format!(
                "Failed to read instruments from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let snapshots: Vec<InstrumentSnapshot> = serde_json::from_str(&raw)
            .map_err(|e| PulseError::config(format!("Invalid instruments file: {}", e)))?;

        let registry = Self::from_snapshots(snapshots);
        info!("Loaded {} instruments", registry.len());
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn list(&self, kind: InstrumentKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .snapshots
            .values()
            .filter(|s| s.kind == kind)
            .map(|s| s.symbol.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl InstrumentRegistry for StaticInstrumentRegistry {
    async fn get_snapshot(&self, symbol_or_metal: &str) -> PulseResult<Option<InstrumentSnapshot>> {
        Ok(self
            .snapshots
            .get(&symbol_or_metal.trim().to_lowercase())
            .cloned())
    }

    async fn list_known_symbols(&self) -> PulseResult<Vec<String>> {
        Ok(self.list(InstrumentKind::Stock))
    }

    async fn list_known_metals(&self) -> PulseResult<Vec<String>> {
        Ok(self.list(InstrumentKind::Metal))
    }
}
