//! Instrument snapshots and the registry collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PulseResult;

/// Kind of instrument tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Stock,
    Metal,
}

/// Latest numeric snapshot of an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    /// Ticker symbol or metal name
    pub symbol: String,
    pub kind: InstrumentKind,
    pub price: f64,
    /// Absolute change since the previous close
    pub change: f64,
    pub change_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
}

/// Source of instrument prices and of the known-instrument lists
///
/// Lookups are case-insensitive. Implementations return `Ok(None)` for
/// unknown instruments rather than an error.
#[async_trait]
pub trait InstrumentRegistry: Send + Sync {
    async fn get_snapshot(&self, symbol_or_metal: &str) -> PulseResult<Option<InstrumentSnapshot>>;

    async fn list_known_symbols(&self) -> PulseResult<Vec<String>>;

    async fn list_known_metals(&self) -> PulseResult<Vec<String>>;
}
