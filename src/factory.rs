//! Factory wiring configuration into a running table engine
//!
//! config → store → ledger → entropy → processor, plus the authenticator
//! and metrics the transport layer shares.

use crate::auth::RequestAuthenticator;
use crate::config::{EntropyMode, RouletteConfig};
use crate::errors::{ConfigurationError, RouletteResult};
use crate::games::entropy::{EntropySource, OsEntropy, SeededEntropy, VrfEntropy};
use crate::games::ledger::InMemoryLedger;
use crate::games::processor::TableProcessor;
use crate::games::table::TablePolicy;
use crate::games::vrf_engine::VrfEngine;
use crate::metrics::TableMetrics;
use crate::storage::{open_store, TableStore};
use std::sync::Arc;
use tracing::info;

/// Everything a server or simulation needs, already connected
#[derive(Clone)]
pub struct RouletteRuntime {
    pub config: RouletteConfig,
    pub processor: Arc<TableProcessor>,
    pub ledger: Arc<InMemoryLedger>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub metrics: Arc<TableMetrics>,
    /// Hex VRF public key when spins are provable
    pub vrf_public_key: Option<String>,
}

pub struct RouletteFactory;

impl RouletteFactory {
    /// Build a runtime and restore any persisted tables
    pub fn build(config: RouletteConfig) -> RouletteResult<RouletteRuntime> {
        let store = open_store(&config.storage)?;
        let ledger = Arc::new(InMemoryLedger::new());
        let (entropy, vrf_public_key) = Self::create_entropy(&config, store.as_ref())?;
        let metrics = Arc::new(TableMetrics::new());

        let processor = Arc::new(TableProcessor::new(
            store,
            ledger.clone(),
            entropy,
            TablePolicy::from(&config.table),
            metrics.clone(),
        ));
        processor.restore()?;

        info!(
            storage = ?config.storage.backend,
            entropy = processor.entropy_source(),
            spin_authority = ?config.table.spin_authority,
            max_bets = config.table.max_bets_per_table,
            "Roulette engine ready"
        );

        Ok(RouletteRuntime {
            authenticator: Arc::new(RequestAuthenticator::new(config.api.require_signatures)),
            config,
            processor,
            ledger,
            metrics,
            vrf_public_key,
        })
    }

    fn create_entropy(
        config: &RouletteConfig,
        store: &dyn TableStore,
    ) -> RouletteResult<(Arc<dyn EntropySource>, Option<String>)> {
        match config.entropy.mode {
            EntropyMode::Vrf => {
                let entropy = VrfEntropy::new(VrfEngine::with_persistent_key(store)?);
                let public_key = entropy.public_key_hex();
                info!(public_key = %public_key, "VRF spin key loaded");
                Ok((Arc::new(entropy), Some(public_key)))
            }
            EntropyMode::Os => Ok((Arc::new(OsEntropy), None)),
            EntropyMode::Seeded => {
                let seed = config
                    .entropy
                    .seed
                    .ok_or_else(|| ConfigurationError::MissingRequired("entropy.seed".to_string()))?;
                Ok((Arc::new(SeededEntropy::new(seed)), None))
            }
        }
    }
}
