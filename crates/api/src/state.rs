use std::sync::Arc;

use sqlx::PgPool;

use crate::services::payments::{LogOnlyGateway, PaymentGateway};

/// Engine knobs read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the deadline sweep wakes up.
    pub sweep_interval_secs: u64,
    /// How many lapsed pairings one sweep tick will expire.
    pub sweep_batch_size: i64,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let sweep_interval_secs = match std::env::var("SWEEP_INTERVAL_SECS") {
            Ok(raw) => raw.parse()?,
            Err(_) => 60,
        };
        let sweep_batch_size = match std::env::var("SWEEP_BATCH_SIZE") {
            Ok(raw) => raw.parse()?,
            Err(_) => 100,
        };
        Ok(Self { sweep_interval_secs, sweep_batch_size })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: EngineConfig,
    payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(db: PgPool) -> anyhow::Result<Self> {
        let config = EngineConfig::from_env()?;
        Ok(Self {
            db,
            config,
            payments: Arc::new(LogOnlyGateway),
        })
    }

    pub fn with_gateway(db: PgPool, payments: Arc<dyn PaymentGateway>) -> anyhow::Result<Self> {
        let config = EngineConfig::from_env()?;
        Ok(Self { db, config, payments })
    }

    pub fn payments(&self) -> &Arc<dyn PaymentGateway> {
        &self.payments
    }
}
