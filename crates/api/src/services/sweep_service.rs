use std::time::Duration;
use tokio::time::{interval, Interval};
use tracing::{error, info, warn};

use chrono::Utc;
use infra::repos::registrations;

use crate::services::generation_service::GenerationService;
use crate::services::pairing_service::PairingService;
use crate::AppState;

/// Background sweep: expires lapsed SPLIT pairings and triggers structure
/// generation for configs whose registration window has closed.
pub struct SweepService {
    state: AppState,
    interval: Interval,
}

impl SweepService {
    pub fn new(state: AppState) -> Self {
        let interval = interval(Duration::from_secs(state.config.sweep_interval_secs));
        Self { state, interval }
    }

    pub async fn run(&mut self) {
        info!("Starting deadline sweep service");

        loop {
            self.interval.tick().await;

            if let Err(e) = self.tick().await {
                error!("Sweep tick failed: {}", e);
            }
        }
    }

    async fn tick(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = Utc::now();

        let candidates = {
            let mut conn = self.state.db.acquire().await?;
            registrations::expirable_pairing_ids(&mut *conn, now, self.state.config.sweep_batch_size)
                .await?
        };
        let pairing_service = PairingService::new(self.state.clone());
        let mut expired = 0;
        for pairing_id in candidates {
            match pairing_service.expire_one(pairing_id, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to expire pairing {}: {}", pairing_id, e);
                }
            }
        }
        if expired > 0 {
            info!("Expired {} lapsed pairings", expired);
        }

        let generated = GenerationService::new(self.state.clone())
            .generate_due(now)
            .await?;
        if generated > 0 {
            info!("Generated {} tournament structures", generated);
        }

        Ok(())
    }
}

/// Spawn the sweep as a background task.
pub fn spawn_sweep_service(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut service = SweepService::new(state);
        service.run().await;
    })
}
