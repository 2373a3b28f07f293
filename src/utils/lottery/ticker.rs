use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::LotteryEngine;

/// Periodically draws for every event whose registration has closed.
pub struct LotteryTicker {
    engine: LotteryEngine,
    period: Duration,
}

impl LotteryTicker {
    pub fn new(engine: LotteryEngine, period: Duration) -> Self {
        Self { engine, period }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        info!("Lottery ticker running every {:?}", self.period);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }

    pub async fn tick(&self) {
        match self.engine.run_due(OffsetDateTime::now_utc()).await {
            Ok(0) => {}
            Ok(drawn) => debug!("Ticker drew winners for {drawn} events"),
            Err(e) => warn!("Lottery tick failed: {e}"),
        }
    }
}
