//! Periodic boss reset sweep.
//!
//! The scheduler only decides *when* to look. Whether a sweep actually runs is decided by
//! the persisted reset gate inside [`Game::maybe_reset_bosses`], so several processes
//! sharing one database still sweep at most once per interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::game::Game;

/// Scheduler state tracker
pub struct BossResetScheduler {
    game: Arc<Game>,
    config: SchedulerConfig,
    last_sweep_time: Option<DateTime<Utc>>,
    sweeps_run: u64,
    rows_reset: u64,
}

impl BossResetScheduler {
    pub fn new(game: Arc<Game>, config: SchedulerConfig) -> Self {
        Self {
            game,
            config,
            last_sweep_time: None,
            sweeps_run: 0,
            rows_reset: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn enable(&mut self) {
        self.config.enabled = true;
        info!("Boss reset scheduler enabled");
    }

    pub fn disable(&mut self) {
        self.config.enabled = false;
        info!("Boss reset scheduler disabled");
    }

    /// Consult the reset gate once.
    ///
    /// # Returns
    /// - `Ok(Some(rows))` if this call ran the sweep
    /// - `Ok(None)` if disabled or not yet due
    pub fn check_and_reset(&mut self) -> Result<Option<usize>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let swept = self
            .game
            .maybe_reset_bosses()
            .map_err(|e| anyhow!("boss reset failed: {}", e))?;
        self.record(swept);
        Ok(swept)
    }

    fn record(&mut self, swept: Option<usize>) {
        match swept {
            Some(rows) => {
                self.last_sweep_time = Some(self.game.now());
                self.sweeps_run += 1;
                self.rows_reset += rows as u64;
            }
            None => debug!("boss reset not due"),
        }
    }

    /// Tick on `check_interval_secs` until `shutdown` resolves. The store work runs on the
    /// blocking pool.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<BossResetSchedulerStatus>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.check_interval_secs.max(1)));
        tokio::pin!(shutdown);
        info!(
            "Boss reset scheduler running (check every {}s, enabled={})",
            self.config.check_interval_secs, self.config.enabled
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if !self.config.enabled {
                        continue;
                    }
                    let game = Arc::clone(&self.game);
                    match tokio::task::spawn_blocking(move || game.maybe_reset_bosses()).await {
                        Ok(Ok(swept)) => self.record(swept),
                        Ok(Err(e)) => warn!("boss reset failed: {}", e),
                        Err(e) => warn!("boss reset task panicked: {}", e),
                    }
                }
            }
        }
        info!("Boss reset scheduler stopped after {} sweep(s)", self.sweeps_run);
        Ok(self.status())
    }

    pub fn status(&self) -> BossResetSchedulerStatus {
        BossResetSchedulerStatus {
            enabled: self.config.enabled,
            check_interval_secs: self.config.check_interval_secs,
            last_sweep_time: self.last_sweep_time,
            sweeps_run: self.sweeps_run,
            rows_reset: self.rows_reset,
        }
    }
}

/// Status information for the boss reset scheduler
#[derive(Debug, Clone, serde::Serialize)]
pub struct BossResetSchedulerStatus {
    pub enabled: bool,
    pub check_interval_secs: u64,
    pub last_sweep_time: Option<DateTime<Utc>>,
    pub sweeps_run: u64,
    pub rows_reset: u64,
}
