//! 碳權價格更新流程：fetch → extract → classify → append
//!
//! 排程與手動更新都呼叫同一個 [`Updater`]。更新流程本身不加鎖，
//! 兩個重疊的流程可以同時抓取與解析，只有寫入儲存時由 [`SeriesStore`] 序列化。

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};

use chrono::{DateTime, Local};
use serde::Serialize;
use strum::Display;
use tokio::time::{timeout_at, Instant};

use crate::{
    crawler::{trading_economics::carbon, Fetcher},
    declare::Quote,
    error::CycleError,
    logging,
    store::SeriesStore,
};

/// Stages of one update cycle.
#[derive(Serialize, Display, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CycleStage {
    #[default]
    Idle,
    Fetching,
    Extracting,
    Appending,
    Failed,
}

/// 更新統計
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    pub update_count: u64,
    pub error_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failed_stage: Option<CycleStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Local>>,
}

#[derive(Default)]
struct LastOutcome {
    stage: CycleStage,
    error: Option<String>,
    failed_stage: Option<CycleStage>,
    updated_at: Option<DateTime<Local>>,
}

/// Runs update cycles against one fetcher and one store.
pub struct Updater {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn SeriesStore>,
    deadline: Duration,
    update_count: AtomicU64,
    error_count: AtomicU64,
    last: RwLock<LastOutcome>,
}

impl Updater {
    /// `deadline` bounds every cycle started with [`Updater::run_update_cycle`].
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn SeriesStore>, deadline: Duration) -> Self {
        Updater {
            fetcher,
            store,
            deadline,
            update_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            last: RwLock::new(LastOutcome::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SeriesStore> {
        &self.store
    }

    /// Runs one cycle bounded by the configured deadline.
    pub async fn run_update_cycle(&self) -> Result<Quote, CycleError> {
        self.run_update_cycle_until(Instant::now() + self.deadline).await
    }

    /// Runs one cycle; the fetch is abandoned when `deadline` passes, before
    /// anything reaches the store.
    pub async fn run_update_cycle_until(&self, deadline: Instant) -> Result<Quote, CycleError> {
        logging::info_file_async("Starting carbon price update...");

        match self.cycle(deadline).await {
            Ok(quote) => {
                self.update_count.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut last) = self.last.write() {
                    last.stage = CycleStage::Idle;
                    last.updated_at = quote.observed_at;
                }
                logging::info_file_async(format!(
                    "Carbon price updated: price={}, date={}, daily={:?}, monthly={:?}, yearly={:?}, status={:?}",
                    quote.price,
                    quote.date,
                    quote.daily_change,
                    quote.monthly_change,
                    quote.yearly_change,
                    quote.status
                ));
                Ok(quote)
            }
            Err((stage, why)) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                self.enter(CycleStage::Failed);
                if let Ok(mut last) = self.last.write() {
                    last.error = Some(why.to_string());
                    last.failed_stage = Some(stage);
                }
                logging::error_file_async(format!(
                    "Carbon price update failed while {} because {:?}",
                    stage, why
                ));
                self.enter(CycleStage::Idle);
                Err(why)
            }
        }
    }

    async fn cycle(&self, deadline: Instant) -> Result<Quote, (CycleStage, CycleError)> {
        self.enter(CycleStage::Fetching);
        let text = match timeout_at(deadline, self.fetcher.fetch_raw()).await {
            Ok(Ok(text)) => text,
            Ok(Err(why)) => return Err((CycleStage::Fetching, why.into())),
            Err(_) => return Err((CycleStage::Fetching, CycleError::Cancelled)),
        };

        self.enter(CycleStage::Extracting);
        let mut quote = carbon::extract(&text)
            .map_err(|why| (CycleStage::Extracting, CycleError::from(why)))?;
        quote.observed_at = Some(Local::now());

        self.enter(CycleStage::Appending);
        self.store
            .append(quote)
            .map_err(|why| (CycleStage::Appending, CycleError::from(why)))
    }

    fn enter(&self, stage: CycleStage) {
        if let Ok(mut last) = self.last.write() {
            last.stage = stage;
        }
    }

    /// The stage of the most recent transition; with overlapping cycles this is
    /// whichever cycle moved last.
    pub fn stage(&self) -> CycleStage {
        self.last.read().map(|last| last.stage).unwrap_or_default()
    }

    pub fn stats(&self) -> CycleStats {
        let mut stats = CycleStats {
            update_count: self.update_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            ..Default::default()
        };

        if let Ok(last) = self.last.read() {
            stats.last_error.clone_from(&last.error);
            stats.last_failed_stage = last.failed_stage;
            stats.last_update = last.updated_at;
        }

        stats
    }
}
