//! 報價時間序列儲存
//!
//! [`SeriesStore`] 是唯一的對外介面，有兩種實作：
//! - [`MemoryStore`]：只存在記憶體，重啟後清空。
//! - [`FileStore`]：每次新增都會把整個序列寫回 JSON 快照檔。
//!
//! 兩者共用 [`Series`]：以 `RwLock` 保護的有界序列，讀取可並行，新增時獨佔。
//! 新增時在寫鎖內完成狀態判斷、淘汰最舊資料與寫檔，寫檔失敗就不提交，
//! 記憶體與檔案內容不會分歧。

use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::Local;

use crate::{
    config,
    declare::{Quote, QuoteStatus},
    error::StoreError,
    logging,
};

pub use self::{file::FileStore, memory::MemoryStore};

mod file;
mod memory;

/// Append-only, bounded series of quotes.
pub trait SeriesStore: Send + Sync {
    /// Classifies `quote` against the current last record, appends it, evicts the
    /// oldest records beyond the retention bound and returns the committed record.
    fn append(&self, quote: Quote) -> Result<Quote, StoreError>;

    /// The most recently appended record.
    fn latest(&self) -> Option<Quote>;

    /// A copy of every retained record, oldest first.
    fn history(&self) -> Vec<Quote>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 依設定建立儲存實作
pub fn open(system: &config::System) -> Result<Arc<dyn SeriesStore>> {
    if system.persist {
        let path = system.snapshot_path();
        let store = FileStore::open(&path, system.retention)?;
        logging::info_file_async(format!(
            "Loaded {} quotes from {}",
            store.len(),
            path.display()
        ));
        return Ok(Arc::new(store));
    }

    Ok(Arc::new(MemoryStore::new(system.retention)))
}

/// The lock protected record sequence shared by both stores.
pub(crate) struct Series {
    records: RwLock<Vec<Quote>>,
    retention: usize,
}

impl Series {
    /// 保留筆數至少為 1
    pub(crate) fn new(records: Vec<Quote>, retention: usize) -> Self {
        Series {
            records: RwLock::new(records),
            retention: retention.max(1),
        }
    }

    /// Runs classify, append and eviction on a copy of the series, hands the copy to
    /// `persist` and only then swaps it in, all under the write lock.
    pub(crate) fn append_with<F>(&self, quote: Quote, persist: F) -> Result<Quote, StoreError>
    where
        F: FnOnce(&[Quote]) -> Result<(), StoreError>,
    {
        let mut guard = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = guard.clone();
        let committed = push(&mut next, quote, self.retention);

        persist(&next)?;
        *guard = next;

        Ok(committed)
    }

    pub(crate) fn latest(&self) -> Option<Quote> {
        match self.records.read() {
            Ok(records) => records.last().cloned(),
            Err(why) => {
                logging::error_file_async(format!("Failed to read latest because {:?}", why));
                None
            }
        }
    }

    pub(crate) fn history(&self) -> Vec<Quote> {
        match self.records.read() {
            Ok(records) => records.clone(),
            Err(why) => {
                logging::error_file_async(format!("Failed to read history because {:?}", why));
                Vec::new()
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

/// Stamps and classifies `quote`, appends it and drops the oldest records beyond
/// `retention`.
fn push(records: &mut Vec<Quote>, mut quote: Quote, retention: usize) -> Quote {
    quote.status = Some(QuoteStatus::classify(records.last(), &quote));
    if quote.observed_at.is_none() {
        quote.observed_at = Some(Local::now());
    }

    records.push(quote.clone());
    evict(records, retention);

    quote
}

/// 只保留最新的 retention 筆，回傳是否有淘汰
fn evict(records: &mut Vec<Quote>, retention: usize) -> bool {
    if records.len() <= retention {
        return false;
    }

    let overflow = records.len() - retention;
    records.drain(..overflow);
    true
}

/// Fills every missing status with the rule a live append uses; returns whether
/// anything was filled.
fn backfill_status(records: &mut [Quote]) -> bool {
    let mut changed = false;
    for i in 0..records.len() {
        if records[i].status.is_some() {
            continue;
        }

        let status = QuoteStatus::classify(i.checked_sub(1).map(|p| &records[p]), &records[i]);
        records[i].status = Some(status);
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn quote(price: rust_decimal::Decimal, date: &str) -> Quote {
        Quote::new(price, date)
    }

    #[test]
    fn test_push_classifies_and_stamps() {
        let mut records = Vec::new();
        let first = push(&mut records, quote(dec!(85.23), "January 15, 2024"), 30);
        let second = push(&mut records, quote(dec!(85.23), "January 15, 2024"), 30);
        let third = push(&mut records, quote(dec!(85.50), "January 15, 2024"), 30);

        assert_eq!(first.status, Some(QuoteStatus::Updated));
        assert_eq!(second.status, Some(QuoteStatus::Unchanged));
        assert_eq!(third.status, Some(QuoteStatus::Updated));
        assert!(records.iter().all(|q| q.observed_at.is_some()));
    }

    #[test]
    fn test_evict_keeps_newest_in_order() {
        let mut records = Vec::new();
        for day in 1..=5 {
            push(&mut records, quote(dec!(80), &format!("March {}, 2024", day)), 3);
        }

        let dates: Vec<&str> = records.iter().map(|q| q.date.as_str()).collect();
        assert_eq!(dates, ["March 3, 2024", "March 4, 2024", "March 5, 2024"]);
    }

    #[test]
    fn test_backfill_status_keeps_existing() {
        let mut records = vec![
            quote(dec!(80), "March 1, 2024"),
            quote(dec!(80), "March 1, 2024"),
            quote(dec!(81), "March 1, 2024"),
        ];
        records[2].status = Some(QuoteStatus::Unchanged);

        assert!(backfill_status(&mut records));
        assert_eq!(records[0].status, Some(QuoteStatus::Updated));
        assert_eq!(records[1].status, Some(QuoteStatus::Unchanged));
        // 既有的狀態不覆蓋
        assert_eq!(records[2].status, Some(QuoteStatus::Unchanged));
        assert!(!backfill_status(&mut records));
    }

    #[test]
    fn test_zero_retention_keeps_latest() {
        let store = MemoryStore::new(0);
        store.append(quote(dec!(80), "March 1, 2024")).unwrap();
        store.append(quote(dec!(81), "March 2, 2024")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.latest().map(|q| q.price), Some(dec!(81)));
    }

    #[test]
    fn test_open_in_memory() {
        let system = config::System {
            persist: false,
            retention: 2,
            ..Default::default()
        };
        let store = open(&system).unwrap();

        assert!(store.is_empty());
        assert!(store.latest().is_none());
        assert!(store.history().is_empty());
    }
}
