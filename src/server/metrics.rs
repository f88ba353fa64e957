//! API 呼叫統計

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock,
    },
    time::Duration,
};

use serde::Serialize;

/// 只保留最近 1000 筆的回應時間
const MAX_LATENCY_LEN: usize = 1000;

/// Call, error and latency counters for the `/api` routes.
pub struct ApiMetrics {
    calls: AtomicU64,
    errors: AtomicU64,
    latency: RwLock<VecDeque<Duration>>,
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ms: Option<u64>,
}

impl Default for ApiMetrics {
    fn default() -> Self {
        ApiMetrics {
            calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency: RwLock::new(VecDeque::with_capacity(MAX_LATENCY_LEN)),
        }
    }
}

impl ApiMetrics {
    /// Counts one finished call; `failed` marks a 4xx/5xx response.
    pub fn record(&self, elapsed: Duration, failed: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut latency) = self.latency.write() {
            if latency.len() == MAX_LATENCY_LEN {
                latency.pop_front();
            }
            latency.push_back(elapsed);
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(latency) = self.latency.read() else {
            return LatencyStats::default();
        };

        let (Some(min), Some(max)) = (latency.iter().min(), latency.iter().max()) else {
            return LatencyStats::default();
        };

        let total: Duration = latency.iter().sum();
        let avg = total / latency.len() as u32;

        LatencyStats {
            count: latency.len(),
            avg_ms: Some(avg.as_millis() as u64),
            max_ms: Some(max.as_millis() as u64),
            min_ms: Some(min.as_millis() as u64),
            total_ms: Some(total.as_millis() as u64),
        }
    }
}
