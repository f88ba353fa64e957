use async_trait::async_trait;

use crate::error::FetchError;

/// Trading Economics 大宗商品報價
pub mod trading_economics;

/// One outbound retrieval of the quote source.
///
/// Implementations make exactly one attempt and hand back the raw text; whether that
/// text holds a quote is for the extractor to decide.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_raw(&self) -> Result<String, FetchError>;
}
