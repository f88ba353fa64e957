//! # Trading Economics 採集模組
//!
//! 從 `tradingeconomics.com/commodity/carbon` 取得 EU Carbon Permits 報價。
//! 頁面的 `<meta content="...">` 內有一段摘要文字，包含價格、日期與日/月/年漲跌幅，
//! 由 [`carbon::extract`] 解析。

use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, COOKIE},
    Client,
};
use scraper::{Html, Selector};

use crate::{config, crawler::Fetcher, error::FetchError, logging, util};

/// EU Carbon Permits 摘要文字解析
pub mod carbon;

/// 含有報價摘要的 meta 標籤
const META_SELECTOR: &str = "meta[content*='EU Carbon Permits']";

/// Trading Economics 採集器
pub struct TradingEconomics {
    client: Client,
    source: config::Source,
}

impl TradingEconomics {
    pub fn new(source: config::Source) -> Result<Self, FetchError> {
        let client = util::http::build_client(
            &source.user_agent,
            source.connect_timeout(),
            source.timeout(),
        )?;

        Ok(TradingEconomics { client, source })
    }
}

#[async_trait]
impl Fetcher for TradingEconomics {
    async fn fetch_raw(&self) -> Result<String, FetchError> {
        let headers = util::http::header_map(&[
            (ACCEPT, self.source.accept.as_str()),
            (ACCEPT_LANGUAGE, self.source.accept_language.as_str()),
            (CONNECTION, "keep-alive"),
            (COOKIE, self.source.cookie.as_str()),
        ]);
        let html = util::http::get(&self.client, &self.source.url, Some(headers)).await?;

        Ok(summary_or_body(html))
    }
}

/// Returns the content of the summary meta tag, or the whole page when the tag is
/// missing so the extractor can still look for the price phrase.
fn summary_or_body(html: String) -> String {
    let summary = Selector::parse(META_SELECTOR).ok().and_then(|selector| {
        Html::parse_document(&html)
            .select(&selector)
            .find_map(|meta| meta.value().attr("content").map(str::to_string))
    });

    summary.unwrap_or_else(|| {
        logging::debug_file_async("Summary meta tag not found, extracting from the whole page");
        html
    })
}
