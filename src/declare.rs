use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 資料狀態
#[derive(Serialize, Deserialize, Display, EnumString, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuoteStatus {
    /// date 或 price 與前一筆不同
    Updated,
    /// date 與 price 都與前一筆相同
    Unchanged,
}

impl QuoteStatus {
    /// Classifies `current` against the record appended right before it.
    pub fn classify(previous: Option<&Quote>, current: &Quote) -> Self {
        match previous {
            Some(prev) if prev.date == current.date && prev.price == current.price => {
                QuoteStatus::Unchanged
            }
            _ => QuoteStatus::Updated,
        }
    }
}

/// EU Carbon Permits 報價
///
/// Unit: EUR/ton. The change fields are signed percentages and stay `None` when the
/// source text has no matching phrase, which is not the same as a zero change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// 報價日期，例如 "January 15, 2024"
    pub date: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub daily_change: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub monthly_change: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub yearly_change: Option<Decimal>,
    /// 完成抓取的時間，對外欄位名稱沿用 `lastUpdated`
    #[serde(
        default,
        rename = "lastUpdated",
        alias = "observedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_at: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuoteStatus>,
}

impl Quote {
    pub fn new(price: Decimal, date: impl Into<String>) -> Self {
        Quote {
            price,
            date: date.into(),
            daily_change: None,
            monthly_change: None,
            yearly_change: None,
            observed_at: None,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_classify() {
        let first = Quote::new(dec!(85.23), "January 15, 2024");
        assert_eq!(QuoteStatus::classify(None, &first), QuoteStatus::Updated);

        let same = Quote::new(dec!(85.23), "January 15, 2024");
        assert_eq!(
            QuoteStatus::classify(Some(&first), &same),
            QuoteStatus::Unchanged
        );

        let new_price = Quote::new(dec!(86.01), "January 15, 2024");
        assert_eq!(
            QuoteStatus::classify(Some(&first), &new_price),
            QuoteStatus::Updated
        );

        let new_date = Quote::new(dec!(85.23), "January 16, 2024");
        assert_eq!(
            QuoteStatus::classify(Some(&first), &new_date),
            QuoteStatus::Updated
        );
    }

    #[test]
    fn test_status_text() {
        assert_eq!(QuoteStatus::Updated.to_string(), "updated");
        assert_eq!(
            QuoteStatus::from_str("unchanged").ok(),
            Some(QuoteStatus::Unchanged)
        );
    }

    #[test]
    fn test_json_layout() {
        let mut quote = Quote::new(dec!(82.15), "January 15, 2024");
        quote.daily_change = Some(dec!(-3.2));
        quote.status = Some(QuoteStatus::Updated);

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["price"], serde_json::json!(82.15));
        assert_eq!(json["dailyChange"], serde_json::json!(-3.2));
        assert_eq!(json["status"], "updated");
        assert!(json.get("monthlyChange").is_none());
        assert!(json.get("lastUpdated").is_none());

        quote.observed_at = Some(Local::now());
        let json = serde_json::to_value(&quote).unwrap();
        assert!(json["lastUpdated"].is_string());
        assert!(json.get("observedAt").is_none());
    }

    #[test]
    fn test_load_legacy_record() {
        let text = r#"{"price":85.23,"date":"January 15, 2024","dailyChange":2.5,
            "lastUpdated":"2024-01-15T12:00:00+08:00"}"#;
        let quote: Quote = serde_json::from_str(text).unwrap();

        assert_eq!(quote.price, dec!(85.23));
        assert_eq!(quote.daily_change, Some(dec!(2.5)));
        assert_eq!(quote.monthly_change, None);
        assert!(quote.observed_at.is_some());
        assert_eq!(quote.status, None);
    }
}
