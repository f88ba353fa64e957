//! EU Carbon Permits 文字解析
//!
//! The summary sentence looks like
//! `EU Carbon Permits rose to 72.43 EUR on March 21, 2025, up 0.86% from the
//! previous day. Over the past month, the price has fallen 7.78%, and is down 9.33%
//! compared to the same time last year.`
//!
//! Every change figure takes its sign from the direction word of its own phrase, so
//! a daily `up` never leaks into a monthly `fallen`.
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::{declare::Quote, error::ParseError, logging, util::text};

/// `<price> <currency> on <month> <day>, <year>`，價格可含千分位
static REG_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s+([A-Z]{3})\s+on\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})",
    )
    .expect("Failed to compile price regex")
});

static REG_DAILY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(up|down)\s+(\d+(?:\.\d+)?)%").expect("Failed to compile daily regex")
});

static REG_MONTHLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(risen|fallen)\s+(\d+(?:\.\d+)?)%").expect("Failed to compile monthly regex")
});

static REG_YEARLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(up|down)\s+(\d+(?:\.\d+)?)%\s+compared\s+to\s+the\s+same\s+time\s+last\s+year")
        .expect("Failed to compile yearly regex")
});

static REG_YEARLY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+compared\s+to\s+the\s+same\s+time\s+last\s+year")
        .expect("Failed to compile yearly suffix regex")
});

/// Turns the source text into a [`Quote`].
///
/// The price/date phrase is mandatory; each change phrase is optional and leaves
/// its field `None` when absent or unreadable. `observed_at` and `status` are left
/// unset.
pub fn extract(text: &str) -> Result<Quote, ParseError> {
    let text = text::squash_whitespace(text);
    let caps = REG_PRICE.captures(&text).ok_or(ParseError::NoPriceMatch)?;

    let price = text::parse_decimal(&caps[1], None)?;
    if price <= Decimal::ZERO {
        return Err(ParseError::InvalidNumber(format!(
            "price must be positive, got {}",
            price
        )));
    }

    let mut quote = Quote::new(price, &caps[3]);
    quote.daily_change = daily_change(&text);
    quote.monthly_change = change_of(&REG_MONTHLY, &text);
    quote.yearly_change = change_of(&REG_YEARLY, &text);

    Ok(quote)
}

/// The first `up|down N%` that is not the yearly comparison.
fn daily_change(text: &str) -> Option<Decimal> {
    for caps in REG_DAILY.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        if REG_YEARLY_SUFFIX.is_match(&text[whole.end()..]) {
            continue;
        }

        return signed(&caps[1], &caps[2]);
    }

    None
}

fn change_of(reg: &Regex, text: &str) -> Option<Decimal> {
    reg.captures(text).and_then(|caps| signed(&caps[1], &caps[2]))
}

/// 下跌 (down / fallen) 轉為負值；無法解析的數字只讓該欄位留空
fn signed(direction: &str, magnitude: &str) -> Option<Decimal> {
    let value = match text::parse_decimal(magnitude, None) {
        Ok(value) => value,
        Err(why) => {
            logging::warn_file_async(format!(
                "Ignore the {} change because {:?}",
                direction, why
            ));
            return None;
        }
    };

    match direction {
        "down" | "fallen" if !value.is_zero() => Some(-value),
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const RISING: &str = "EU Carbon Permits increased to 85.23 EUR on January 15, 2024, up 2.5% from yesterday. \
        The price has risen 5.2% this month and is up 15.3% compared to the same time last year.";

    const FALLING: &str = "EU Carbon Permits decreased to 82.15 EUR on January 15, 2024, down 3.2% from yesterday. \
        The price has fallen 4.1% this month and is down 8.5% compared to the same time last year.";

    #[test]
    fn test_extract_rising() {
        let quote = extract(RISING).unwrap();

        assert_eq!(quote.price, dec!(85.23));
        assert_eq!(quote.date, "January 15, 2024");
        assert_eq!(quote.daily_change, Some(dec!(2.5)));
        assert_eq!(quote.monthly_change, Some(dec!(5.2)));
        assert_eq!(quote.yearly_change, Some(dec!(15.3)));
        assert_eq!(quote.observed_at, None);
        assert_eq!(quote.status, None);
    }

    #[test]
    fn test_extract_falling() {
        let quote = extract(FALLING).unwrap();

        assert_eq!(quote.price, dec!(82.15));
        assert_eq!(quote.daily_change, Some(dec!(-3.2)));
        assert_eq!(quote.monthly_change, Some(dec!(-4.1)));
        assert_eq!(quote.yearly_change, Some(dec!(-8.5)));
    }

    #[test]
    fn test_extract_mixed_directions() {
        let text = "Carbon rose to 72.43 EUR on March 21, 2025, up 0.86% from the previous day. \
            Over the past month, EU Carbon Permits's price has fallen 7.78%, and is down 9.33% \
            compared to the same time last year, according to trading on a contract for difference.";
        let quote = extract(text).unwrap();

        assert_eq!(quote.price, dec!(72.43));
        assert_eq!(quote.date, "March 21, 2025");
        assert_eq!(quote.daily_change, Some(dec!(0.86)));
        assert_eq!(quote.monthly_change, Some(dec!(-7.78)));
        assert_eq!(quote.yearly_change, Some(dec!(-9.33)));
    }

    #[test]
    fn test_extract_yearly_only_does_not_fill_daily() {
        let text = "EU Carbon Permits at 70.10 EUR on May 2, 2025, and is up 4% compared to the same time last year.";
        let quote = extract(text).unwrap();

        assert_eq!(quote.daily_change, None);
        assert_eq!(quote.monthly_change, None);
        assert_eq!(quote.yearly_change, Some(dec!(4)));
    }

    #[test]
    fn test_extract_missing_changes_are_unset() {
        let quote = extract("EU Carbon Permits traded at 90.00 EUR on June 3, 2024.").unwrap();

        assert_eq!(quote.price, dec!(90.00));
        assert_eq!(quote.daily_change, None);
        assert_eq!(quote.monthly_change, None);
        assert_eq!(quote.yearly_change, None);
    }

    #[test]
    fn test_extract_across_line_breaks() {
        let text = "EU Carbon Permits increased to 85.23\n EUR on January\n15, 2024, up  2.5% from yesterday.";
        let quote = extract(text).unwrap();

        assert_eq!(quote.price, dec!(85.23));
        assert_eq!(quote.date, "January 15, 2024");
        assert_eq!(quote.daily_change, Some(dec!(2.5)));
    }

    #[test]
    fn test_extract_no_price_match() {
        assert_eq!(
            extract("EU Carbon Permits are up 2.5% from yesterday."),
            Err(ParseError::NoPriceMatch)
        );
        assert_eq!(extract(""), Err(ParseError::NoPriceMatch));
    }

    #[test]
    fn test_extract_rejects_zero_price() {
        assert!(matches!(
            extract("EU Carbon Permits fell to 0.00 EUR on January 15, 2024."),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_extract_thousands_separator() {
        let quote = extract("EU Carbon Permits rose to 1,072.43 EUR on March 21, 2025.").unwrap();
        assert_eq!(quote.price, dec!(1072.43));

        let quote = extract("EU Carbon Permits rose to 1072.43 EUR on March 21, 2025.").unwrap();
        assert_eq!(quote.price, dec!(1072.43));
    }

    #[test]
    fn test_extract_unreadable_change_only_unsets_its_field() {
        let text = "EU Carbon Permits rose to 72.43 EUR on March 21, 2025, up 123456789012345678901234567890% \
            from the previous day. Over the past month, the price has fallen 7.78%.";
        let quote = extract(text).unwrap();

        assert_eq!(quote.price, dec!(72.43));
        assert_eq!(quote.daily_change, None);
        assert_eq!(quote.monthly_change, Some(dec!(-7.78)));
        assert_eq!(quote.yearly_change, None);
    }

    #[test]
    fn test_extract_zero_change_has_no_sign() {
        let text = "EU Carbon Permits at 70.00 EUR on May 2, 2025, down 0.00% from the previous day.";
        let quote = extract(text).unwrap();

        let daily = quote.daily_change.unwrap();
        assert!(daily.is_zero());
        assert!(!daily.is_sign_negative());
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["dailyChange"].to_string(), "0.0");
    }

    #[test]
    fn test_extract_is_deterministic() {
        assert_eq!(extract(RISING), extract(RISING));
    }
}
