use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;

/// A date that arrived either as a plain day or as a full timestamp. Plain
/// days stay UTC-anchored; instants are shifted to the local timezone for
/// display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentDate {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl DocumentDate {
    /// Accepts `YYYY-MM-DD` and ISO-8601 datetimes with or without
    /// fractional seconds or an offset.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::Day(day));
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::Instant(instant.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Self::Instant(Utc.from_utc_datetime(&naive)));
        }
        None
    }

    /// Short month/day/year display, e.g. `Mar 4, 2026`.
    pub fn display(&self) -> String {
        match self {
            Self::Day(day) => day.format("%b %-d, %Y").to_string(),
            Self::Instant(instant) => instant
                .with_timezone(&Local)
                .format("%b %-d, %Y")
                .to_string(),
        }
    }
}

fn symbol(currency: &str) -> Option<&'static str> {
    match currency {
        "USD" | "AUD" | "CAD" | "NZD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        _ => None,
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::new();
    let chars: Vec<char> = digits.chars().collect();
    let mut count = 0;
    for i in (0..chars.len()).rev() {
        if count == 3 {
            grouped.push(',');
            count = 0;
        }
        grouped.push(chars[i]);
        count += 1;
    }
    grouped.chars().rev().collect()
}

/// Two-digit currency display: `$1,234.50` for known codes, `1,234.50 SEK`
/// otherwise.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded < Decimal::ZERO;
    let unsigned = rounded.abs().to_string();
    let (int_part, dec_part) = match unsigned.split_once('.') {
        Some((int_part, dec_part)) => (int_part.to_string(), format!("{:0<2}", dec_part)),
        None => (unsigned, "00".to_string()),
    };
    let grouped = format!("{}.{}", group_thousands(&int_part), dec_part);
    let signed = if negative {
        format!("-{}", grouped)
    } else {
        grouped
    };
    match symbol(currency) {
        Some(symbol) => format!("{}{}", symbol, signed),
        None => format!("{} {}", signed, currency),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates_parse_as_days() {
        assert_eq!(
            DocumentDate::parse("2026-03-04"),
            Some(DocumentDate::Day(
                NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
            ))
        );
    }

    #[test]
    fn iso_datetimes_parse_with_and_without_fractions() {
        let plain = DocumentDate::parse("2026-03-04T12:30:00Z").unwrap();
        let fractional = DocumentDate::parse("2026-03-04T12:30:00.123456Z").unwrap();
        let offsetless = DocumentDate::parse("2026-03-04T12:30:00").unwrap();
        assert!(matches!(plain, DocumentDate::Instant(_)));
        assert!(matches!(fractional, DocumentDate::Instant(_)));
        assert!(matches!(offsetless, DocumentDate::Instant(_)));
    }

    #[test]
    fn garbage_does_not_parse() {
        assert_eq!(DocumentDate::parse("next tuesday"), None);
    }

    #[test]
    fn plain_dates_display_utc_anchored() {
        let date = DocumentDate::Day(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(date.display(), "Mar 4, 2026");
    }

    #[test]
    fn known_currencies_get_a_symbol_prefix() {
        assert_eq!(format_amount(Decimal::new(123450, 2), "USD"), "$1,234.50");
        assert_eq!(format_amount(Decimal::new(500, 2), "EUR"), "€5.00");
    }

    #[test]
    fn unknown_currencies_get_a_code_suffix() {
        assert_eq!(
            format_amount(Decimal::new(123450, 2), "SEK"),
            "1,234.50 SEK"
        );
    }

    #[test]
    fn negative_amounts_keep_the_sign_inside_the_symbol() {
        assert_eq!(format_amount(Decimal::new(-250, 2), "USD"), "$-2.50");
    }

    #[test]
    fn whole_amounts_render_two_decimals() {
        assert_eq!(format_amount(Decimal::from(1000000), "USD"), "$1,000,000.00");
    }
}
