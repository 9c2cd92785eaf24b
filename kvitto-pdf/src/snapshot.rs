use chrono::NaiveDate;
use rowbase::domain::{Client, Invoice, InvoiceStatus, LineItem};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::format::DocumentDate;
use crate::money::{self, Tax};

/// Descriptions at or below this length read as titles on their own.
const TITLE_ONLY_MAX_CHARS: usize = 40;

/// Older drafts packed "title – body" into a single description field; both
/// separator spellings are still in the wild.
const LEGACY_SEPARATORS: [&str; 2] = [" – ", " - "];

/// One renderable line: a short bold title, a body line, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct LineEntry {
    pub title: Option<String>,
    pub body: Option<String>,
    pub quantity: i64,
    pub amount: Decimal,
}

/// The "bill to" block of the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillTo {
    pub name: Option<String>,
    pub lines: Vec<String>,
}

/// Read-only projection of either a persisted invoice or an in-progress
/// draft. Built fresh for every render; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct InvoiceSnapshot {
    pub number: String,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub issued_at: Option<DocumentDate>,
    pub due_date: Option<DocumentDate>,
    pub notes: Option<String>,
    pub bill_to: BillTo,
    pub lines: Vec<LineEntry>,
}

/// One row of an unpersisted draft.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// An invoice being edited that has not been persisted yet. Totals are
/// derived when the snapshot is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub items: Vec<DraftItem>,
    /// Flat tax amount; wins over `tax_rate` when both are present.
    #[serde(default)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl InvoiceDraft {
    fn tax_mode(&self) -> Tax {
        match (self.tax, self.tax_rate) {
            (Some(amount), _) => Tax::Flat(amount),
            (None, Some(rate)) => Tax::Rate(rate),
            (None, None) => Tax::Flat(Decimal::ZERO),
        }
    }
}

impl InvoiceSnapshot {
    /// Build from a persisted invoice and its ordered line items. Amounts and
    /// totals are recomputed from quantity and unit price so the document can
    /// never disagree with its own rows.
    pub fn from_invoice(invoice: &Invoice, items: &[LineItem], client: Option<&Client>) -> Self {
        let lines = items
            .iter()
            .map(|item| {
                let (title, body) =
                    resolve_line_text(item.title.as_deref(), Some(item.description.as_str()));
                LineEntry {
                    title,
                    body,
                    quantity: money::coerce_quantity(item.quantity),
                    amount: money::line_amount(item.quantity, item.unit_price),
                }
            })
            .collect();

        let totals = money::compute_totals(
            items.iter().map(|item| (item.quantity, item.unit_price)),
            Tax::Flat(invoice.tax),
        );

        let bill_to = match client {
            Some(client) => BillTo {
                name: Some(client.name.clone()),
                lines: client.contact_lines(),
            },
            None => BillTo {
                name: invoice.client_name.clone(),
                lines: Vec::new(),
            },
        };

        InvoiceSnapshot {
            number: invoice.number.clone(),
            status: invoice.status,
            currency: invoice.currency.clone(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            issued_at: invoice.issued_at.map(DocumentDate::Instant),
            due_date: invoice.due_date.map(DocumentDate::Day),
            notes: invoice.notes.clone(),
            bill_to,
            lines,
        }
    }

    /// Build from an in-progress draft.
    pub fn from_draft(draft: &InvoiceDraft) -> Self {
        let lines = draft
            .items
            .iter()
            .map(|item| {
                let (title, body) =
                    resolve_line_text(item.title.as_deref(), item.description.as_deref());
                LineEntry {
                    title,
                    body,
                    quantity: money::coerce_quantity(item.quantity),
                    amount: money::line_amount(item.quantity, item.unit_price),
                }
            })
            .collect();

        let totals = money::compute_totals(
            draft.items.iter().map(|item| (item.quantity, item.unit_price)),
            draft.tax_mode(),
        );

        InvoiceSnapshot {
            number: draft.number.clone().unwrap_or_else(|| "Draft".to_string()),
            status: InvoiceStatus::Draft,
            currency: draft.currency.clone(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            issued_at: None,
            due_date: draft.due_date.map(DocumentDate::Day),
            notes: draft.notes.clone(),
            bill_to: BillTo {
                name: draft.client_name.clone(),
                lines: Vec::new(),
            },
            lines,
        }
    }
}

/// Resolve a line's display title and body.
///
/// An explicit title wins; a description that merely repeats it is dropped.
/// Without a title the description goes through the legacy split (older
/// drafts packed "title – body" into one field), and short separator-less
/// descriptions read as titles.
pub fn resolve_line_text(
    title: Option<&str>,
    description: Option<&str>,
) -> (Option<String>, Option<String>) {
    let title = title.map(str::trim).filter(|s| !s.is_empty());
    let description = description.map(str::trim).filter(|s| !s.is_empty());

    match (title, description) {
        (Some(title), Some(description)) => {
            if description == title {
                (Some(title.to_string()), None)
            } else {
                (Some(title.to_string()), Some(description.to_string()))
            }
        }
        (Some(title), None) => (Some(title.to_string()), None),
        (None, Some(description)) => split_legacy(description),
        (None, None) => (None, None),
    }
}

fn split_legacy(description: &str) -> (Option<String>, Option<String>) {
    for separator in LEGACY_SEPARATORS {
        if let Some((left, right)) = description.split_once(separator) {
            let left = left.trim();
            let right = right.trim();
            return match (left.is_empty(), right.is_empty()) {
                (false, false) => (Some(left.to_string()), Some(right.to_string())),
                (false, true) => (Some(left.to_string()), None),
                (true, false) => (None, Some(right.to_string())),
                (true, true) => (None, None),
            };
        }
    }
    if description.chars().count() <= TITLE_ONLY_MAX_CHARS {
        (Some(description.to_string()), None)
    } else {
        (None, Some(description.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_with_identical_description_is_title_only() {
        assert_eq!(
            resolve_line_text(Some("Labor"), Some("  Labor ")),
            (Some("Labor".to_string()), None)
        );
    }

    #[test]
    fn title_with_distinct_description_keeps_both() {
        assert_eq!(
            resolve_line_text(Some("Labor"), Some("Drywall repair")),
            (Some("Labor".to_string()), Some("Drywall repair".to_string()))
        );
    }

    #[test]
    fn legacy_en_dash_separator_splits() {
        assert_eq!(
            resolve_line_text(None, Some("Labor – Drywall repair")),
            (Some("Labor".to_string()), Some("Drywall repair".to_string()))
        );
    }

    #[test]
    fn legacy_hyphen_separator_splits() {
        assert_eq!(
            resolve_line_text(None, Some("Labor - Drywall repair")),
            (Some("Labor".to_string()), Some("Drywall repair".to_string()))
        );
    }

    #[test]
    fn separator_with_empty_right_side_is_title_only() {
        assert_eq!(
            resolve_line_text(None, Some("Labor – ")),
            (Some("Labor".to_string()), None)
        );
    }

    #[test]
    fn separator_with_empty_left_side_is_body_only() {
        assert_eq!(
            resolve_line_text(None, Some(" – Drywall repair")),
            (None, Some("Drywall repair".to_string()))
        );
    }

    #[test]
    fn short_description_reads_as_title() {
        assert_eq!(
            resolve_line_text(None, Some("Consulting")),
            (Some("Consulting".to_string()), None)
        );
    }

    #[test]
    fn long_description_reads_as_body() {
        let long = "Replaced the water-damaged drywall in the upstairs hallway";
        assert!(long.chars().count() > 40);
        assert_eq!(
            resolve_line_text(None, Some(long)),
            (None, Some(long.to_string()))
        );
    }

    #[test]
    fn forty_characters_is_still_a_title() {
        let exactly_forty = "a".repeat(40);
        assert_eq!(
            resolve_line_text(None, Some(&exactly_forty)),
            (Some(exactly_forty.clone()), None)
        );
    }

    #[test]
    fn nothing_in_nothing_out() {
        assert_eq!(resolve_line_text(None, None), (None, None));
        assert_eq!(resolve_line_text(Some("  "), Some("")), (None, None));
    }

    #[test]
    fn draft_snapshot_derives_totals() {
        let draft: InvoiceDraft = serde_json::from_str(
            r#"{
                "items": [
                    {"description": "Labor", "quantity": 2, "unitPrice": "10"},
                    {"description": "Materials", "quantity": 1, "unitPrice": "5"}
                ],
                "tax": "2"
            }"#,
        )
        .unwrap();
        let snapshot = InvoiceSnapshot::from_draft(&draft);
        assert_eq!(snapshot.subtotal, Decimal::from(25));
        assert_eq!(snapshot.tax, Decimal::from(2));
        assert_eq!(snapshot.total, Decimal::from(27));
        assert_eq!(snapshot.number, "Draft");
        assert_eq!(snapshot.status, InvoiceStatus::Draft);
    }

    #[test]
    fn draft_lines_coerce_bad_rows() {
        let draft: InvoiceDraft = serde_json::from_str(
            r#"{
                "items": [{"description": "Labor", "quantity": 0, "unitPrice": "-4"}]
            }"#,
        )
        .unwrap();
        let snapshot = InvoiceSnapshot::from_draft(&draft);
        assert_eq!(snapshot.lines[0].quantity, 1);
        assert_eq!(snapshot.lines[0].amount, Decimal::ZERO);
        assert_eq!(snapshot.total, Decimal::ZERO);
    }
}
