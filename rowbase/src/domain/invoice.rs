use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Sent,
    Paid,
    Overdue,
    Archived,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Open => "open",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Archived => "archived",
        }
    }
}

/// An invoice row as persisted. Totals are stored for list views but are
/// recomputed from the line items whenever a document is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub number: String,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub issued_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
}

/// One line of an invoice. `amount` is derived from quantity and unit price,
/// never edited independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub title: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInvoice {
    pub number: String,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLineItem {
    pub invoice_id: Uuid,
    pub position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Next number in the `INV-0042` sequence, derived from the largest numeric
/// suffix among the persisted invoices.
pub fn next_invoice_number(existing: &[Invoice]) -> String {
    let max = existing
        .iter()
        .filter_map(|invoice| invoice.number.rsplit('-').next())
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("INV-{:04}", max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(number: &str) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            number: number.to_string(),
            status: InvoiceStatus::Open,
            currency: "USD".to_string(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            issued_at: None,
            due_date: None,
            notes: None,
            client_id: None,
            client_name: None,
        }
    }

    #[test]
    fn first_invoice_number_starts_at_one() {
        assert_eq!(next_invoice_number(&[]), "INV-0001");
    }

    #[test]
    fn next_number_follows_largest_suffix() {
        let existing = vec![invoice("INV-0002"), invoice("INV-0017"), invoice("INV-0005")];
        assert_eq!(next_invoice_number(&existing), "INV-0018");
    }

    #[test]
    fn non_numeric_numbers_are_ignored() {
        let existing = vec![invoice("DRAFT"), invoice("INV-0003")];
        assert_eq!(next_invoice_number(&existing), "INV-0004");
    }

    #[test]
    fn status_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Overdue).unwrap(),
            "\"overdue\""
        );
    }
}
