use std::path::PathBuf;

use anyhow::{Context, Result};
use kvitto_pdf::{render_invoice, write_document, InvoiceSnapshot};
use rowbase::domain::InvoiceStatus;
use rowbase::RowbaseClient;
use uuid::Uuid;

use crate::branding::BrandingCache;

/// Everything the native share surface needs for one invoice.
#[derive(Debug, Clone)]
pub struct SharePayload {
    pub document_path: PathBuf,
    pub checkout_url: String,
    pub message: String,
}

/// Load a persisted invoice and project it for rendering. The client row is
/// a best-effort join: without it the bill-to block falls back to the
/// denormalized name.
pub async fn load_snapshot(db: &RowbaseClient, invoice_id: Uuid) -> Result<InvoiceSnapshot> {
    let invoice = db
        .fetch_invoice(invoice_id)
        .await
        .context("Failed to load invoice")?;
    let items = db
        .fetch_line_items(invoice_id)
        .await
        .context("Failed to load line items")?;
    let client = match invoice.client_id {
        Some(client_id) => db.fetch_client(client_id).await.ok(),
        None => None,
    };
    Ok(InvoiceSnapshot::from_invoice(&invoice, &items, client.as_ref()))
}

/// Render one invoice to its scoped temp document.
pub async fn render_document(
    db: &RowbaseClient,
    branding: &mut BrandingCache,
    user_id: Uuid,
    invoice_id: Uuid,
) -> Result<(PathBuf, InvoiceSnapshot)> {
    let snapshot = load_snapshot(db, invoice_id).await?;
    let document_branding = branding.document_branding(db, user_id).await;
    let bytes = render_invoice(&snapshot, &document_branding)?;
    let path = write_document(&bytes, &snapshot.number)?;
    Ok((path, snapshot))
}

/// Render the invoice and fetch a checkout link from the payment function.
pub async fn build_share_payload(
    db: &RowbaseClient,
    branding: &mut BrandingCache,
    user_id: Uuid,
    invoice_id: Uuid,
) -> Result<SharePayload> {
    let (document_path, snapshot) = render_document(db, branding, user_id, invoice_id).await?;

    let link = db
        .create_checkout_link(invoice_id)
        .await
        .context("Failed to create checkout link")?;

    let message = format!("Invoice {}: pay online at {}", snapshot.number, link.url);
    Ok(SharePayload {
        document_path,
        checkout_url: link.url,
        message,
    })
}

/// The open→sent transition happens only after the share surface reports
/// the invoice genuinely left the device.
pub async fn mark_sent(db: &RowbaseClient, invoice_id: Uuid) -> Result<()> {
    db.set_invoice_status(invoice_id, InvoiceStatus::Sent)
        .await
        .context("Failed to mark invoice sent")
}
