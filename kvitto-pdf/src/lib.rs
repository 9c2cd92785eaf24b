pub mod format;
pub mod money;
pub mod render;
pub mod snapshot;

pub use render::{render_invoice, write_document, DocumentBranding, RenderError};
pub use snapshot::{InvoiceDraft, InvoiceSnapshot};
