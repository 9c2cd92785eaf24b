use reqwest::Method;
use serde::Deserialize;
use uuid::Uuid;

use crate::{RowbaseClient, RowbaseFetchError};

/// Response from the server-side checkout function.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLink {
    pub url: String,
}

impl RowbaseClient {
    /// Ask the payment platform for a checkout URL for one invoice. The
    /// platform itself lives behind this server-side function; only the
    /// resulting URL ever reaches the device.
    pub async fn create_checkout_link(
        &self,
        invoice_id: Uuid,
    ) -> Result<CheckoutLink, RowbaseFetchError> {
        let url = self
            .base_url()
            .append_path("/functions/v1/create-checkout-link");
        self.fetch(
            self.request(Method::POST, &url)
                .json(&serde_json::json!({ "invoiceId": invoice_id })),
        )
        .await
    }
}
