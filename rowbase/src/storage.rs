use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use uuid::Uuid;

use crate::{RowbaseClient, RowbaseFetchError};

const BRANDING_BUCKET: &str = "branding";

fn logo_path(user_id: Uuid) -> String {
    format!("{}/logo.png", user_id)
}

impl RowbaseClient {
    /// Upload (or replace) the user's branding logo at its per-user path.
    pub async fn upload_logo(
        &self,
        user_id: Uuid,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RowbaseFetchError> {
        let url = self.base_url().append_path(&format!(
            "/storage/v1/object/{}/{}",
            BRANDING_BUCKET,
            logo_path(user_id)
        ));
        self.execute(
            self.request(Method::POST, &url)
                .header("x-upsert", "true")
                .header(CONTENT_TYPE, content_type)
                .body(bytes),
        )
        .await
    }

    /// Public URL for the user's logo, cache-busted per request so a replaced
    /// logo is never served stale from the CDN.
    pub fn public_logo_url(&self, user_id: Uuid) -> String {
        let url = self.base_url().append_path(&format!(
            "/storage/v1/object/public/{}/{}",
            BRANDING_BUCKET,
            logo_path(user_id)
        ));
        format!("{}?v={}", url.as_ref(), Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RowbaseUrl;

    #[test]
    fn public_logo_url_is_cache_busted() {
        let client = RowbaseClient::new(RowbaseUrl::new("https://acme.rowbase.co"), "anon");
        let user_id = Uuid::new_v4();
        let url = client.public_logo_url(user_id);
        assert!(url.starts_with(&format!(
            "https://acme.rowbase.co/storage/v1/object/public/branding/{}/logo.png?v=",
            user_id
        )));
    }
}
