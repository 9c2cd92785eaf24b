use std::time::Duration;

use kvitto_pdf::DocumentBranding;
use rowbase::domain::Branding;
use rowbase::RowbaseClient;
use uuid::Uuid;

/// Logo downloads fail closed after this long and the document renders
/// without one.
const LOGO_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Process-lifetime cache of the branding row and the downloaded logo bytes.
/// Explicitly invalidated when the user edits branding; otherwise reused
/// until the process exits.
#[derive(Default)]
pub struct BrandingCache {
    row: Option<Branding>,
    logo: Option<Vec<u8>>,
    logo_fetched: bool,
}

impl BrandingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached branding row, fetched on first use. Fetch failures are
    /// swallowed: documents fall back to the plain template.
    pub async fn row(&mut self, db: &RowbaseClient, user_id: Uuid) -> Option<&Branding> {
        if self.row.is_none() {
            match db.fetch_branding(user_id).await {
                Ok(row) => self.row = row,
                Err(err) => tracing::warn!("branding fetch failed: {err}"),
            }
        }
        self.row.as_ref()
    }

    /// Best-effort logo download over the cache-busted public URL. Any
    /// failure (no path, timeout, HTTP error) yields `None` and never blocks
    /// document generation. The outcome, success or not, is cached.
    pub async fn logo_bytes(&mut self, db: &RowbaseClient, user_id: Uuid) -> Option<Vec<u8>> {
        if self.logo_fetched {
            return self.logo.clone();
        }
        self.logo_fetched = true;

        self.row(db, user_id).await?.logo_path.as_ref()?;
        let url = db.public_logo_url(user_id);
        match download(&url).await {
            Ok(bytes) => self.logo = Some(bytes),
            Err(err) => tracing::debug!("logo fetch failed, rendering without one: {err}"),
        }
        self.logo.clone()
    }

    /// Resolve everything the renderer consumes for one document.
    pub async fn document_branding(
        &mut self,
        db: &RowbaseClient,
        user_id: Uuid,
    ) -> DocumentBranding {
        let logo = self.logo_bytes(db, user_id).await;
        match self.row(db, user_id).await {
            Some(row) => DocumentBranding {
                business_name: row.business_name.clone(),
                tagline: row.tagline.clone(),
                accent_color: row.accent_color.clone(),
                logo,
                footer_text: row.footer_text.clone(),
            },
            None => DocumentBranding {
                logo,
                ..DocumentBranding::default()
            },
        }
    }

    /// Drop cached values after the user edits branding or replaces the
    /// logo.
    pub fn invalidate(&mut self) {
        self.row = None;
        self.logo = None;
        self.logo_fetched = false;
    }
}

async fn download(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = reqwest::Client::new()
        .get(url)
        .timeout(LOGO_FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbase::RowbaseUrl;

    #[tokio::test]
    async fn unreachable_backend_degrades_to_no_branding() {
        let db = RowbaseClient::new(RowbaseUrl::new("http://127.0.0.1:9"), "anon");
        let mut cache = BrandingCache::new();
        let user_id = Uuid::new_v4();

        assert!(cache.row(&db, user_id).await.is_none());
        assert!(cache.logo_bytes(&db, user_id).await.is_none());
        let branding = cache.document_branding(&db, user_id).await;
        assert!(branding.business_name.is_none());
        assert!(branding.logo.is_none());
    }

    #[tokio::test]
    async fn invalidate_clears_the_cached_outcome() {
        let db = RowbaseClient::new(RowbaseUrl::new("http://127.0.0.1:9"), "anon");
        let mut cache = BrandingCache::new();
        let user_id = Uuid::new_v4();

        cache.logo_bytes(&db, user_id).await;
        assert!(cache.logo_fetched);
        cache.invalidate();
        assert!(!cache.logo_fetched);
        assert!(cache.row.is_none());
    }
}
