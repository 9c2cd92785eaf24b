use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer of the signed-in user. Invoices reference clients by id but
/// also carry a denormalized name so list views need no live join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl Client {
    /// Contact lines for a bill-to block, skipping empty fields.
    pub fn contact_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(address) = self.address.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            lines.push(address.to_string());
        }
        let locality = [
            self.city.as_deref(),
            self.state.as_deref(),
            self.zip.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
        if !locality.is_empty() {
            lines.push(locality);
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            lines.push(email.to_string());
        }
        if let Some(phone) = self.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            lines.push(phone.to_string());
        }
        lines
    }
}

/// Insert payload for the `clients` table. The owner id is filled in by the
/// backend from the caller's token.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewClient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Acme Inc".to_string(),
            email: Some("billing@acme.test".to_string()),
            phone: None,
            address: Some("1 Main St".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            zip: Some("62704".to_string()),
        }
    }

    #[test]
    fn contact_lines_skip_missing_fields() {
        let lines = client().contact_lines();
        assert_eq!(
            lines,
            vec![
                "1 Main St".to_string(),
                "Springfield, IL, 62704".to_string(),
                "billing@acme.test".to_string(),
            ]
        );
    }

    #[test]
    fn contact_lines_empty_for_bare_client() {
        let mut bare = client();
        bare.email = None;
        bare.address = None;
        bare.city = None;
        bare.state = None;
        bare.zip = None;
        assert!(bare.contact_lines().is_empty());
    }
}
