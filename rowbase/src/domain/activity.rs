use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    Sent,
    Opened,
    Paid,
    Archived,
    Deleted,
    Overdue,
    DueSoon,
}

impl ActivityKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ActivityKind::Created => "Invoice created",
            ActivityKind::Sent => "Invoice sent",
            ActivityKind::Opened => "Invoice opened",
            ActivityKind::Paid => "Invoice paid",
            ActivityKind::Archived => "Invoice archived",
            ActivityKind::Deleted => "Invoice deleted",
            ActivityKind::Overdue => "Invoice overdue",
            ActivityKind::DueSoon => "Invoice due soon",
        }
    }
}

/// The joined client row arrives in whichever shape the query used: an
/// embedded object, an embedded list, or a bare denormalized string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClientJoin {
    Object(ClientJoinRow),
    List(Vec<ClientJoinRow>),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientJoinRow {
    pub name: String,
}

impl ClientJoin {
    /// Precedence: embedded object, then the head of an embedded list, then
    /// the bare string.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            ClientJoin::Object(row) => Some(row.name.as_str()),
            ClientJoin::List(rows) => rows.first().map(|row| row.name.as_str()),
            ClientJoin::Name(name) => Some(name.as_str()),
        }
    }
}

/// One entry in the activity feed, created server-side when an invoice
/// transitions state. `read_at` is null until the user sees it and is never
/// re-nulled afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default, rename = "clients")]
    pub client_join: Option<ClientJoin>,
    #[serde(default)]
    pub client_name: Option<String>,
}

impl ActivityEvent {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Display name of the associated client: join shapes win over the flat
    /// denormalized column.
    pub fn display_client_name(&self) -> Option<&str> {
        self.client_join
            .as_ref()
            .and_then(|join| join.display_name())
            .or(self.client_name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ActivityEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn embedded_object_join_is_decoded() {
        let event = parse(
            r#"{
                "id": "11111111-2222-3333-4444-555555555555",
                "invoice_id": null,
                "kind": "opened",
                "created_at": "2026-03-01T10:00:00Z",
                "read_at": null,
                "invoice_number": "INV-0009",
                "clients": {"name": "Acme Inc"}
            }"#,
        );
        assert_eq!(event.display_client_name(), Some("Acme Inc"));
        assert!(event.is_unread());
    }

    #[test]
    fn embedded_list_join_uses_first_row() {
        let event = parse(
            r#"{
                "id": "11111111-2222-3333-4444-555555555555",
                "invoice_id": null,
                "kind": "paid",
                "created_at": "2026-03-01T10:00:00Z",
                "read_at": "2026-03-01T11:00:00Z",
                "clients": [{"name": "First"}, {"name": "Second"}]
            }"#,
        );
        assert_eq!(event.display_client_name(), Some("First"));
        assert!(!event.is_unread());
    }

    #[test]
    fn join_shape_wins_over_flat_column() {
        let event = parse(
            r#"{
                "id": "11111111-2222-3333-4444-555555555555",
                "invoice_id": null,
                "kind": "sent",
                "created_at": "2026-03-01T10:00:00Z",
                "read_at": null,
                "clients": {"name": "Joined"},
                "client_name": "Flat"
            }"#,
        );
        assert_eq!(event.display_client_name(), Some("Joined"));
    }

    #[test]
    fn flat_column_is_the_fallback() {
        let event = parse(
            r#"{
                "id": "11111111-2222-3333-4444-555555555555",
                "invoice_id": null,
                "kind": "due_soon",
                "created_at": "2026-03-01T10:00:00Z",
                "read_at": null,
                "client_name": "Flat Only"
            }"#,
        );
        assert_eq!(event.display_client_name(), Some("Flat Only"));
    }

    #[test]
    fn fractional_second_timestamps_are_accepted() {
        let event = parse(
            r#"{
                "id": "11111111-2222-3333-4444-555555555555",
                "invoice_id": null,
                "kind": "created",
                "created_at": "2026-03-01T10:00:00.123456Z",
                "read_at": null
            }"#,
        );
        assert_eq!(event.kind, ActivityKind::Created);
    }
}
