use serde::Deserialize;
use serde_json::Value;

/// Action reported by a row-level change push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// A row-level change event pushed by the backend. Delivery is handled by
/// the platform's push channel; this is the decoded payload the app uses to
/// refresh indicators without polling.
#[derive(Debug, Clone, Deserialize)]
pub struct RowChange {
    pub table: String,
    #[serde(rename = "eventType")]
    pub action: ChangeAction,
    #[serde(default)]
    pub record: Value,
}

impl RowChange {
    /// Whether this change should refresh the activity feed and unread badge.
    pub fn concerns_activity(&self) -> bool {
        self.table == "activity_events"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_payload_is_decoded() {
        let change: RowChange = serde_json::from_str(
            r#"{
                "table": "activity_events",
                "eventType": "INSERT",
                "record": {"id": "abc"}
            }"#,
        )
        .unwrap();
        assert_eq!(change.action, ChangeAction::Insert);
        assert!(change.concerns_activity());
    }

    #[test]
    fn changes_to_other_tables_are_ignored() {
        let change: RowChange = serde_json::from_str(
            r#"{"table": "invoices", "eventType": "UPDATE"}"#,
        )
        .unwrap();
        assert!(!change.concerns_activity());
    }
}
