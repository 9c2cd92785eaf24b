use super::RowFilter;

/// Equality filter on a single column.
pub struct EqFilter {
    pub column: String,
    pub value: String,
}

impl EqFilter {
    pub fn new(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

impl RowFilter for EqFilter {
    fn as_query(&self) -> Vec<(String, String)> {
        vec![(self.column.clone(), format!("eq.{}", self.value))]
    }
}
