use super::RowFilter;

/// Filters rows on a nullable column being null (or not).
pub struct NullFilter {
    pub column: String,
    pub is_null: bool,
}

impl NullFilter {
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            is_null: false,
        }
    }
}

impl RowFilter for NullFilter {
    fn as_query(&self) -> Vec<(String, String)> {
        let value = if self.is_null { "is.null" } else { "not.is.null" };
        vec![(self.column.clone(), value.to_string())]
    }
}
