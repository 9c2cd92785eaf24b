use super::RowFilter;

/// Column projection, including embedded joins such as `*,clients(name)`.
pub struct SelectFilter(pub String);

impl SelectFilter {
    pub fn columns(columns: impl Into<String>) -> Self {
        Self(columns.into())
    }
}

impl RowFilter for SelectFilter {
    fn as_query(&self) -> Vec<(String, String)> {
        vec![("select".to_string(), self.0.clone())]
    }
}
