use super::RowFilter;

/// Limit/offset pagination window.
pub struct PageFilter {
    pub limit: usize,
    pub offset: usize,
}

impl PageFilter {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

impl RowFilter for PageFilter {
    fn as_query(&self) -> Vec<(String, String)> {
        vec![
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ]
    }
}
