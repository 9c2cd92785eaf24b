use super::RowFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Orders the result set by a single column.
pub struct OrderFilter {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderFilter {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

impl RowFilter for OrderFilter {
    fn as_query(&self) -> Vec<(String, String)> {
        let direction = match self.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        vec![("order".to_string(), format!("{}.{}", self.column, direction))]
    }
}
