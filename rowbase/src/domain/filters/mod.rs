mod eq_filter;
mod null_filter;
mod order_filter;
mod page_filter;
mod select_filter;

pub use eq_filter::EqFilter;
pub use null_filter::NullFilter;
pub use order_filter::{OrderFilter, SortDirection};
pub use page_filter::PageFilter;
pub use select_filter::SelectFilter;

pub trait RowFilter {
    fn as_query(&self) -> Vec<(String, String)>;
}

/// Several filters applied to one request, in insertion order.
#[derive(Default)]
pub struct FilterSet {
    filters: Vec<Box<dyn RowFilter + Send + Sync>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl RowFilter + Send + Sync + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl RowFilter for FilterSet {
    fn as_query(&self) -> Vec<(String, String)> {
        self.filters.iter().flat_map(|f| f.as_query()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_set_preserves_insertion_order() {
        let set = FilterSet::new()
            .with(EqFilter::new("status", "open"))
            .with(OrderFilter::desc("created_at"))
            .with(PageFilter::new(20, 40));

        assert_eq!(
            set.as_query(),
            vec![
                ("status".to_string(), "eq.open".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
                ("offset".to_string(), "40".to_string()),
            ]
        );
    }

    #[test]
    fn null_filter_builds_both_directions() {
        assert_eq!(
            NullFilter::is_null("read_at").as_query(),
            vec![("read_at".to_string(), "is.null".to_string())]
        );
        assert_eq!(
            NullFilter::not_null("read_at").as_query(),
            vec![("read_at".to_string(), "not.is.null".to_string())]
        );
    }
}
