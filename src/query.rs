use url::form_urlencoded;

/// Page size used when the caller does not set a limit.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Hard cap the server enforces on one page.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Builds the query string for entity collection requests.
///
/// Conditions are ANDed with `;` inside one quoted `query` parameter, fields
/// become a comma-joined projection, and pagination/ordering append as plain
/// parameters. Every value is URL-encoded independently.
///
/// ```
/// use octane_ci_sdk::query::QueryBuilder;
///
/// let query = QueryBuilder::new()
///     .condition("ci_server={id=1001}")
///     .field("id")
///     .field("name")
///     .limit(50)
///     .build();
/// assert!(query.starts_with("query="));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    conditions: Vec<String>,
    fields: Vec<String>,
    offset: Option<usize>,
    limit: Option<usize>,
    order_by: Option<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one pre-escaped condition; conditions are ANDed.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Adds one field to the projection.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the page size; values above [`MAX_PAGE_SIZE`] are clamped.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.min(MAX_PAGE_SIZE));
        self
    }

    /// Sets the order-by clause (e.g., `name` or `-creation_time`).
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Renders the query string (without a leading `?`).
    pub fn build(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if !self.conditions.is_empty() {
            serializer.append_pair("query", &format!("\"{}\"", self.conditions.join(";")));
        }
        if !self.fields.is_empty() {
            serializer.append_pair("fields", &self.fields.join(","));
        }
        if let Some(offset) = self.offset {
            serializer.append_pair("offset", &offset.to_string());
        }
        if let Some(limit) = self.limit {
            serializer.append_pair("limit", &limit.to_string());
        }
        if let Some(order_by) = &self.order_by {
            serializer.append_pair("order-by", order_by);
        }

        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded_pairs(query: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_two_conditions_fields_and_pagination() {
        let query = QueryBuilder::new()
            .condition("a=1")
            .condition("b=2")
            .fields(["id", "name"])
            .offset(0)
            .limit(10)
            .build();

        // Each value URL-encoded independently.
        assert_eq!(
            query,
            "query=%22a%3D1%3Bb%3D2%22&fields=id%2Cname&offset=0&limit=10"
        );

        // Decoded, the parameters carry the vendor's expected shapes.
        let pairs = decoded_pairs(&query);
        assert_eq!(
            pairs,
            vec![
                ("query".to_string(), "\"a=1;b=2\"".to_string()),
                ("fields".to_string(), "id,name".to_string()),
                ("offset".to_string(), "0".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_limit_clamped_to_max() {
        let query = QueryBuilder::new().limit(5000).build();
        assert_eq!(query, format!("limit={MAX_PAGE_SIZE}"));
    }

    #[test]
    fn test_order_by_appended_last() {
        let query = QueryBuilder::new()
            .field("id")
            .order_by("-creation_time")
            .build();
        assert_eq!(query, "fields=id&order-by=-creation_time");
    }

    #[test]
    fn test_empty_builder_renders_empty() {
        assert_eq!(QueryBuilder::new().build(), "");
    }

    #[test]
    fn test_single_condition_quoted() {
        let query = QueryBuilder::new().condition("name='nightly'").build();
        let pairs = decoded_pairs(&query);
        assert_eq!(pairs[0].1, "\"name='nightly'\"");
    }
}
