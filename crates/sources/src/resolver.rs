use guardrail_core::Value;

use crate::bag::DataSourceBag;
use crate::error::SourceError;

/// Resolves dotted property paths against a [`DataSourceBag`].
///
/// Stateless beyond the borrowed bag: every call walks the bag fresh, so
/// there is nothing to invalidate when the bag's payloads change between
/// requests.
pub struct DataSourceResolver<'a> {
    bag: &'a DataSourceBag,
}

impl<'a> DataSourceResolver<'a> {
    pub fn new(bag: &'a DataSourceBag) -> Self {
        Self { bag }
    }

    /// Walk one dotted path: the first segment selects a source from the
    /// bag, remaining segments walk object fields.
    pub fn walk(&self, path: &str) -> Result<Value, SourceError> {
        let mut segments = path.split('.');
        let source_name = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SourceError::MalformedDescriptor(path.to_owned()))?;

        let mut current = self
            .bag
            .get(source_name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource(source_name.to_owned()))?;

        for segment in segments {
            current = current
                .field(segment)
                .cloned()
                .ok_or_else(|| SourceError::MissingField { path: path.to_owned(), field: segment.to_owned() })?;
        }

        Ok(current)
    }

    /// Decode a property-path descriptor (a JSON-encoded array of dotted
    /// path strings) into its component paths.
    pub fn decode_descriptor(descriptor: &str) -> Result<Vec<String>, SourceError> {
        serde_json::from_str::<Vec<String>>(descriptor)
            .map_err(|e| SourceError::MalformedDescriptor(format!("{descriptor}: {e}")))
    }

    /// Resolve a single-path descriptor to a scalar or structured value.
    /// Fails if the descriptor doesn't contain exactly one path.
    pub fn resolve_single(&self, descriptor: &str) -> Result<Value, SourceError> {
        let paths = Self::decode_descriptor(descriptor)?;
        match paths.as_slice() {
            [single] => self.walk(single),
            _ => Err(SourceError::MalformedDescriptor(format!(
                "expected exactly one path, got {}",
                paths.len()
            ))),
        }
    }

    /// Resolve a multi-path descriptor, preserving descriptor order.
    /// Fails if the descriptor has fewer than two paths.
    pub fn resolve_many(&self, descriptor: &str) -> Result<Vec<(String, Value)>, SourceError> {
        let paths = Self::decode_descriptor(descriptor)?;
        if paths.len() < 2 {
            return Err(SourceError::MalformedDescriptor(format!(
                "expected at least two paths, got {}",
                paths.len()
            )));
        }
        paths.into_iter().map(|path| self.walk(&path).map(|v| (path, v))).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn sample_bag() -> DataSourceBag {
        let mut bag = DataSourceBag::new();
        let mut obj = BTreeMap::new();
        obj.insert("field_a".to_owned(), Value::String("abc".into()));
        let mut nested = BTreeMap::new();
        nested.insert("email".to_owned(), Value::String("a@b.com".into()));
        obj.insert("borrower".to_owned(), Value::Object(nested));
        bag.insert("test", Value::Object(obj));
        bag
    }

    #[test]
    fn resolve_single_walks_nested_fields() {
        let bag = sample_bag();
        let resolver = DataSourceResolver::new(&bag);
        let value = resolver.resolve_single(r#"["test.borrower.email"]"#).unwrap();
        assert_eq!(value.as_str(), Some("a@b.com"));
    }

    #[test]
    fn resolve_single_rejects_multi_path_descriptors() {
        let bag = sample_bag();
        let resolver = DataSourceResolver::new(&bag);
        assert!(resolver.resolve_single(r#"["test.field_a","test.borrower.email"]"#).is_err());
    }

    #[test]
    fn resolve_many_preserves_descriptor_order() {
        let bag = sample_bag();
        let resolver = DataSourceResolver::new(&bag);
        let pairs = resolver.resolve_many(r#"["test.borrower.email","test.field_a"]"#).unwrap();
        assert_eq!(pairs[0].0, "test.borrower.email");
        assert_eq!(pairs[1].0, "test.field_a");
    }

    #[test]
    fn unknown_source_is_an_error() {
        let bag = sample_bag();
        let resolver = DataSourceResolver::new(&bag);
        let err = resolver.resolve_single(r#"["nope.field"]"#).unwrap_err();
        assert!(matches!(err, SourceError::UnknownSource(name) if name == "nope"));
    }

    #[test]
    fn missing_field_names_the_failing_segment() {
        let bag = sample_bag();
        let resolver = DataSourceResolver::new(&bag);
        let err = resolver.resolve_single(r#"["test.missing_field"]"#).unwrap_err();
        assert!(matches!(err, SourceError::MissingField { field, .. } if field == "missing_field"));
    }
}
