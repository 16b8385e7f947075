//! Field schemas collected from the direct children of a target element.
//!
//! Which children become fields, and with which type, is decided per target
//! element by an [`ElementSchema`] strategy registered in [`SchemaStrategies`].
//! The default table is empty, so a scan without strategies yields an empty
//! [`SchemaDescriptor`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// One field of a [`SchemaDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Child element name.
    pub name: String,
    /// Inferred type.
    pub data_type: DataType,
    /// Whether the field may be absent.
    pub nullable: bool,
}

/// Ordered field catalogue of one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescriptor {
    fields: Vec<SchemaField>,
}

impl SchemaDescriptor {
    /// Creates an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in first-seen order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Adds a nullable field unless one with the same name exists.
    ///
    /// Returns `true` if the field was added.
    pub fn record(&mut self, name: &str, data_type: DataType) -> bool {
        if self.field(name).is_some() {
            return false;
        }
        self.fields.push(SchemaField {
            name: name.to_string(),
            data_type,
            nullable: true,
        });
        true
    }

    /// Replaces the type of an existing field.
    pub fn set_type(&mut self, name: &str, data_type: DataType) {
        if let Some(field) = self.fields.iter_mut().find(|field| field.name == name) {
            field.data_type = data_type;
        }
    }

    /// Converts to an Arrow schema.
    #[must_use]
    pub fn to_arrow_schema(&self) -> Schema {
        Schema::new(
            self.fields
                .iter()
                .map(|field| {
                    Field::new(field.name.clone(), field.data_type.clone(), field.nullable)
                })
                .collect::<Vec<_>>(),
        )
    }
}

/// Per-element schema logic.
pub trait ElementSchema: fmt::Debug + Send + Sync {
    /// Type to record for the direct child `child`, or `None` to ignore it.
    fn child_field(&self, child: &str) -> Option<DataType>;

    /// Refines a recorded type from a sample of the child's text.
    fn refine(&self, _child: &str, _current: &DataType, _text: &str) -> Option<DataType> {
        None
    }

    /// Final type once the scan is over.
    fn finish(&self, current: DataType) -> DataType {
        current
    }
}

/// Static child name to type mapping.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: HashMap<String, DataType>,
}

impl FieldMap {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `child` to `data_type`.
    #[must_use]
    pub fn with_field(mut self, child: impl Into<String>, data_type: DataType) -> Self {
        self.fields.insert(child.into(), data_type);
        self
    }
}

impl<S: Into<String>> FromIterator<(S, DataType)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (S, DataType)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(child, data_type)| (child.into(), data_type))
                .collect(),
        }
    }
}

impl ElementSchema for FieldMap {
    fn child_field(&self, child: &str) -> Option<DataType> {
        self.fields.get(child).cloned()
    }
}

/// Records every direct child and infers its type from text content.
///
/// Types widen as more samples are seen: integers and floats merge into
/// `Float64`, anything else conflicting becomes `Utf8`. Children that never
/// carry text end up as `Utf8`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextInference;

impl TextInference {
    fn infer(text: &str) -> DataType {
        if text == "true" || text == "false" {
            return DataType::Boolean;
        }
        if text.parse::<i64>().is_ok() {
            return DataType::Int64;
        }
        let numeric = text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
        if numeric && text.parse::<f64>().is_ok() {
            return DataType::Float64;
        }
        DataType::Utf8
    }

    fn widen(current: &DataType, seen: DataType) -> DataType {
        match (current, seen) {
            (DataType::Null, seen) => seen,
            (current, seen) if *current == seen => seen,
            (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
                DataType::Float64
            },
            _ => DataType::Utf8,
        }
    }
}

impl ElementSchema for TextInference {
    fn child_field(&self, _child: &str) -> Option<DataType> {
        Some(DataType::Null)
    }

    fn refine(&self, _child: &str, current: &DataType, text: &str) -> Option<DataType> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let widened = Self::widen(current, Self::infer(text));
        (widened != *current).then_some(widened)
    }

    fn finish(&self, current: DataType) -> DataType {
        match current {
            DataType::Null => DataType::Utf8,
            other => other,
        }
    }
}

/// Strategy table keyed by target element name.
#[derive(Debug, Clone, Default)]
pub struct SchemaStrategies {
    strategies: HashMap<String, Arc<dyn ElementSchema>>,
}

impl SchemaStrategies {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table applying [`TextInference`] to every listed element.
    #[must_use]
    pub fn text_inference<'a>(elements: impl IntoIterator<Item = &'a str>) -> Self {
        let shared: Arc<dyn ElementSchema> = Arc::new(TextInference);
        Self {
            strategies: elements
                .into_iter()
                .map(|element| (element.to_string(), Arc::clone(&shared)))
                .collect(),
        }
    }

    /// Registers `strategy` for `element`, replacing any previous one.
    #[must_use]
    pub fn with(self, element: impl Into<String>, strategy: impl ElementSchema + 'static) -> Self {
        self.with_shared(element, Arc::new(strategy))
    }

    /// Registers an already shared strategy for `element`.
    #[must_use]
    pub fn with_shared(
        mut self,
        element: impl Into<String>,
        strategy: Arc<dyn ElementSchema>,
    ) -> Self {
        self.strategies.insert(element.into(), strategy);
        self
    }

    /// Strategy for `element`, if any.
    #[must_use]
    pub fn get(&self, element: &str) -> Option<&dyn ElementSchema> {
        self.strategies.get(element).map(Arc::as_ref)
    }

    /// Returns `true` when no strategy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_keeps_first_seen_order() {
        let mut schema = SchemaDescriptor::new();
        assert!(schema.record("b", DataType::Utf8));
        assert!(schema.record("a", DataType::Int64));
        assert!(!schema.record("b", DataType::Int64));

        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(schema.field("b").unwrap().data_type, DataType::Utf8);

        let arrow = schema.to_arrow_schema();
        assert_eq!(arrow.fields().len(), 2);
        assert_eq!(arrow.field(1).name(), "a");
        assert!(arrow.field(1).is_nullable());
    }

    #[test]
    fn field_map_records_only_listed_children() {
        let map: FieldMap = [("id", DataType::Int64), ("jmeno", DataType::Utf8)]
            .into_iter()
            .collect();
        assert_eq!(map.child_field("id"), Some(DataType::Int64));
        assert_eq!(map.child_field("other"), None);
        assert_eq!(map.refine("id", &DataType::Int64, "x"), None);
    }

    #[test]
    fn text_inference_widens() {
        let inference = TextInference;
        let mut current = inference.child_field("x").unwrap();

        for (sample, expected) in [
            ("42", DataType::Int64),
            ("  ", DataType::Int64),
            ("4.5", DataType::Float64),
            ("7", DataType::Float64),
            ("abc", DataType::Utf8),
        ] {
            if let Some(refined) = inference.refine("x", &current, sample) {
                current = refined;
            }
            assert_eq!(current, expected, "after {sample:?}");
        }
    }

    #[test]
    fn text_inference_recognises_booleans_and_rejects_words() {
        assert_eq!(TextInference::infer("true"), DataType::Boolean);
        assert_eq!(TextInference::infer("-12"), DataType::Int64);
        assert_eq!(TextInference::infer("1e3"), DataType::Float64);
        assert_eq!(TextInference::infer("inf"), DataType::Utf8);
        assert_eq!(TextInference::infer("NaN"), DataType::Utf8);
        assert_eq!(TextInference.finish(DataType::Null), DataType::Utf8);
    }

    #[test]
    fn strategies_default_to_empty() {
        let strategies = SchemaStrategies::default();
        assert!(strategies.is_empty());
        assert!(strategies.get("zs").is_none());

        let strategies = SchemaStrategies::text_inference(["zs", "bpej"])
            .with("narok", FieldMap::new().with_field("id", DataType::Int64));
        assert!(strategies.get("zs").is_some());
        assert_eq!(
            strategies.get("narok").unwrap().child_field("id"),
            Some(DataType::Int64)
        );
    }
}
