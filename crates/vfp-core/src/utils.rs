//! Display helpers for discovered field types.

use arrow_schema::DataType;

/// Human-readable names for the Arrow types a schema scan can produce.
///
/// # Examples
///
/// ```
/// use arrow_schema::DataType;
/// use vfp_core::utils::FieldTypeExt;
///
/// assert_eq!(DataType::Utf8.label(), "String");
/// assert_eq!(DataType::Int64.ogr_type(), "Integer64");
/// ```
pub trait FieldTypeExt {
    /// Short display label.
    fn label(&self) -> String;

    /// Name of the closest OGR field type.
    fn ogr_type(&self) -> &'static str;
}

impl FieldTypeExt for DataType {
    fn label(&self) -> String {
        match self {
            DataType::Null => "Unknown".to_string(),
            DataType::Boolean => "Boolean".to_string(),
            DataType::Int32 => "Int32".to_string(),
            DataType::Int64 => "Int64".to_string(),
            DataType::Float64 => "Float64".to_string(),
            DataType::Utf8 | DataType::LargeUtf8 => "String".to_string(),
            DataType::Date32 | DataType::Date64 => "Date".to_string(),
            DataType::Timestamp(unit, tz) => {
                let tz_str = tz.as_ref().map_or("", |t| t.as_ref());
                format!("Timestamp({unit:?}, {tz_str})")
            },
            _ => format!("{self:?}"),
        }
    }

    fn ogr_type(&self) -> &'static str {
        match self {
            DataType::Boolean | DataType::Int8 | DataType::Int16 | DataType::Int32 => "Integer",
            DataType::Int64 => "Integer64",
            DataType::Float32 | DataType::Float64 => "Real",
            DataType::Date32 | DataType::Date64 => "Date",
            DataType::Timestamp(_, _) => "DateTime",
            DataType::Binary | DataType::LargeBinary => "Binary",
            _ => "String",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::TimeUnit;

    #[test]
    fn test_labels() {
        assert_eq!(DataType::Boolean.label(), "Boolean");
        assert_eq!(DataType::Float64.label(), "Float64");
        assert_eq!(DataType::Null.label(), "Unknown");
        assert_eq!(
            DataType::Timestamp(TimeUnit::Second, Some("UTC".into())).label(),
            "Timestamp(Second, UTC)"
        );
    }

    #[test]
    fn test_ogr_types() {
        assert_eq!(DataType::Boolean.ogr_type(), "Integer");
        assert_eq!(DataType::Float64.ogr_type(), "Real");
        assert_eq!(DataType::Utf8.ogr_type(), "String");
        assert_eq!(DataType::Null.ogr_type(), "String");
    }
}
