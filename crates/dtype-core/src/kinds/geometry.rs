use crate::descriptor::{Descriptor, TypeBehavior};
use crate::error::{Result, TypeError};
use crate::geojson;
use crate::pipeline::BindCollector;
use crate::types::{GeometryType, TypeId};
use crate::values::Value;
use std::str::FromStr;

/// GEOMETRY and GEOGRAPHY, exchanged as GeoJSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryKind;

impl GeometryKind {
    fn document(value: &Value) -> Option<serde_json::Value> {
        match value {
            Value::Json(json) => Some(json.clone()),
            Value::Object(_) => value.to_json().ok(),
            Value::String(s) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }

    fn kind_name(d: &Descriptor) -> &'static str {
        if d.type_id() == TypeId::Geography {
            "geography"
        } else {
            "geometry"
        }
    }
}

impl TypeBehavior for GeometryKind {
    fn storage_type(&self, d: &Descriptor) -> Result<String> {
        let name = d.type_id().as_str();
        let options = d.data_type().geometry_options().copied().unwrap_or_default();
        Ok(match (options.geometry_type, options.srid) {
            (None, None) => name.to_string(),
            (Some(kind), None) => format!("{name}({})", kind.sql_name()),
            (kind, Some(srid)) => format!(
                "{name}({},{srid})",
                kind.map_or("GEOMETRY", |k| k.sql_name())
            ),
        })
    }

    fn validate(&self, d: &Descriptor, value: &Value) -> Result<()> {
        let kind = Self::kind_name(d);
        let Some(document) = Self::document(value) else {
            return Err(TypeError::not_a_valid(value, kind));
        };
        geojson::check_geometry(&document).map_err(|reason| {
            TypeError::mismatch(value, format!("{value} is not a valid {kind}: {reason}"))
        })?;

        let declared = d
            .data_type()
            .geometry_options()
            .and_then(|o| o.geometry_type);
        let actual =
            geojson::geometry_type(&document).and_then(|t| GeometryType::from_str(t).ok());
        match (declared, actual) {
            (Some(declared), Some(actual)) if declared != actual => Err(TypeError::mismatch(
                value,
                format!(
                    "{value} is not a valid {kind}: expected a {} but got a {}",
                    declared.sql_name(),
                    actual.sql_name()
                ),
            )),
            _ => Ok(()),
        }
    }

    fn sanitize(&self, _d: &Descriptor, value: Value) -> Result<Value> {
        Ok(match Self::document(&value) {
            Some(document) if !matches!(value, Value::Json(_)) => Value::Json(document),
            _ => value,
        })
    }

    fn parse_from_storage(&self, d: &Descriptor, raw: Value) -> Result<Value> {
        match Self::document(&raw) {
            Some(document) => Ok(Value::Json(document)),
            None => Err(TypeError::invalid_storage_value(d.type_id(), &raw)),
        }
    }

    fn to_transport(&self, d: &Descriptor, value: &Value) -> Result<Value> {
        match Self::document(value) {
            Some(document) => Ok(Value::String(document.to_string())),
            None => Err(TypeError::not_a_valid(value, Self::kind_name(d))),
        }
    }

    fn to_inline_literal(&self, d: &Descriptor, value: &Value) -> Result<String> {
        let dialect = d.require_dialect("to_inline_literal")?;
        let text = self.to_transport(d, value)?.as_text();
        Ok(format!("ST_GeomFromGeoJSON({})", dialect.escape_string(&text)))
    }

    fn bind_param_sql(
        &self,
        d: &Descriptor,
        value: &Value,
        params: &mut dyn BindCollector,
    ) -> Result<String> {
        let placeholder = params.collect(self.to_transport(d, value)?);
        Ok(format!("ST_GeomFromGeoJSON({placeholder})"))
    }

    fn are_equivalent(&self, _d: &Descriptor, a: &Value, b: &Value) -> bool {
        match (Self::document(a), Self::document(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::dialect::CapabilityTable;
    use crate::pipeline::BindParams;
    use crate::types::{DataType, GeometryOptions};
    use serde_json::json;

    fn spatial() -> CapabilityTable {
        CapabilityTable {
            geometry: true,
            geography: true,
            ..Default::default()
        }
    }

    fn point() -> Value {
        Value::Json(json!({"coordinates": [1, 2], "type": "Point"}))
    }

    #[test]
    fn test_geometry_storage_names() {
        let dialect = dialect_with(spatial());
        let plain = bound(DataType::geometry(None, None), &dialect);
        assert_eq!(plain.describe_storage_type().unwrap(), "GEOMETRY");
        let typed = bound(DataType::geometry(Some(GeometryType::Point), None), &dialect);
        assert_eq!(typed.describe_storage_type().unwrap(), "GEOMETRY(POINT)");
        let srid = bound(
            DataType::geometry(Some(GeometryType::Point), Some(4326)),
            &dialect,
        );
        assert_eq!(srid.describe_storage_type().unwrap(), "GEOMETRY(POINT,4326)");
        let geography = bound(
            DataType::Geography(GeometryOptions {
                geometry_type: Some(GeometryType::Polygon),
                srid: None,
            }),
            &dialect,
        );
        assert_eq!(
            geography.describe_storage_type().unwrap(),
            "GEOGRAPHY(POLYGON)"
        );
    }

    #[test]
    fn test_geometry_validation() {
        let d = Descriptor::new(DataType::geometry(Some(GeometryType::Point), None));
        assert!(d.validate(&point()).is_ok());
        assert!(d
            .validate(&Value::Json(json!({"type": "Point", "coordinates": ["x", 2]})))
            .is_err());
        let err = d
            .validate(&Value::Json(
                json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]}),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("expected a POINT"));
        assert!(d.validate(&Value::from(5)).is_err());
    }

    #[test]
    fn test_geometry_inline_and_bind_wrap_geojson() {
        let dialect = dialect_with(spatial());
        let d = bound(DataType::geometry(None, None), &dialect);
        assert_eq!(
            d.to_inline_literal(&point()).unwrap(),
            r#"ST_GeomFromGeoJSON('{"coordinates":[1,2],"type":"Point"}')"#
        );

        let mut params = BindParams::new(&dialect);
        assert_eq!(
            d.bind_param_sql(&point(), &mut params).unwrap(),
            "ST_GeomFromGeoJSON(?)"
        );
        assert_eq!(params.values().len(), 1);
    }

    #[test]
    fn test_geometry_unsupported() {
        let dialect = dialect_with(CapabilityTable::default());
        let err = Descriptor::new(DataType::geometry(None, None))
            .specialize(&dialect)
            .unwrap_err();
        assert_eq!(err.to_string(), "test does not support the GEOMETRY data type");
    }
}
