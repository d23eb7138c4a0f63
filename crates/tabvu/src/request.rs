//! Assembles a field/filter selection into the wire query payload.
//! Pure transformation, no I/O.

use crate::TabvuError;
use crate::filter::Filter;
use crate::model::{AggregatedField, FieldRef, QueryDefinition};
use serde_json::{Value, json};

/// The query service rejects wide group-bys; selections are truncated
/// to this many dimensions.
pub const MAX_DIMENSIONS: usize = 10;

/// Non-fatal conditions the builder reports alongside the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// More dimensions were selected than the service accepts; only the
    /// first [`MAX_DIMENSIONS`] were kept, in their original order.
    TooManyDimensions { selected: usize },
}

/// A ready-to-send query payload plus any warnings raised while
/// building it.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub payload: Value,
    pub warnings: Vec<BuildWarning>,
}

/// Builds the `query-datasource` payload: dimensions first, then
/// measures (each carrying its aggregation), then the serialized
/// filters.
pub fn build_query_payload(
    datasource_luid: &str,
    dimensions: &[FieldRef],
    measures: &[AggregatedField],
    filters: &[Filter],
) -> Result<QueryRequest, TabvuError> {
    if datasource_luid.trim().is_empty() {
        return Err(TabvuError::Validation("no data source selected".into()));
    }

    let mut warnings = Vec::new();
    let dimensions = if dimensions.len() > MAX_DIMENSIONS {
        warnings.push(BuildWarning::TooManyDimensions {
            selected: dimensions.len(),
        });
        &dimensions[..MAX_DIMENSIONS]
    } else {
        dimensions
    };

    let mut fields: Vec<Value> = dimensions
        .iter()
        .map(|d| json!({ "fieldCaption": d.name }))
        .collect();
    for measure in measures {
        fields.push(json!({
            "fieldCaption": measure.field.name,
            "function": measure.function.as_str(),
        }));
    }

    let mut wire_filters = Vec::with_capacity(filters.len());
    for filter in filters {
        filter.validate()?;
        wire_filters.push(filter.to_wire());
    }

    let payload = json!({
        "datasource": { "datasourceLuid": datasource_luid },
        "query": { "fields": fields, "filters": wire_filters },
    });

    Ok(QueryRequest { payload, warnings })
}

/// Builds the payload for a saved query definition.
pub fn from_definition(def: &QueryDefinition) -> Result<QueryRequest, TabvuError> {
    build_query_payload(
        &def.datasource_luid,
        &def.dimensions,
        &def.measures,
        &def.filters,
    )
}

/// Builds the single-field payload used to probe the distinct values of
/// a field, e.g. to offer choices for a categorical filter.
pub fn distinct_values_payload(datasource_luid: &str, field_caption: &str) -> Value {
    json!({
        "datasource": { "datasourceLuid": datasource_luid },
        "query": { "fields": [{ "fieldCaption": field_caption }] },
    })
}
