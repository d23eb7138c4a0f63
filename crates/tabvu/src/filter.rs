//! The filter model and its wire mapping.
//!
//! The query service overloads key names across its filter shapes
//! (`min`/`max` on numeric and `minDate`/`maxDate` on date filters ride
//! alongside a shared `quantitativeFilterType`, and key *omission*, not
//! null, is what signals an open bound), so the mapping is written by
//! hand against `serde_json::Value` rather than derived. Dispatch is on
//! `filterType` first, exhaustively matched over a closed set of
//! variants.
//!
//! Filters store the field caption rather than a full [`FieldRef`]: the
//! wire carries only the caption, and a filter reloaded from disk must
//! compare equal to the one that was saved. Type rules (categorical
//! filters apply to string/boolean fields only) are enforced by the
//! constructors that take a `FieldRef`.

use crate::TabvuError;
use crate::model::{AggFn, FieldRef, FieldType};
use chrono::NaiveDate;
use diagnostics::*;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// A query filter. Closed set; serialization and validation match
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Categorical(CategoricalFilter),
    NumericRange(NumericRangeFilter),
    Date(DateFilter),
}

/// Keep or exclude a set of discrete values of a string/boolean field.
/// An empty value set is legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalFilter {
    pub field_caption: String,
    pub exclude: bool,
    pub values: BTreeSet<String>,
}

impl CategoricalFilter {
    /// Builds an empty include-filter for `field`, rejecting fields a
    /// set filter cannot apply to.
    pub fn for_field(field: &FieldRef) -> Result<Self, TabvuError> {
        match field.data_type {
            FieldType::String | FieldType::Boolean => Ok(Self {
                field_caption: field.name.clone(),
                exclude: false,
                values: BTreeSet::new(),
            }),
            other => Err(TabvuError::Validation(format!(
                "categorical filters need a string or boolean field, '{}' is {:?}",
                field.name, other
            ))),
        }
    }
}

/// The sub-modes shared by numeric and quantitative-date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantitativeKind {
    Range,
    MinOnly,
    MaxOnly,
    OnlyNull,
    OnlyNonNull,
}

impl QuantitativeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Range => "RANGE",
            Self::MinOnly => "MIN",
            Self::MaxOnly => "MAX",
            Self::OnlyNull => "ONLY_NULL",
            Self::OnlyNonNull => "ONLY_NON_NULL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "RANGE" => Some(Self::Range),
            "MIN" => Some(Self::MinOnly),
            "MAX" => Some(Self::MaxOnly),
            "ONLY_NULL" => Some(Self::OnlyNull),
            "ONLY_NON_NULL" => Some(Self::OnlyNonNull),
            _ => None,
        }
    }
}

/// Bound a numeric field, optionally aggregated first. Bounds are
/// populated only when the kind calls for them; `Range` with either
/// bound absent is open-ended on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRangeFilter {
    pub field_caption: String,
    pub function: Option<AggFn>,
    pub kind: QuantitativeKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Period units for relative date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodType {
    Days,
    Weeks,
    Months,
    Quarters,
    Years,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "DAYS",
            Self::Weeks => "WEEKS",
            Self::Months => "MONTHS",
            Self::Quarters => "QUARTERS",
            Self::Years => "YEARS",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "DAYS" => Some(Self::Days),
            "WEEKS" => Some(Self::Weeks),
            "MONTHS" => Some(Self::Months),
            "QUARTERS" => Some(Self::Quarters),
            "YEARS" => Some(Self::Years),
            _ => None,
        }
    }
}

/// Anchors for relative date filters. `LastN`/`NextN` carry a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeType {
    Last,
    Current,
    Next,
    LastN,
    NextN,
    ToDate,
}

impl DateRangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last => "LAST",
            Self::Current => "CURRENT",
            Self::Next => "NEXT",
            Self::LastN => "LASTN",
            Self::NextN => "NEXTN",
            Self::ToDate => "TODATE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "LAST" => Some(Self::Last),
            "CURRENT" => Some(Self::Current),
            "NEXT" => Some(Self::Next),
            "LASTN" => Some(Self::LastN),
            "NEXTN" => Some(Self::NextN),
            "TODATE" => Some(Self::ToDate),
            _ => None,
        }
    }

    /// Whether this anchor requires a `rangeN` count.
    pub fn needs_n(self) -> bool {
        matches!(self, Self::LastN | Self::NextN)
    }
}

/// Date filters come in two modes that serialize to different
/// `filterType`s: fixed bounds (`QUANTITATIVE_DATE`) and periods
/// relative to today (`DATE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    Quantitative {
        field_caption: String,
        kind: QuantitativeKind,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
    },
    Relative {
        field_caption: String,
        period_type: PeriodType,
        range_type: DateRangeType,
        range_n: Option<u32>,
    },
}

impl Filter {
    pub fn field_caption(&self) -> &str {
        match self {
            Self::Categorical(f) => &f.field_caption,
            Self::NumericRange(f) => &f.field_caption,
            Self::Date(DateFilter::Quantitative { field_caption, .. })
            | Self::Date(DateFilter::Relative { field_caption, .. }) => field_caption,
        }
    }

    /// Checks the cross-field invariants: bounds only where the kind
    /// wants them, a count exactly when the anchor needs one.
    pub fn validate(&self) -> Result<(), TabvuError> {
        match self {
            Self::Categorical(_) => Ok(()),
            Self::NumericRange(f) => {
                check_bounds(f.kind, f.min.is_some(), f.max.is_some(), &f.field_caption)
            }
            Self::Date(DateFilter::Quantitative {
                field_caption,
                kind,
                min_date,
                max_date,
            }) => check_bounds(*kind, min_date.is_some(), max_date.is_some(), field_caption),
            Self::Date(DateFilter::Relative {
                field_caption,
                range_type,
                range_n,
                ..
            }) => {
                if range_type.needs_n() != range_n.is_some() {
                    return Err(TabvuError::Validation(format!(
                        "filter on '{}': rangeN is required for {} and not allowed otherwise",
                        field_caption,
                        range_type.as_str()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Maps the filter to the wire JSON shape the query service expects.
    /// Open bounds are omitted keys, never nulls.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Categorical(f) => json!({
                "filterType": "SET",
                "field": { "fieldCaption": f.field_caption },
                "exclude": f.exclude,
                "values": f.values,
            }),
            Self::NumericRange(f) => {
                let mut field = Map::new();
                field.insert("fieldCaption".into(), json!(f.field_caption));
                if let Some(function) = f.function {
                    field.insert("function".into(), json!(function.as_str()));
                }
                let mut obj = Map::new();
                obj.insert("filterType".into(), json!("QUANTITATIVE_NUMERICAL"));
                obj.insert("field".into(), Value::Object(field));
                obj.insert("quantitativeFilterType".into(), json!(f.kind.as_str()));
                if let Some(min) = f.min {
                    obj.insert("min".into(), json!(min));
                }
                if let Some(max) = f.max {
                    obj.insert("max".into(), json!(max));
                }
                Value::Object(obj)
            }
            Self::Date(DateFilter::Quantitative {
                field_caption,
                kind,
                min_date,
                max_date,
            }) => {
                let mut obj = Map::new();
                obj.insert("filterType".into(), json!("QUANTITATIVE_DATE"));
                obj.insert("field".into(), json!({ "fieldCaption": field_caption }));
                obj.insert("quantitativeFilterType".into(), json!(kind.as_str()));
                if let Some(min_date) = min_date {
                    obj.insert("minDate".into(), json!(min_date.to_string()));
                }
                if let Some(max_date) = max_date {
                    obj.insert("maxDate".into(), json!(max_date.to_string()));
                }
                Value::Object(obj)
            }
            Self::Date(DateFilter::Relative {
                field_caption,
                period_type,
                range_type,
                range_n,
            }) => {
                let mut obj = Map::new();
                obj.insert("filterType".into(), json!("DATE"));
                obj.insert("field".into(), json!({ "fieldCaption": field_caption }));
                obj.insert("periodType".into(), json!(period_type.as_str()));
                obj.insert("dateRangeType".into(), json!(range_type.as_str()));
                if let Some(n) = range_n {
                    obj.insert("rangeN".into(), json!(n));
                }
                Value::Object(obj)
            }
        }
    }

    /// Inverse of [`to_wire`](Self::to_wire). Dispatches on `filterType`,
    /// then (for dates) on which mode's keys are present. Unknown
    /// `filterType` values yield [`TabvuError::UnsupportedFilterKind`] so
    /// callers can skip just that filter.
    pub fn from_wire(value: &Value) -> Result<Self, TabvuError> {
        let filter_type = value
            .get("filterType")
            .and_then(Value::as_str)
            .ok_or_else(|| TabvuError::MalformedResponse("filter has no filterType".into()))?;

        match filter_type {
            "SET" => {
                let field_caption = caption_of(value)?;
                let exclude = value
                    .get("exclude")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let raw_values = value
                    .get("values")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        TabvuError::MalformedResponse(format!(
                            "set filter on '{field_caption}' has no values array"
                        ))
                    })?;
                let mut values = BTreeSet::new();
                for raw in raw_values {
                    let entry = raw.as_str().ok_or_else(|| {
                        TabvuError::MalformedResponse(format!(
                            "set filter on '{field_caption}' has a non-string value"
                        ))
                    })?;
                    values.insert(entry.to_string());
                }
                Ok(Self::Categorical(CategoricalFilter {
                    field_caption,
                    exclude,
                    values,
                }))
            }
            "QUANTITATIVE_NUMERICAL" => {
                let field_caption = caption_of(value)?;
                let function = match value
                    .get("field")
                    .and_then(|f| f.get("function"))
                    .and_then(Value::as_str)
                {
                    Some(raw) => Some(AggFn::parse(raw).ok_or_else(|| {
                        TabvuError::MalformedResponse(format!("unknown aggregation '{raw}'"))
                    })?),
                    None => None,
                };
                let kind = quantitative_kind_of(value, &field_caption)?;
                // Read only the bounds this kind carries, like the rest of
                // the contract: stray keys on the wire are not state.
                let (min, max) = match kind {
                    QuantitativeKind::Range => {
                        (number_key(value, "min"), number_key(value, "max"))
                    }
                    QuantitativeKind::MinOnly => (number_key(value, "min"), None),
                    QuantitativeKind::MaxOnly => (None, number_key(value, "max")),
                    QuantitativeKind::OnlyNull | QuantitativeKind::OnlyNonNull => (None, None),
                };
                Ok(Self::NumericRange(NumericRangeFilter {
                    field_caption,
                    function,
                    kind,
                    min,
                    max,
                }))
            }
            "QUANTITATIVE_DATE" => {
                let field_caption = caption_of(value)?;
                let kind = quantitative_kind_of(value, &field_caption)?;
                let (min_date, max_date) = match kind {
                    QuantitativeKind::Range => (
                        date_key(value, "minDate")?,
                        date_key(value, "maxDate")?,
                    ),
                    QuantitativeKind::MinOnly => (date_key(value, "minDate")?, None),
                    QuantitativeKind::MaxOnly => (None, date_key(value, "maxDate")?),
                    QuantitativeKind::OnlyNull | QuantitativeKind::OnlyNonNull => (None, None),
                };
                Ok(Self::Date(DateFilter::Quantitative {
                    field_caption,
                    kind,
                    min_date,
                    max_date,
                }))
            }
            "DATE" => {
                let field_caption = caption_of(value)?;
                let period_raw = value
                    .get("periodType")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        TabvuError::MalformedResponse(format!(
                            "relative date filter on '{field_caption}' has no periodType"
                        ))
                    })?;
                let period_type = PeriodType::parse(period_raw).ok_or_else(|| {
                    TabvuError::MalformedResponse(format!("unknown periodType '{period_raw}'"))
                })?;
                let range_raw = value
                    .get("dateRangeType")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        TabvuError::MalformedResponse(format!(
                            "relative date filter on '{field_caption}' has no dateRangeType"
                        ))
                    })?;
                let range_type = DateRangeType::parse(range_raw).ok_or_else(|| {
                    TabvuError::MalformedResponse(format!("unknown dateRangeType '{range_raw}'"))
                })?;
                let range_n = if range_type.needs_n() {
                    let n = value.get("rangeN").and_then(Value::as_u64).ok_or_else(|| {
                        TabvuError::MalformedResponse(format!(
                            "{range_raw} filter on '{field_caption}' has no rangeN"
                        ))
                    })?;
                    Some(n as u32)
                } else {
                    None
                };
                Ok(Self::Date(DateFilter::Relative {
                    field_caption,
                    period_type,
                    range_type,
                    range_n,
                }))
            }
            other => Err(TabvuError::UnsupportedFilterKind(other.to_string())),
        }
    }

    /// Decodes a list of wire filters, skipping the ones this client
    /// cannot decode so one bad filter never sinks a saved query.
    pub fn from_wire_list(values: &[Value]) -> Vec<Self> {
        let mut filters = Vec::with_capacity(values.len());
        for value in values {
            match Self::from_wire(value) {
                Ok(filter) => filters.push(filter),
                Err(e) => {
                    let reason = e.to_string();
                    warn!("skipping filter that could not be decoded: {reason}");
                }
            }
        }
        filters
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

/// Serde hook for filter lists persisted in wire form: decodes what it
/// can, drops the rest with a warning.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<Filter>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<Value> = serde::Deserialize::deserialize(deserializer)?;
    Ok(Filter::from_wire_list(&raw))
}

fn caption_of(value: &Value) -> Result<String, TabvuError> {
    value
        .get("field")
        .and_then(|f| f.get("fieldCaption"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TabvuError::MalformedResponse("filter has no field.fieldCaption".into()))
}

fn quantitative_kind_of(value: &Value, caption: &str) -> Result<QuantitativeKind, TabvuError> {
    let raw = value
        .get("quantitativeFilterType")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            TabvuError::MalformedResponse(format!(
                "filter on '{caption}' has no quantitativeFilterType"
            ))
        })?;
    QuantitativeKind::parse(raw).ok_or_else(|| {
        TabvuError::MalformedResponse(format!("unknown quantitativeFilterType '{raw}'"))
    })
}

fn number_key(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn date_key(value: &Value, key: &str) -> Result<Option<NaiveDate>, TabvuError> {
    match value.get(key).and_then(Value::as_str) {
        None => Ok(None),
        Some(raw) => raw.parse::<NaiveDate>().map(Some).map_err(|_| {
            TabvuError::MalformedResponse(format!("'{raw}' is not a YYYY-MM-DD date"))
        }),
    }
}

fn check_bounds(
    kind: QuantitativeKind,
    has_min: bool,
    has_max: bool,
    caption: &str,
) -> Result<(), TabvuError> {
    let ok = match kind {
        QuantitativeKind::Range => true,
        QuantitativeKind::MinOnly => !has_max,
        QuantitativeKind::MaxOnly => !has_min,
        QuantitativeKind::OnlyNull | QuantitativeKind::OnlyNonNull => !has_min && !has_max,
    };
    if ok {
        Ok(())
    } else {
        Err(TabvuError::Validation(format!(
            "filter on '{caption}': {} does not take those bounds",
            kind.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorical(exclude: bool, values: &[&str]) -> Filter {
        Filter::Categorical(CategoricalFilter {
            field_caption: "Region".into(),
            exclude,
            values: values.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn round_trip(filter: &Filter) {
        let wire = filter.to_wire();
        let back = Filter::from_wire(&wire).expect("self-generated wire form must decode");
        assert_eq!(&back, filter);
        // and the JSON itself is a fixed point
        assert_eq!(back.to_wire(), wire);
    }

    #[test]
    fn test_categorical_round_trip() {
        round_trip(&categorical(false, &["East", "West"]));
        round_trip(&categorical(true, &["Unknown"]));
        round_trip(&categorical(false, &[])); // empty value set is legal
    }

    #[test]
    fn test_categorical_wire_shape() {
        let wire = categorical(false, &["East", "West"]).to_wire();
        assert_eq!(wire["filterType"], "SET");
        assert_eq!(wire["field"]["fieldCaption"], "Region");
        assert_eq!(wire["exclude"], false);
        assert_eq!(wire["values"], json!(["East", "West"]));
    }

    #[test]
    fn test_categorical_requires_string_or_boolean_field() {
        let sales = FieldRef::new("Sales", FieldType::Real);
        assert!(CategoricalFilter::for_field(&sales).is_err());
        let region = FieldRef::new("Region", FieldType::String);
        assert!(CategoricalFilter::for_field(&region).is_ok());
        let flag = FieldRef::new("Returned", FieldType::Boolean);
        assert!(CategoricalFilter::for_field(&flag).is_ok());
    }

    #[test]
    fn test_numeric_round_trip_all_kinds() {
        let base = |kind, min, max| {
            Filter::NumericRange(NumericRangeFilter {
                field_caption: "Sales".into(),
                function: Some(AggFn::Sum),
                kind,
                min,
                max,
            })
        };
        round_trip(&base(QuantitativeKind::Range, Some(1.0), Some(100.0)));
        round_trip(&base(QuantitativeKind::Range, None, Some(100.0)));
        round_trip(&base(QuantitativeKind::Range, None, None));
        round_trip(&base(QuantitativeKind::MinOnly, Some(5.0), None));
        round_trip(&base(QuantitativeKind::MaxOnly, None, Some(9.5)));
        round_trip(&base(QuantitativeKind::OnlyNull, None, None));
        round_trip(&base(QuantitativeKind::OnlyNonNull, None, None));
    }

    #[test]
    fn test_numeric_min_only_omits_max_key() {
        let filter = Filter::NumericRange(NumericRangeFilter {
            field_caption: "Sales".into(),
            function: None,
            kind: QuantitativeKind::MinOnly,
            min: Some(5.0),
            max: None,
        });
        let wire = filter.to_wire();
        assert_eq!(wire["min"], 5.0);
        let obj = wire.as_object().unwrap();
        assert!(!obj.contains_key("max"), "absent bound must omit the key");
        assert_eq!(wire["quantitativeFilterType"], "MIN");
    }

    #[test]
    fn test_numeric_without_function_omits_function_key() {
        let filter = Filter::NumericRange(NumericRangeFilter {
            field_caption: "Sales".into(),
            function: None,
            kind: QuantitativeKind::Range,
            min: Some(1.0),
            max: None,
        });
        let wire = filter.to_wire();
        assert!(!wire["field"].as_object().unwrap().contains_key("function"));
        round_trip(&filter);
    }

    #[test]
    fn test_quantitative_date_round_trip() {
        let date = |s: &str| s.parse::<NaiveDate>().unwrap();
        let base = |kind, min_date, max_date| {
            Filter::Date(DateFilter::Quantitative {
                field_caption: "Order Date".into(),
                kind,
                min_date,
                max_date,
            })
        };
        round_trip(&base(
            QuantitativeKind::Range,
            Some(date("2024-01-01")),
            Some(date("2024-12-31")),
        ));
        round_trip(&base(QuantitativeKind::MinOnly, Some(date("2024-01-01")), None));
        round_trip(&base(QuantitativeKind::MaxOnly, None, Some(date("2024-06-30"))));
        round_trip(&base(QuantitativeKind::OnlyNull, None, None));
        round_trip(&base(QuantitativeKind::OnlyNonNull, None, None));
    }

    #[test]
    fn test_quantitative_date_wire_uses_iso_dates() {
        let filter = Filter::Date(DateFilter::Quantitative {
            field_caption: "Order Date".into(),
            kind: QuantitativeKind::Range,
            min_date: Some("2024-01-05".parse().unwrap()),
            max_date: Some("2024-02-01".parse().unwrap()),
        });
        let wire = filter.to_wire();
        assert_eq!(wire["filterType"], "QUANTITATIVE_DATE");
        assert_eq!(wire["minDate"], "2024-01-05");
        assert_eq!(wire["maxDate"], "2024-02-01");
    }

    #[test]
    fn test_relative_date_round_trip() {
        let base = |range_type, range_n| {
            Filter::Date(DateFilter::Relative {
                field_caption: "Order Date".into(),
                period_type: PeriodType::Months,
                range_type,
                range_n,
            })
        };
        round_trip(&base(DateRangeType::Last, None));
        round_trip(&base(DateRangeType::Current, None));
        round_trip(&base(DateRangeType::Next, None));
        round_trip(&base(DateRangeType::ToDate, None));
        round_trip(&base(DateRangeType::LastN, Some(3)));
        round_trip(&base(DateRangeType::NextN, Some(12)));
    }

    #[test]
    fn test_relative_date_range_n_presence() {
        let with_n = Filter::Date(DateFilter::Relative {
            field_caption: "Order Date".into(),
            period_type: PeriodType::Days,
            range_type: DateRangeType::LastN,
            range_n: Some(30),
        });
        assert_eq!(with_n.to_wire()["rangeN"], 30);

        let without_n = Filter::Date(DateFilter::Relative {
            field_caption: "Order Date".into(),
            period_type: PeriodType::Days,
            range_type: DateRangeType::Last,
            range_n: None,
        });
        let obj = without_n.to_wire();
        assert!(!obj.as_object().unwrap().contains_key("rangeN"));

        // LASTN without a count is not decodable
        let broken = json!({
            "filterType": "DATE",
            "field": { "fieldCaption": "Order Date" },
            "periodType": "DAYS",
            "dateRangeType": "LASTN",
        });
        assert!(Filter::from_wire(&broken).is_err());
    }

    #[test]
    fn test_unknown_filter_type_is_unsupported() {
        let wire = json!({
            "filterType": "TOP_N",
            "field": { "fieldCaption": "Region" },
        });
        match Filter::from_wire(&wire) {
            Err(TabvuError::UnsupportedFilterKind(kind)) => assert_eq!(kind, "TOP_N"),
            other => panic!("expected UnsupportedFilterKind, got {other:?}"),
        }
    }

    #[test]
    fn test_from_wire_list_skips_bad_entries() {
        let wires = vec![
            categorical(false, &["East"]).to_wire(),
            json!({ "filterType": "TOP_N", "field": { "fieldCaption": "X" } }),
            json!({ "no": "filterType here" }),
            categorical(true, &["West"]).to_wire(),
        ];
        let filters = Filter::from_wire_list(&wires);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].field_caption(), "Region");
        assert_eq!(filters[1], categorical(true, &["West"]));
    }

    #[test]
    fn test_validate_rejects_misplaced_bounds() {
        let bad = Filter::NumericRange(NumericRangeFilter {
            field_caption: "Sales".into(),
            function: None,
            kind: QuantitativeKind::OnlyNull,
            min: Some(1.0),
            max: None,
        });
        assert!(bad.validate().is_err());

        let bad = Filter::Date(DateFilter::Relative {
            field_caption: "Order Date".into(),
            period_type: PeriodType::Years,
            range_type: DateRangeType::Current,
            range_n: Some(2),
        });
        assert!(bad.validate().is_err());
    }
}
