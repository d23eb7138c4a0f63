use crate::TabvuError;
use crate::filter::Filter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One row of a query result, keyed by field caption.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A datasource as listed by the REST API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Datasource {
    pub name: String,
    pub luid: String,
}

/// Whether a field groups rows or must be aggregated when queried.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Dimension,
    Measure,
}

/// Field data types this client understands. Metadata rows with other
/// types are skipped during discovery.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Date,
    Boolean,
    Integer,
    Real,
}

impl FieldType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "STRING" => Some(Self::String),
            "DATE" => Some(Self::Date),
            "BOOLEAN" => Some(Self::Boolean),
            "INTEGER" => Some(Self::Integer),
            "REAL" => Some(Self::Real),
            _ => None,
        }
    }

    /// String, date and boolean fields group rows; integer and real
    /// fields are quantities that must be aggregated.
    pub fn kind(self) -> FieldKind {
        match self {
            Self::String | Self::Date | Self::Boolean => FieldKind::Dimension,
            Self::Integer | Self::Real => FieldKind::Measure,
        }
    }
}

/// A queryable field, as reported by datasource metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub name: String,
    pub kind: FieldKind,
    pub data_type: FieldType,
}

impl FieldRef {
    pub fn new(name: impl Into<String>, data_type: FieldType) -> Self {
        Self {
            name: name.into(),
            kind: data_type.kind(),
            data_type,
        }
    }
}

/// Aggregation functions the query service accepts for measures.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggFn {
    Sum,
    Min,
    Max,
    Avg,
    Count,
}

impl AggFn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SUM" => Some(Self::Sum),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            "AVG" => Some(Self::Avg),
            "COUNT" => Some(Self::Count),
            _ => None,
        }
    }
}

impl fmt::Display for AggFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A measure paired with its aggregation function. Dimensions never
/// carry one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AggregatedField {
    pub field: FieldRef,
    pub function: AggFn,
}

/// A named, persistable query: datasource plus the selected dimensions,
/// aggregated measures and filters. Dimension order is display order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryDefinition {
    pub name: String,
    pub datasource_luid: String,
    pub datasource_name: String,
    pub dimensions: Vec<FieldRef>,
    pub measures: Vec<AggregatedField>,
    /// Persisted in wire form. Filters this client cannot decode are
    /// skipped with a warning on load, keeping the rest of the query.
    #[serde(default, deserialize_with = "crate::filter::deserialize_lenient")]
    pub filters: Vec<Filter>,
    pub saved_at: DateTime<Utc>,
}

/// Hour and minute a schedule fires at, local time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn validate(self) -> Result<(), TabvuError> {
        if self.hour > 23 || self.minute > 59 {
            return Err(TabvuError::Validation(format!(
                "invalid time of day {:02}:{:02}",
                self.hour, self.minute
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Recurrence rule for a schedule. Weekdays are numbered from Monday = 0,
/// matching the order users pick them in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "frequency")]
pub enum Cadence {
    Daily,
    Weekly { day_of_week: u8 },
    Monthly { day_of_month: u8 },
}

impl Cadence {
    pub fn validate(self) -> Result<(), TabvuError> {
        match self {
            Self::Daily => Ok(()),
            Self::Weekly { day_of_week } if day_of_week > 6 => Err(TabvuError::Validation(
                format!("day_of_week must be 0-6, got {day_of_week}"),
            )),
            Self::Weekly { .. } => Ok(()),
            Self::Monthly { day_of_month } if !(1..=31).contains(&day_of_month) => Err(
                TabvuError::Validation(format!("day_of_month must be 1-31, got {day_of_month}")),
            ),
            Self::Monthly { .. } => Ok(()),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WEEKDAYS: [&str; 7] = [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ];
        match self {
            Self::Daily => f.write_str("every day"),
            Self::Weekly { day_of_week } => {
                let day = WEEKDAYS
                    .get(*day_of_week as usize)
                    .copied()
                    .unwrap_or("an invalid weekday");
                write!(f, "every {day}")
            }
            Self::Monthly { day_of_month } => {
                write!(f, "on day {day_of_month} of each month")
            }
        }
    }
}

/// A recurring export job: an owned snapshot of a query definition, a
/// cadence, and where the CSV goes. The snapshot is detached from any
/// live selection; editing a query after scheduling never changes
/// already-scheduled runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Schedule {
    pub name: String,
    pub query: QueryDefinition,
    pub cadence: Cadence,
    pub time: TimeOfDay,
    pub output_dir: PathBuf,
    /// Free text with `{name}`, `{date}` and `{time}` placeholders.
    pub output_pattern: String,
}

impl Schedule {
    /// Checks the fields a schedule needs before it can be persisted or
    /// turned into a live trigger.
    pub fn validate(&self) -> Result<(), TabvuError> {
        if self.name.trim().is_empty() {
            return Err(TabvuError::Validation("schedule name is empty".into()));
        }
        if self.output_pattern.trim().is_empty() {
            return Err(TabvuError::Validation("output pattern is empty".into()));
        }
        self.cadence.validate()?;
        self.time.validate()?;
        Ok(())
    }
}
