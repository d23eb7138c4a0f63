//! Execution and export: run a query definition through the gateway
//! and write its records to a CSV file.
//!
//! Re-entrant by construction: concurrent invocations share nothing
//! mutable but the credential cache, so coincident schedule fires never
//! block one another.

use crate::TabvuError;
use crate::client::QueryGateway;
use crate::model::{QueryDefinition, Record, Schedule};
use crate::request::{self, BuildWarning};
use crate::scheduler::ScheduleRunner;
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use diagnostics::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Terminal states of one execute-and-export run. An empty result set
/// is a success that writes nothing, not an error.
#[derive(Debug)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    NoResults,
}

/// Runs resolved query definitions and exports their results.
pub struct ExecutionPipeline {
    gateway: Arc<dyn QueryGateway>,
}

impl ExecutionPipeline {
    pub fn new(gateway: Arc<dyn QueryGateway>) -> Self {
        Self { gateway }
    }

    /// Build the payload for a definition and run it, returning the raw
    /// records.
    pub async fn execute(&self, definition: &QueryDefinition) -> Result<Vec<Record>, TabvuError> {
        let request = request::from_definition(definition)?;
        for warning in &request.warnings {
            match warning {
                BuildWarning::TooManyDimensions { selected } => {
                    let selected = *selected;
                    warn!("query selects {selected} dimensions, truncated to the first 10");
                }
            }
        }
        self.gateway.query_datasource(&request).await
    }

    /// Run a definition and write its records to a CSV file named from
    /// `pattern` inside `output_dir`. Writes the complete file or
    /// nothing: the CSV is built in memory and lands via a rename.
    pub async fn execute_and_export(
        &self,
        definition: &QueryDefinition,
        run_name: &str,
        output_dir: &Path,
        pattern: &str,
    ) -> Result<ExportOutcome, TabvuError> {
        let records = self.execute(definition).await?;
        if records.is_empty() {
            return Ok(ExportOutcome::NoResults);
        }

        let filename = render_output_filename(pattern, run_name, Local::now().naive_local());
        let path = output_dir.join(filename);
        let bytes = records_to_csv(&records)?;

        let staging = path.with_extension("csv.partial");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, &path).await?;

        Ok(ExportOutcome::Written {
            path,
            rows: records.len(),
        })
    }
}

#[async_trait]
impl ScheduleRunner for ExecutionPipeline {
    async fn run(&self, schedule: &Schedule) -> Result<ExportOutcome, TabvuError> {
        self.execute_and_export(
            &schedule.query,
            &schedule.name,
            &schedule.output_dir,
            &schedule.output_pattern,
        )
        .await
    }
}

/// Substitute `{name}`, `{date}` (`YYYY-MM-DD`) and `{time}`
/// (`HH-MM-SS`) into a filename pattern, forcing a `.csv` suffix when
/// the pattern lacks one.
pub fn render_output_filename(pattern: &str, name: &str, now: NaiveDateTime) -> String {
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H-%M-%S").to_string();
    let mut filename = pattern
        .replace("{name}", name)
        .replace("{date}", &date)
        .replace("{time}", &time);
    if !filename.to_lowercase().ends_with(".csv") {
        filename.push_str(".csv");
    }
    filename
}

/// Render records as CSV bytes: header row from the first record's
/// keys, one row per record, every value stringified, nulls empty.
pub fn records_to_csv(records: &[Record]) -> Result<Vec<u8>, TabvuError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = first.keys().cloned().collect();

    let fields: Vec<Field> = columns
        .iter()
        .map(|column| Field::new(column.as_str(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for column in &columns {
        let cells: Vec<Option<String>> = records
            .iter()
            .map(|record| match record.get(column) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect();
        arrays.push(Arc::new(StringArray::from(cells)) as ArrayRef);
    }

    let batch = RecordBatch::try_new(schema, arrays)?;
    let mut buffer = Vec::new();
    {
        let mut writer = arrow_csv::WriterBuilder::new()
            .with_header(true)
            .build(&mut buffer);
        writer.write(&batch)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::QueryRequest;
    use chrono::Utc;
    use serde_json::json;

    fn fixed_now() -> NaiveDateTime {
        "2024-01-15T10:30:45".parse().unwrap()
    }

    #[test]
    fn test_filename_substitution() {
        assert_eq!(
            render_output_filename("{name}_{date}.csv", "Sales", fixed_now()),
            "Sales_2024-01-15.csv"
        );
        assert_eq!(
            render_output_filename("{name}_{date}_{time}.csv", "Sales", fixed_now()),
            "Sales_2024-01-15_10-30-45.csv"
        );
    }

    #[test]
    fn test_filename_forces_csv_suffix() {
        assert_eq!(
            render_output_filename("report_{date}", "x", fixed_now()),
            "report_2024-01-15.csv"
        );
        // an existing suffix is kept, whatever its case
        assert_eq!(
            render_output_filename("REPORT.CSV", "x", fixed_now()),
            "REPORT.CSV"
        );
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_records_to_csv_stringifies_everything() {
        let records = vec![
            record(&[("Region", json!("East")), ("Sales", json!(100.5))]),
            record(&[("Region", json!(null)), ("Sales", json!(7))]),
        ];
        let bytes = records_to_csv(&records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Region,Sales"));
        assert_eq!(lines.next(), Some("East,100.5"));
        assert_eq!(lines.next(), Some(",7"));
        assert_eq!(lines.next(), None);
    }

    struct FixedGateway {
        records: Vec<Record>,
    }

    #[async_trait]
    impl QueryGateway for FixedGateway {
        async fn query_datasource(
            &self,
            _request: &QueryRequest,
        ) -> Result<Vec<Record>, TabvuError> {
            Ok(self.records.clone())
        }
    }

    fn definition() -> QueryDefinition {
        QueryDefinition {
            name: "Sales".into(),
            datasource_luid: "luid-1".into(),
            datasource_name: "Superstore".into(),
            dimensions: vec![],
            measures: vec![],
            filters: vec![],
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_export_writes_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FixedGateway {
            records: vec![record(&[("Region", json!("East"))])],
        });
        let pipeline = ExecutionPipeline::new(gateway);

        let outcome = pipeline
            .execute_and_export(&definition(), "Sales", dir.path(), "{name}_{date}.csv")
            .await
            .unwrap();

        match outcome {
            ExportOutcome::Written { path, rows } => {
                assert_eq!(rows, 1);
                let text = std::fs::read_to_string(&path).unwrap();
                assert!(text.starts_with("Region\n"));
                assert!(text.contains("East"));
            }
            other => panic!("expected a written file, got {other:?}"),
        }
        // no staging leftovers
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FixedGateway { records: vec![] });
        let pipeline = ExecutionPipeline::new(gateway);

        let outcome = pipeline
            .execute_and_export(&definition(), "Sales", dir.path(), "{name}.csv")
            .await
            .unwrap();

        assert!(matches!(outcome, ExportOutcome::NoResults));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
