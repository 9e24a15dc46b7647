//! Progress export documents (JSON and CSV) with their download file names.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use chrono::SecondsFormat;
use hub_core::Clock;
use hub_core::model::{Category, Curriculum, ProgressRecord, User};
use serde::Serialize;

use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    intern: &'a str,
    email: &'a str,
    cohort: &'a str,
    category: Category,
    export_date: String,
    progress_percent: u8,
    completed_tasks: &'a [bool],
    task_notes: &'a BTreeMap<usize, String>,
}

/// A rendered export ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressExport {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Render one category's progress for the given user.
///
/// # Errors
///
/// Returns `ExportError::Json` if the JSON document cannot be serialized.
pub fn export_progress(
    user: &User,
    record: &ProgressRecord,
    format: ExportFormat,
    clock: &Clock,
) -> Result<ProgressExport, ExportError> {
    let body = match format {
        ExportFormat::Json => to_json(user, record, clock)?,
        ExportFormat::Csv => to_csv(user, record, clock),
    };
    Ok(ProgressExport {
        file_name: file_name(user.display_name(), format, clock),
        content_type: format.content_type(),
        body,
    })
}

fn to_json(user: &User, record: &ProgressRecord, clock: &Clock) -> Result<String, ExportError> {
    let document = ExportDocument {
        intern: user.display_name(),
        email: &user.email,
        cohort: record.cohort(),
        category: record.category(),
        export_date: clock.now().to_rfc3339_opts(SecondsFormat::Millis, true),
        progress_percent: record.percent(),
        completed_tasks: record.completed_tasks(),
        task_notes: record.task_notes(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

fn to_csv(user: &User, record: &ProgressRecord, clock: &Clock) -> String {
    let curriculum = Curriculum::for_category(record.category());
    let mut csv = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(csv, "{} Progress Report", curriculum.title);
    let _ = writeln!(csv, "{}", csv_cell(&format!("Intern: {}", user.display_name())));
    let _ = writeln!(csv, "{}", csv_cell(&format!("Email: {}", user.email)));
    let _ = writeln!(csv, "{}", csv_cell(&format!("Cohort: {}", record.cohort())));
    let _ = writeln!(csv, "Date: {}", clock.report_stamp());
    let _ = writeln!(csv, "Progress: {}%", record.percent());
    csv.push('\n');
    csv.push_str("Task Number,Status\n");
    for (index, done) in record.completed_tasks().iter().enumerate() {
        let status = if *done { "COMPLETED" } else { "PENDING" };
        let _ = writeln!(csv, "Day {},\"{status}\"", index + 1);
    }
    csv
}

/// One CSV field, quoted with inner quotes doubled when it holds a comma,
/// a quote or a line break.
fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `progress_<intern>_<YYYY-MM-DD>.<ext>`, with path separators and
/// whitespace in the name replaced by underscores.
#[must_use]
pub fn file_name(intern: &str, format: ExportFormat, clock: &Clock) -> String {
    let safe: String = intern
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '/' | '\\' | ':') {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!(
        "progress_{safe}_{}.{}",
        clock.date_stamp(),
        format.extension()
    )
}
