//! Response rendering
//!
//! Turns JSON responses into tables, detail views, JSON, YAML or CSV.
//! Columns pick values out of records with dotted paths such as
//! `account.name`; timestamps are shown in UTC.

use std::io::Write;

use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde_json::Value;

use crate::ansi;
use crate::api::{Body, RequestSpec};
use crate::error::Result;

/// Output format chosen by `--json`, `--yaml` or `--csv`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Table,
    Json,
    Yaml,
    Csv,
}

/// A labelled value in a table row or detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub label: &'static str,
    pub path: &'static str,
}

pub const fn col(label: &'static str, path: &'static str) -> Column {
    Column { label, path }
}

/// Follow a dotted path into `value`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Display text for one cell
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => format_timestamp(s).unwrap_or_else(|| s.clone()),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell_text(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Object(map)) => match map.get("name") {
            Some(name) => cell_text(Some(name)),
            None => Value::Object(map.clone()).to_string(),
        },
    }
}

fn format_timestamp(text: &str) -> Option<String> {
    // Cheap filter before trying a full parse
    if text.len() < 20 || text.as_bytes()[4] != b'-' {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Print a whole value as JSON or YAML
pub fn print_structured(out: &mut dyn Write, value: &Value, format: Format) -> Result<()> {
    match format {
        Format::Yaml => write!(out, "{}", serde_yaml::to_string(value)?)?,
        _ => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
    }
    Ok(())
}

/// Print a section title, e.g. `Morpheus Certificates`
pub fn print_title(out: &mut dyn Write, title: &str, coloring: bool) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", ansi::paint(title, ansi::Color::Cyan, coloring))?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))?;
    writeln!(out)?;
    Ok(())
}

/// Print records as a table
pub fn print_table(
    out: &mut dyn Write,
    rows: &[Value],
    columns: &[Column],
    coloring: bool,
) -> Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if !coloring {
        table.force_no_tty();
    }

    table.set_header(columns.iter().map(|c| {
        let cell = Cell::new(c.label);
        if coloring {
            cell.fg(Color::White)
        } else {
            cell
        }
    }));

    for row in rows {
        table.add_row(columns.iter().map(|c| Cell::new(cell_text(lookup(row, c.path)))));
    }

    writeln!(out, "{}", table)?;
    Ok(())
}

/// Print records as CSV with a header row
pub fn print_csv(out: &mut dyn Write, rows: &[Value], columns: &[Column]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|c| c.label))?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell_text(lookup(row, c.path))))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::Error::Other(e.to_string()))?;
    out.write_all(&bytes)?;
    Ok(())
}

/// Print one record as aligned `Label: value` lines
pub fn print_detail(out: &mut dyn Write, record: &Value, columns: &[Column]) -> Result<()> {
    let width = columns.iter().map(|c| c.label.len()).max().unwrap_or(0);
    for column in columns {
        writeln!(
            out,
            "{:>width$}: {}",
            column.label,
            cell_text(lookup(record, column.path)),
            width = width
        )?;
    }
    Ok(())
}

/// Print a list response in the requested format.
///
/// Table output gets a `Morpheus <label>` title and a `Viewing x-y of N`
/// footer; JSON and YAML print the whole response.
pub fn print_list(
    out: &mut dyn Write,
    response: &Value,
    rows: &[Value],
    columns: &[Column],
    format: Format,
    label: &str,
    coloring: bool,
) -> Result<()> {
    match format {
        Format::Json | Format::Yaml => print_structured(out, response, format),
        Format::Csv => print_csv(out, rows, columns),
        Format::Table => {
            print_title(out, &format!("Morpheus {}", label), coloring)?;
            if rows.is_empty() {
                writeln!(out, "No {} found.", label.to_lowercase())?;
                return Ok(());
            }
            print_table(out, rows, columns, coloring)?;
            let offset = lookup(response, "meta.offset")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize;
            let total = lookup(response, "meta.total")
                .and_then(Value::as_u64)
                .map(|t| t as usize)
                .unwrap_or(rows.len() + offset);
            writeln!(out, "{}", page_footer(offset, rows.len(), total))?;
            Ok(())
        }
    }
}

/// `Viewing 1-25 of 100`
pub fn page_footer(offset: usize, shown: usize, total: usize) -> String {
    if shown == 0 {
        return format!("Viewing 0 of {}", total);
    }
    format!("Viewing {}-{} of {}", offset + 1, offset + shown, total)
}

/// Print a request that `--dry-run` kept from being sent
pub fn print_dry_run(
    out: &mut dyn Write,
    request: &RequestSpec,
    format: Format,
    coloring: bool,
) -> Result<()> {
    if format == Format::Json {
        let body = match &request.body {
            Body::Json(value) => value.clone(),
            Body::Bytes { data, .. } => Value::String(format!("<{} bytes>", data.len())),
            Body::Empty => Value::Null,
        };
        let value = serde_json::json!({
            "method": request.method.as_str(),
            "url": request.display_url(),
            "body": body,
        });
        return print_structured(out, &value, Format::Json);
    }

    writeln!(out, "{}", ansi::paint("DRY RUN", ansi::Color::Yellow, coloring))?;
    writeln!(out, "{} {}", request.method, request.display_url())?;
    match &request.body {
        Body::Json(value) => {
            writeln!(out, "JSON:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
        }
        Body::Bytes { content_type, data } => {
            writeln!(out, "Body: {} bytes ({})", data.len(), content_type)?;
        }
        Body::Empty => {}
    }
    Ok(())
}
