//! Tabular and structured data conversions (csv, json, xml, xlsx).
//!
//! All codecs here are compiled in (`csv`, `serde_json`, `quick-xml`,
//! `calamine`), so the capability set is static. xlsx is input-only: reading
//! goes through calamine, and no spreadsheet writer is carried.

use crate::backend::{require_input, write_cleanly, Backend, BackendError, ConvertTask};
use alembic_common::{BackendFamily, Capability};
use calamine::Reader;
use quick_xml::events::Event;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Backend for structured data conversions.
pub struct DataBackend {
    caps: Capability,
}

impl DataBackend {
    pub fn probe() -> Self {
        Self {
            caps: Capability::of(
                BackendFamily::Data,
                &["csv", "json", "xml", "xlsx"],
                &["csv", "json", "txt"],
            ),
        }
    }
}

impl Backend for DataBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Data
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        require_input(task.input)?;

        let source = task.source_format.as_str();
        let target = task.target_format.as_str();

        write_cleanly(task.output, || match (source, target) {
            ("csv", "json") => csv_to_json(task.input, task.output),
            ("csv", "txt") => csv_to_txt(task.input, task.output),
            ("json", "csv") => json_to_csv(task.input, task.output),
            ("json", "txt") => json_to_txt(task.input, task.output),
            ("xml", "json") => xml_to_json(task.input, task.output),
            ("xml", "txt") => xml_to_txt(task.input, task.output),
            ("xlsx", "csv") => xlsx_to_csv(task.input, task.output),
            ("xlsx", "json") => xlsx_to_json(task.input, task.output),
            ("xlsx", "txt") => xlsx_to_txt(task.input, task.output),
            _ => Err(BackendError::new(format!(
                "unsupported data conversion: {source} -> {target}"
            ))),
        })
    }
}

fn csv_to_json(input: &Path, output: &Path) -> Result<(), BackendError> {
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut obj = Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            obj.insert(header.to_string(), Value::String(value.to_string()));
        }
        rows.push(Value::Object(obj));
    }

    let file = fs::File::create(output)?;
    serde_json::to_writer_pretty(file, &Value::Array(rows))?;
    Ok(())
}

fn csv_to_txt(input: &Path, output: &Path) -> Result<(), BackendError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(input)?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        lines.push(record.iter().collect::<Vec<_>>().join("\t"));
    }
    fs::write(output, lines.join("\n"))?;
    Ok(())
}

fn json_to_csv(input: &Path, output: &Path) -> Result<(), BackendError> {
    let value: Value = serde_json::from_reader(fs::File::open(input)?)?;
    let rows = value
        .as_array()
        .filter(|rows| rows.iter().all(|r| r.is_object()))
        .ok_or_else(|| BackendError::new("JSON structure not suitable for CSV conversion"))?;

    let first = rows
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| BackendError::new("JSON array is empty"))?;
    let headers: Vec<String> = first.keys().cloned().collect();

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&headers)?;
    for row in rows {
        let Some(obj) = row.as_object() else {
            continue;
        };
        let record: Vec<String> = headers
            .iter()
            .map(|h| obj.get(h).map(json_cell).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn json_to_txt(input: &Path, output: &Path) -> Result<(), BackendError> {
    let value: Value = serde_json::from_reader(fs::File::open(input)?)?;
    fs::write(output, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Extract the text content of an XML document, one line per text node.
fn xml_to_txt(input: &Path, output: &Path) -> Result<(), BackendError> {
    let xml = fs::read_to_string(input)?;
    let mut reader = quick_xml::Reader::from_str(&xml);

    let mut lines = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| BackendError::new(format!("xml escape error: {e}")))?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    fs::write(output, lines.join("\n"))?;
    Ok(())
}

/// Map an XML element tree onto JSON objects.
///
/// Leaf elements become strings, repeated sibling names become arrays.
/// Attributes are not carried over.
fn xml_to_json(input: &Path, output: &Path) -> Result<(), BackendError> {
    let xml = fs::read_to_string(input)?;
    let mut reader = quick_xml::Reader::from_str(&xml);

    // Stack of open elements: (name, children, accumulated text).
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push((name, Map::new(), String::new()));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.1, name, Value::String(String::new())),
                    None => {
                        let mut obj = Map::new();
                        obj.insert(name, Value::String(String::new()));
                        root = Some(Value::Object(obj));
                    }
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| BackendError::new(format!("xml escape error: {e}")))?;
                    top.2.push_str(&text);
                }
            }
            Event::End(_) => {
                let (name, children, text) = stack
                    .pop()
                    .ok_or_else(|| BackendError::new("malformed XML: unbalanced end tag"))?;
                let value = if children.is_empty() {
                    Value::String(text.trim().to_string())
                } else {
                    Value::Object(children)
                };
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.1, name, value),
                    None => {
                        let mut obj = Map::new();
                        obj.insert(name, value);
                        root = Some(Value::Object(obj));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let root = root.ok_or_else(|| BackendError::new("XML document has no root element"))?;
    let file = fs::File::create(output)?;
    serde_json::to_writer_pretty(file, &root)?;
    Ok(())
}

fn insert_child(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// First worksheet of an xlsx workbook as rows of strings.
fn read_sheet(input: &Path) -> Result<Vec<Vec<String>>, BackendError> {
    let mut workbook = calamine::open_workbook_auto(input)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| BackendError::new("workbook has no sheets"))??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn xlsx_to_csv(input: &Path, output: &Path) -> Result<(), BackendError> {
    let rows = read_sheet(input)?;
    let mut writer = csv::Writer::from_path(output)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn xlsx_to_json(input: &Path, output: &Path) -> Result<(), BackendError> {
    let rows = read_sheet(input)?;
    let mut iter = rows.into_iter();
    let headers = iter
        .next()
        .ok_or_else(|| BackendError::new("worksheet is empty"))?;

    let records: Vec<Value> = iter
        .map(|row| {
            let mut obj = Map::new();
            for (header, value) in headers.iter().zip(row.into_iter()) {
                obj.insert(header.clone(), Value::String(value));
            }
            Value::Object(obj)
        })
        .collect();

    let file = fs::File::create(output)?;
    serde_json::to_writer_pretty(file, &Value::Array(records))?;
    Ok(())
}

fn xlsx_to_txt(input: &Path, output: &Path) -> Result<(), BackendError> {
    let rows = read_sheet(input)?;
    let lines: Vec<String> = rows.into_iter().map(|row| row.join("\t")).collect();
    fs::write(output, lines.join("\n"))?;
    Ok(())
}
