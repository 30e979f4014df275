//! Shared command flags
//!
//! Commands compose these `clap` argument groups into their own parsed
//! flag structs. Request payloads are kept apart from typed flags: the
//! `--payload` JSON and `-O key=value` pairs form a string-keyed map that
//! is merged into the request body only when the request is built.

use clap::{Args, ValueEnum};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::render::Format;

/// Output format and verbosity
#[derive(Debug, Clone, Default, Args)]
pub struct OutputOptions {
    /// Print the response as JSON
    #[arg(long, conflicts_with_all = ["yaml", "csv"])]
    pub json: bool,

    /// Print the response as YAML
    #[arg(long, conflicts_with = "csv")]
    pub yaml: bool,

    /// Print rows as CSV
    #[arg(long)]
    pub csv: bool,

    /// No output on success
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl OutputOptions {
    pub fn format(&self) -> Format {
        if self.json {
            Format::Json
        } else if self.yaml {
            Format::Yaml
        } else if self.csv {
            Format::Csv
        } else {
            Format::Table
        }
    }
}

/// Which appliance to talk to, and whether to actually send requests
#[derive(Debug, Clone, Default, Args)]
pub struct RemoteOptions {
    /// Use this remote instead of the active one
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Print the request instead of sending it
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
}

/// Skip confirmation on destructive commands
#[derive(Debug, Clone, Default, Args)]
pub struct ConfirmOptions {
    /// Do not ask for confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Paging and filtering for list commands
#[derive(Debug, Clone, Args)]
pub struct ListOptions {
    /// Maximum records to return
    #[arg(short = 'm', long, default_value_t = 25)]
    pub max: usize,

    /// Records to skip
    #[arg(short = 'o', long, default_value_t = 0)]
    pub offset: usize,

    /// Filter by name or text
    #[arg(short = 's', long, value_name = "TEXT")]
    pub phrase: Option<String>,

    /// Sort by this field
    #[arg(long, value_name = "FIELD")]
    pub sort: Option<String>,

    /// Sort direction
    #[arg(long, value_enum)]
    pub direction: Option<SortDirection>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max: 25,
            offset: 0,
            phrase: None,
            sort: None,
            direction: None,
        }
    }
}

impl ListOptions {
    /// Query parameters for a list request
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("max".to_string(), self.max.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        if let Some(phrase) = &self.phrase {
            query.push(("phrase".to_string(), phrase.clone()));
        }
        if let Some(sort) = &self.sort {
            query.push(("sort".to_string(), sort.clone()));
        }
        if let Some(direction) = self.direction {
            query.push(("direction".to_string(), direction.as_str().to_string()));
        }
        query
    }
}

/// Raw request body overrides for create and update commands
#[derive(Debug, Clone, Default, Args)]
pub struct PayloadOptions {
    /// JSON object used as the request body
    #[arg(long, value_name = "JSON")]
    pub payload: Option<String>,

    /// Set a body field, dotted keys nest (`-O config.path=/data`)
    #[arg(short = 'O', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

impl PayloadOptions {
    /// The string-keyed payload map: `--payload` first, then each `-O`
    pub fn payload_map(&self) -> Result<Map<String, Value>> {
        let mut map = match &self.payload {
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(Error::Usage(
                        "--payload must be a JSON object".to_string(),
                    ))
                }
                Err(e) => return Err(Error::Usage(format!("Invalid --payload JSON: {}", e))),
            },
            None => Map::new(),
        };

        for option in &self.options {
            let (key, value) = option.split_once('=').ok_or_else(|| {
                Error::Usage(format!("Invalid option '{}', expected KEY=VALUE", option))
            })?;
            if key.is_empty() {
                return Err(Error::Usage(format!("Invalid option '{}', empty key", option)));
            }
            set_path(&mut map, key, Value::String(value.to_string()));
        }

        Ok(map)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none() && self.options.is_empty()
    }
}

/// Build a request body `{wrapper: {...}}` from typed flag values and the
/// payload map. Payload entries win; a payload that is itself wrapped in
/// `wrapper` is unwrapped first.
pub fn build(wrapper: &str, typed: Map<String, Value>, mut payload: Map<String, Value>) -> Value {
    if payload.len() == 1 {
        if let Some(Value::Object(inner)) = payload.get(wrapper) {
            payload = inner.clone();
        }
    }

    let mut record = typed;
    merge(&mut record, payload);

    let mut body = Map::new();
    body.insert(wrapper.to_string(), Value::Object(record));
    Value::Object(body)
}

fn merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}

fn set_path(map: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
}
