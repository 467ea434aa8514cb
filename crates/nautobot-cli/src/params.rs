//! Builds the engine's parameter structure from a file and flags.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use nautobot_reconcile::Parameters;
use serde_json::{Map, Value};

use crate::cli::ApplyArgs;

/// Reads the parameter file (if any) and applies the flag overrides.
pub fn load_parameters(args: &ApplyArgs) -> Result<Parameters> {
    let params = match args.params.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read parameters from stdin")?;
            parse_parameters(&buf, false)?
        }
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read parameter file: {path}"))?;
            parse_parameters(&content, is_toml(path))
                .with_context(|| format!("Invalid parameter file: {path}"))?
        }
        None => Parameters::default(),
    };
    apply_overrides(params, args)
}

pub fn is_toml(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Accepts either the full `{data, state, check_mode, query_params}` shape or
/// a bare attribute mapping.
pub fn parse_parameters(content: &str, toml: bool) -> Result<Parameters> {
    let value: Value = if toml {
        let table: toml::Table = toml::from_str(content).context("Invalid TOML")?;
        serde_json::to_value(table)?
    } else {
        serde_json::from_str(content).context("Invalid JSON")?
    };
    match value {
        Value::Object(map) if map.contains_key("data") => {
            serde_json::from_value(Value::Object(map)).context("Invalid parameter structure")
        }
        Value::Object(data) => Ok(Parameters {
            data,
            ..Parameters::default()
        }),
        _ => anyhow::bail!("Parameters must be a JSON object"),
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .with_context(|| format!("Expected KEY=VALUE, got \"{pair}\""))
}

/// JSON when it parses, a string otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Reference flags accept a JSON filter object; anything else is a name or id.
fn parse_reference(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::String(raw.to_string()),
    }
}

pub fn apply_overrides(mut params: Parameters, args: &ApplyArgs) -> Result<Parameters> {
    let data = &mut params.data;
    if let Some(name) = &args.name {
        data.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(tenant) = &args.tenant {
        data.insert("tenant".into(), parse_reference(tenant));
    }
    if let Some(description) = &args.description {
        data.insert("description".into(), Value::String(description.clone()));
    }
    if !args.tags.is_empty() {
        let tags = args.tags.iter().map(|t| parse_reference(t)).collect();
        data.insert("tags".into(), Value::Array(tags));
    }
    if !args.custom_fields.is_empty() {
        let mut fields = match data.remove("custom_fields") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for pair in &args.custom_fields {
            let (key, value) = split_pair(pair)?;
            fields.insert(key.to_string(), parse_value(value));
        }
        data.insert("custom_fields".into(), Value::Object(fields));
    }
    for pair in &args.set {
        let (key, value) = split_pair(pair)?;
        data.insert(key.to_string(), parse_value(value));
    }

    if let Some(state) = args.state {
        params.state = state.into();
    }
    if args.check {
        params.check_mode = true;
    }
    if !args.query_params.is_empty() {
        params.query_params = Some(args.query_params.clone());
    }
    Ok(params)
}
