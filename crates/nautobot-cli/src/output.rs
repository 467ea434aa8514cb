use colored::Colorize;
use nautobot_reconcile::{Outcome, Registry};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_pretty(value)),
        OutputFormat::Table => print_as_table(value),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn to_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_as_table(value: &Value) {
    let Some(map) = value.as_object() else {
        println!("{}", cell(value));
        return;
    };
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, field) in map {
        builder.push_record([key.clone(), cell(field)]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

pub fn print_outcome(outcome: &Outcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_pretty(&outcome.to_output())),
        OutputFormat::Table => print_outcome_table(outcome),
    }
}

fn print_outcome_table(outcome: &Outcome) {
    let status = if outcome.changed {
        "changed".yellow()
    } else {
        "ok".green()
    };
    let suffix = if outcome.dry_run { " (check mode)" } else { "" };
    println!("{status}: {}{suffix}", outcome.message);

    if let Some(object) = &outcome.object {
        print_as_table(object);
    }
    if !outcome.changes.is_empty() && !outcome.changes.is_creation() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Before", "After"]);
        for (name, change) in outcome.changes.iter() {
            builder.push_record([name.clone(), cell(&change.before), cell(&change.after)]);
        }
        println!("{}", builder.build().with(Style::rounded()));
    }
}

pub fn print_kinds(registry: &Registry, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let specs: Vec<Value> = registry
                .iter()
                .filter_map(|spec| serde_json::to_value(spec).ok())
                .collect();
            println!("{}", to_pretty(&Value::Array(specs)));
        }
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Kind", "Endpoint", "Natural key", "Attributes"]);
            for spec in registry.iter() {
                let attributes: Vec<String> = spec
                    .attributes
                    .iter()
                    .map(|a| {
                        let required = if a.required { "*" } else { "" };
                        format!("{}{required} ({})", a.name, a.kind.label())
                    })
                    .collect();
                builder.push_record([
                    spec.name.clone(),
                    spec.endpoint.clone(),
                    spec.natural_key.join(", "),
                    attributes.join("\n"),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
}
