use std::fs;

use anyhow::{Context, Result};
use nautobot_reconcile::{Reconciler, Registry, ResourceSpec, Transport};
use serde_json::json;

use crate::cli::{ApplyArgs, OutputFormat};
use crate::output::{print_outcome, print_value};
use crate::params::{is_toml, load_parameters};

pub fn load_schema(path: &str) -> Result<ResourceSpec> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read schema file: {path}"))?;
    let spec = if is_toml(path) {
        ResourceSpec::from_toml_str(&content)
    } else {
        ResourceSpec::from_json_str(&content)
    };
    spec.with_context(|| format!("Invalid schema file: {path}"))
}

/// Built-in kinds plus the kind defined by `schema`, which replaces a
/// built-in kind of the same name.
pub fn registry_with_schema(schema: Option<&str>) -> Result<Registry> {
    let mut registry = Registry::builtin();
    if let Some(path) = schema {
        registry.register(load_schema(path)?)?;
    }
    Ok(registry)
}

pub async fn run(transport: &dyn Transport, args: &ApplyArgs, format: OutputFormat) -> Result<()> {
    let registry = registry_with_schema(args.schema.as_deref())?;
    let spec = registry.get(&args.kind).with_context(|| {
        format!(
            "Unknown resource kind {}. Known kinds: {}",
            args.kind,
            registry.names().join(", ")
        )
    })?;
    let params = load_parameters(args)?;

    tracing::debug!(
        resource_kind = %spec.name,
        transport = transport.transport_name(),
        "Applying desired state"
    );
    match Reconciler::new(transport, spec).apply(params).await {
        Ok(outcome) => {
            print_outcome(&outcome, format);
            Ok(())
        }
        Err(e) => {
            print_value(
                &json!({"failed": true, "msg": e.to_string()}),
                OutputFormat::Json,
            );
            Err(e).with_context(|| format!("Failed to reconcile {}", spec.name))
        }
    }
}
