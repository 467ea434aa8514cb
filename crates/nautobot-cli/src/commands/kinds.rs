use anyhow::Result;

use crate::cli::{KindsArgs, OutputFormat};
use crate::commands::apply::registry_with_schema;
use crate::output::print_kinds;

pub fn run(args: &KindsArgs, format: OutputFormat) -> Result<()> {
    let registry = registry_with_schema(args.schema.as_deref())?;
    print_kinds(&registry, format);
    Ok(())
}
