use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use formflow_spec::Form;

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Write the schema to a file instead of stdout
    #[arg(long, value_name = "schema.json")]
    pub out: Option<PathBuf>,
}

pub fn run(args: SchemaArgs) -> Result<()> {
    let schema = schemars::schema_for!(Form);
    let rendered = serde_json::to_string_pretty(&schema).context("failed to render schema")?;
    match args.out {
        Some(path) => write_output(&path, &rendered),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Writes `contents`, creating parent directories as needed.
pub(crate) fn write_output(path: &std::path::Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote output");
    Ok(())
}
