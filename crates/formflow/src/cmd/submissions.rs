use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Subcommand};
use formflow_lib::{FormSource, JsonFileStore, export_csv};

use super::schema::write_output;

#[derive(Subcommand, Debug, Clone)]
pub enum SubmissionsCommand {
    /// List submissions of a form, newest first
    List(ListArgs),
    /// Export submissions of a form as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreTarget {
    /// Store directory
    #[arg(long, value_name = "DIR", env = "FORMFLOW_STORE")]
    pub store: Option<PathBuf>,
    /// Form id
    #[arg(long, value_name = "FORM_ID")]
    pub form: String,
}

impl StoreTarget {
    fn open(&self) -> Result<JsonFileStore> {
        let root = self
            .store
            .as_ref()
            .ok_or_else(|| anyhow!("--store (or FORMFLOW_STORE) is required"))?;
        Ok(JsonFileStore::new(root))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: StoreTarget,
    /// Emit submissions as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub target: StoreTarget,
    /// CSV destination; stdout when omitted
    #[arg(long, value_name = "file.csv")]
    pub out: Option<PathBuf>,
}

pub fn run(command: SubmissionsCommand) -> Result<()> {
    match command {
        SubmissionsCommand::List(args) => list(args),
        SubmissionsCommand::Export(args) => export(args),
    }
}

fn list(args: ListArgs) -> Result<()> {
    let store = args.target.open()?;
    let submissions = store
        .list_submissions(&args.target.form)
        .with_context(|| format!("failed to list submissions of '{}'", args.target.form))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&submissions)?);
        return Ok(());
    }
    if submissions.is_empty() {
        println!("no submissions for '{}'", args.target.form);
    }
    for submission in &submissions {
        println!(
            "{}\t{}\t{} answer(s)",
            submission.id,
            submission.submitted_at,
            submission.data.len()
        );
    }
    Ok(())
}

fn export(args: ExportArgs) -> Result<()> {
    let store = args.target.open()?;
    let form = store
        .load_form(&args.target.form)
        .with_context(|| format!("failed to load form '{}'", args.target.form))?;
    let submissions = store
        .list_submissions(&form.id)
        .with_context(|| format!("failed to list submissions of '{}'", form.id))?;
    let csv = export_csv(&form, &submissions);
    match args.out {
        Some(path) => write_output(&path, &csv),
        None => {
            println!("{csv}");
            Ok(())
        }
    }
}
