use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use formflow_spec::{SchemaIssue, check, prune};
use serde::Serialize;

use super::read_form;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Form definition file
    #[arg(long, value_name = "form.json")]
    pub form: PathBuf,
    /// Treat integrity issues as errors
    #[arg(long)]
    pub strict: bool,
    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    form_id: &'a str,
    issues: &'a [SchemaIssue],
    pruned: formflow_spec::PruneReport,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let form = read_form(&args.form)?;
    let issues = check(&form);
    let pruned = prune(&mut form.clone());

    if args.json {
        let report = CheckReport {
            form_id: &form.id,
            issues: &issues,
            pruned,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for issue in &issues {
            eprintln!("warning: {issue}");
        }
        if pruned.is_clean() {
            println!("{}: no stale references", form.id);
        } else {
            println!(
                "{}: pruning would remove {} rule(s), clear {} section ref(s), {} column ref(s), \
{} next target(s), and drop {} column entr(ies)",
                form.id,
                pruned.rules_removed,
                pruned.section_refs_cleared,
                pruned.column_refs_cleared,
                pruned.next_targets_cleared,
                pruned.column_entries_removed,
            );
        }
    }

    if args.strict && !issues.is_empty() {
        bail!(
            "form-check: {} issue(s) treated as errors (--strict)",
            issues.len()
        );
    }
    Ok(())
}
