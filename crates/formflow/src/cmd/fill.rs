use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use formflow_lib::{
    FormSession, JsonFileStore, SessionError, SessionRunner, StoreError, SubmissionSink,
};
use formflow_spec::{Answers, Field, FieldType, Submission};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::read_form;

#[derive(Args, Debug, Clone)]
pub struct FillArgs {
    /// Form definition file, or a form id inside the store
    #[arg(long, value_name = "PATH|ID")]
    pub form: String,
    /// Store directory receiving the submission
    #[arg(long, value_name = "DIR", env = "FORMFLOW_STORE")]
    pub store: Option<PathBuf>,
    /// JSON object of answers keyed by field id; skips prompting
    #[arg(long, value_name = "answers.json")]
    pub answers: Option<PathBuf>,
    /// Print the submission as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FillReport<'a> {
    submission: &'a Submission,
    section_path: &'a [String],
    stored: bool,
}

/// Accepts submissions without persisting them.
struct EchoSink;

impl SubmissionSink for EchoSink {
    fn submit(&self, form_id: &str, data: Answers) -> Result<Submission, StoreError> {
        Ok(Submission::new(form_id, data))
    }
}

pub fn run(args: FillArgs) -> Result<()> {
    let store = args.store.as_ref().map(JsonFileStore::new);
    let mut session = open_session(&args.form, store.as_ref())?;

    let result = match &args.answers {
        Some(path) => {
            let answers = read_answers(path)?;
            let mut provider = |field: &Field, _current: Option<&Value>| {
                Ok::<_, SessionError>(answers.get(&field.id).cloned())
            };
            submit(&mut session, &mut provider, store.as_ref())
        }
        None => {
            let mut provider = prompt_field;
            submit(&mut session, &mut provider, store.as_ref())
        }
    };

    let submission = match result {
        Ok(submission) => submission,
        Err(SessionError::Invalid(report)) => {
            for (field_id, message) in &report.errors {
                eprintln!("{field_id}: {message}");
            }
            bail!("{} field(s) failed validation", report.errors.len());
        }
        Err(err) => {
            let form_id = session.form().id.clone();
            return Err(anyhow::Error::new(err).context(format!("could not complete '{form_id}'")));
        }
    };

    let path = &session.state().section_path;
    if args.json {
        let report = FillReport {
            submission: &submission,
            section_path: path,
            stored: store.is_some(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("submitted {} via {}", submission.id, path.join(" -> "));
        if store.is_none() {
            println!("{}", serde_json::to_string_pretty(&submission.data)?);
        }
    }
    Ok(())
}

/// A readable file is a form definition; anything else names a stored form.
/// Definitions loaded from a file are saved into the store so submissions
/// can reference them.
fn open_session(form: &str, store: Option<&JsonFileStore>) -> Result<FormSession> {
    let path = Path::new(form);
    if path.is_file() {
        let mut definition = read_form(path)?;
        if let Some(store) = store {
            store
                .save_form(&mut definition)
                .with_context(|| format!("failed to import '{}' into the store", definition.id))?;
            info!(form = %definition.id, "imported form into store");
        }
        return Ok(FormSession::new(definition));
    }
    let store =
        store.ok_or_else(|| anyhow!("'{form}' is not a file; pass --store to load it by id"))?;
    Ok(FormSession::open(store, form)?)
}

fn submit(
    session: &mut FormSession,
    provider: &mut formflow_lib::AnswerProvider<'_>,
    store: Option<&JsonFileStore>,
) -> Result<Submission, SessionError> {
    match store {
        Some(store) => SessionRunner::run(session, provider, store),
        None => SessionRunner::run(session, provider, &EchoSink),
    }
}

fn read_answers(path: &Path) -> Result<Answers> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read answers from {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("answers file {} is not valid JSON", path.display()))?;
    match value {
        Value::Object(answers) => Ok(answers),
        _ => bail!("answers file {} must contain a JSON object", path.display()),
    }
}

fn prompt_field(field: &Field, current: Option<&Value>) -> Result<Option<Value>, SessionError> {
    match field.kind {
        FieldType::Text => prompt_text(field, current),
        FieldType::Dropdown => prompt_choice(field, current),
        FieldType::Table | FieldType::File => prompt_json(field),
    }
}

fn read_line() -> Result<String, SessionError> {
    io::stdout()
        .flush()
        .map_err(|err| SessionError::Provider(err.to_string()))?;
    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .map_err(|err| SessionError::Provider(err.to_string()))?;
    if read == 0 {
        return Err(SessionError::Provider("stdin closed".to_string()));
    }
    Ok(input.trim().to_string())
}

fn title(field: &Field) -> String {
    if field.required {
        format!("{} *", field.question)
    } else {
        field.question.clone()
    }
}

fn prompt_text(field: &Field, current: Option<&Value>) -> Result<Option<Value>, SessionError> {
    let default_text = current.and_then(Value::as_str);
    loop {
        match default_text {
            Some(value) => print!("{} [{value}]: ", title(field)),
            None => print!("{}: ", title(field)),
        }
        let input = read_line()?;
        if input.is_empty() {
            if let Some(value) = default_text {
                return Ok(Some(Value::String(value.to_string())));
            }
            if field.required {
                println!("A value is required.");
                continue;
            }
            return Ok(None);
        }
        return Ok(Some(Value::String(input)));
    }
}

fn prompt_choice(field: &Field, current: Option<&Value>) -> Result<Option<Value>, SessionError> {
    let options = field.options.as_deref().unwrap_or_default();
    let default_text = current.and_then(Value::as_str);
    loop {
        println!("{}:", title(field));
        for (idx, option) in options.iter().enumerate() {
            println!("  {}. {option}", idx + 1);
        }
        match default_text {
            Some(value) => print!("Select a number or value [{value}] "),
            None => print!("Select a number or value "),
        }
        let input = read_line()?;
        if input.is_empty() {
            if let Some(value) = default_text {
                return Ok(Some(Value::String(value.to_string())));
            }
            if field.required {
                println!("A value is required.");
                continue;
            }
            return Ok(None);
        }
        if let Ok(n) = input.parse::<usize>()
            && n > 0
            && n <= options.len()
        {
            return Ok(Some(Value::String(options[n - 1].clone())));
        }
        if field.has_option(&input) {
            return Ok(Some(Value::String(input)));
        }
        println!("Not one of the listed options.");
    }
}

/// Table rows and file descriptors are entered as a JSON line.
fn prompt_json(field: &Field) -> Result<Option<Value>, SessionError> {
    loop {
        print!("{} (JSON): ", title(field));
        let input = read_line()?;
        if input.is_empty() {
            if field.required {
                println!("A value is required.");
                continue;
            }
            return Ok(None);
        }
        match serde_json::from_str(&input) {
            Ok(value) => return Ok(Some(value)),
            Err(err) => println!("Invalid JSON: {err}"),
        }
    }
}
