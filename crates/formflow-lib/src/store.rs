use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use formflow_spec::{Answers, Form, PruneReport, Submission};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("form '{0}' not found")]
    NotFound(String),
    #[error("invalid identifier '{0}'")]
    InvalidId(String),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where form definitions are fetched from.
pub trait FormSource {
    fn load_form(&self, form_id: &str) -> Result<Form, StoreError>;
}

/// Receives finalized answers; generates the id and timestamp.
pub trait SubmissionSink {
    fn submit(&self, form_id: &str, data: Answers) -> Result<Submission, StoreError>;
}

/// Directory-backed store:
/// `forms/<id>.json` and `submissions/<form id>/<submission id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn forms_dir(&self) -> PathBuf {
        self.root.join("forms")
    }

    fn form_path(&self, form_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.forms_dir().join(format!("{}.json", checked_id(form_id)?)))
    }

    fn submissions_dir(&self, form_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join("submissions").join(checked_id(form_id)?))
    }

    /// Prunes and stamps the form, then writes it.
    pub fn save_form(&self, form: &mut Form) -> Result<PruneReport, StoreError> {
        let path = self.form_path(&form.id)?;
        let report = form.prepare_for_save();
        if !report.is_clean() {
            debug!(form = %form.id, removed = report.total(), "dropped stale references on save");
        }
        write_json(&path, form)?;
        info!(form = %form.id, path = %path.display(), "form saved");
        Ok(report)
    }

    /// Every stored form, sorted by name. Unreadable files are skipped.
    pub fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let mut forms: Vec<Form> = read_dir_json(&self.forms_dir())?
            .into_iter()
            .filter_map(|path| match read_json(&path) {
                Ok(form) => Some(form),
                Err(err) => {
                    warn!(%err, "skipping unreadable form");
                    None
                }
            })
            .collect();
        forms.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(forms)
    }

    /// Removes a form and its submissions.
    pub fn delete_form(&self, form_id: &str) -> Result<(), StoreError> {
        let path = self.form_path(form_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(form_id.to_string()));
        }
        fs::remove_file(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let submissions = self.submissions_dir(form_id)?;
        if submissions.exists() {
            fs::remove_dir_all(&submissions).map_err(|source| StoreError::Io {
                path: submissions,
                source,
            })?;
        }
        Ok(())
    }

    /// Submissions of a form, newest first. Unreadable files are skipped.
    pub fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError> {
        let mut submissions: Vec<Submission> = read_dir_json(&self.submissions_dir(form_id)?)?
            .into_iter()
            .filter_map(|path| match read_json(&path) {
                Ok(submission) => Some(submission),
                Err(err) => {
                    warn!(%err, form = %form_id, "skipping unreadable submission");
                    None
                }
            })
            .collect();
        submissions.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(submissions)
    }
}

impl FormSource for JsonFileStore {
    fn load_form(&self, form_id: &str) -> Result<Form, StoreError> {
        let path = self.form_path(form_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(form_id.to_string()));
        }
        read_json(&path)
    }
}

impl SubmissionSink for JsonFileStore {
    fn submit(&self, form_id: &str, data: Answers) -> Result<Submission, StoreError> {
        if !self.form_path(form_id)?.exists() {
            return Err(StoreError::NotFound(form_id.to_string()));
        }
        let submission = Submission::new(form_id, data);
        let path = self
            .submissions_dir(form_id)?
            .join(format!("{}.json", submission.id));
        write_json(&path, &submission)?;
        info!(form = %form_id, submission = %submission.id, "submission stored");
        Ok(submission)
    }
}

/// Loads a form definition straight from a JSON file.
pub fn load_form_file(path: &Path) -> Result<Form, StoreError> {
    read_json(path)
}

fn checked_id(id: &str) -> Result<&str, StoreError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_control);
    if valid {
        Ok(id)
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

fn read_dir_json(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let payload = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, payload).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
