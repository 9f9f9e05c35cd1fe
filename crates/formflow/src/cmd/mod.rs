pub mod check;
pub mod fill;
pub mod schema;
pub mod submissions;

use std::path::Path;

use anyhow::{Context, Result};
use formflow_spec::Form;

/// Reads a form definition file, reporting the path on failure.
pub(crate) fn read_form(path: &Path) -> Result<Form> {
    formflow_lib::load_form_file(path)
        .with_context(|| format!("failed to load form from {}", path.display()))
}
