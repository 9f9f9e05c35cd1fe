use formflow_spec::{Form, Submission};
use serde_json::Value;

/// Renders submissions as CSV: id, timestamp, then one column per answered
/// field labelled with its question. Every cell is quoted.
pub fn export_csv(form: &Form, submissions: &[Submission]) -> String {
    let mut field_ids: Vec<&str> = Vec::new();
    for submission in submissions {
        for field_id in submission.data.keys() {
            if !field_ids.contains(&field_id.as_str()) {
                field_ids.push(field_id);
            }
        }
    }

    let mut rows = Vec::with_capacity(submissions.len() + 1);
    let mut header = vec!["Submission ID".to_string(), "Submitted At".to_string()];
    header.extend(field_ids.iter().map(|id| {
        form.field(id)
            .map_or_else(|| (*id).to_string(), |field| field.question.clone())
    }));
    rows.push(header);

    for submission in submissions {
        let mut row = vec![submission.id.clone(), submission.submitted_at.clone()];
        row.extend(
            field_ids
                .iter()
                .map(|id| format_cell(submission.data.get(*id))),
        );
        rows.push(row);
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(value @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        Some(other) => other.to_string(),
    }
}
