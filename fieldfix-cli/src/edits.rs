//! Edits files for the non-interactive `save` command.
//!
//! ```toml
//! [[edit]]
//! kind = "constraint"
//! unique_id = "101"
//! variable = "plot_size"
//! value = 450
//! explanation = "re-measured with the farmer"
//! ```

use anyhow::Context;
use camino::Utf8Path;
use fieldfix_core::FieldEdit;
use fieldfix_types::{ErrorKey, ErrorKind};
use fs_err as fs;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct EditsFile {
    #[serde(default, rename = "edit")]
    edits: Vec<EditEntry>,
}

/// Survey ids are written either as numbers or as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdCell {
    Number(i64),
    Text(String),
}

impl IdCell {
    fn into_string(self) -> String {
        match self {
            IdCell::Number(n) => n.to_string(),
            IdCell::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditEntry {
    kind: ErrorKind,
    unique_id: IdCell,
    variable: String,
    value: Option<i64>,
    explanation: Option<String>,
}

/// Parse an edits file into edit events, in file order. Within an entry the value comes first.
pub fn parse_edits(contents: &str) -> anyhow::Result<Vec<(ErrorKey, FieldEdit)>> {
    let file: EditsFile = toml::from_str(contents).context("invalid TOML")?;
    let mut events = Vec::new();
    for (i, entry) in file.edits.into_iter().enumerate() {
        let key = ErrorKey::new(entry.kind, entry.unique_id.into_string(), entry.variable);
        if entry.value.is_none() && entry.explanation.is_none() {
            anyhow::bail!(
                "edit #{} ({}) sets neither value nor explanation",
                i + 1,
                key
            );
        }
        if let Some(value) = entry.value {
            events.push((key.clone(), FieldEdit::CorrectedValue(value)));
        }
        if let Some(text) = entry.explanation {
            events.push((key, FieldEdit::Explanation(text)));
        }
    }
    Ok(events)
}

pub fn load_edits(path: &Utf8Path) -> anyhow::Result<Vec<(ErrorKey, FieldEdit)>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read edits file {}", path))?;
    parse_edits(&contents).with_context(|| format!("parse edits file {}", path))
}
