use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::run::RunId;

/// Unvalidated caller input, one record per experiment.
pub type RawRecord = HashMap<String, Value>;

/// Reference to a file-valued field: a local path not yet uploaded, or a
/// key already present in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileReference {
    Local(PathBuf),
    Stored(String),
}

impl FileReference {
    pub fn is_stored(&self) -> bool {
        matches!(self, FileReference::Stored(_))
    }
}

impl std::fmt::Display for FileReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileReference::Local(path) => write!(f, "{}", path.display()),
            FileReference::Stored(key) => f.write_str(key),
        }
    }
}

/// A typed, constraint-checked field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Text(String),
    Choice(String),
    File(FileReference),
}

impl FieldValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) | FieldValue::Choice(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileReference> {
        match self {
            FieldValue::File(v) => Some(v),
            _ => None,
        }
    }
}

/// One experiment's validated input. Immutable once built: the run
/// identifier and `sort_index` are fixed at allocation time, and the field
/// map is only readable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    experiment_id: RunId,
    sort_index: usize,
    fields: HashMap<String, FieldValue>,
}

impl JobSpec {
    pub fn new(experiment_id: RunId, sort_index: usize, fields: HashMap<String, FieldValue>) -> Self {
        Self {
            experiment_id,
            sort_index,
            fields,
        }
    }

    pub fn experiment_id(&self) -> &RunId {
        &self.experiment_id
    }

    /// Stable 0-based position within the run. Partitioning preserves it so
    /// outputs merge back without re-matching on content.
    pub fn sort_index(&self) -> usize {
        self.sort_index
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    /// Copy of this spec with one field replaced. Used when file fields are
    /// resolved to storage keys before execution.
    pub(crate) fn with_field(&self, name: &str, value: FieldValue) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(name.to_string(), value);
        Self {
            experiment_id: self.experiment_id.clone(),
            sort_index: self.sort_index,
            fields,
        }
    }
}
