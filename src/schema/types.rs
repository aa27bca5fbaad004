//! Declarative experiment schemas.
//!
//! An [`ExperimentSchema`] lists the fields a record must carry and the
//! constraint on each: inclusive numeric bounds, enumerated literals, free
//! text, or a file reference. Schemas are built in code at registration
//! time; validation walks them without any runtime reflection.

use serde::{Deserialize, Serialize};

/// Constraint on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldConstraint {
    /// Floating-point value within inclusive bounds.
    Float { min: f64, max: f64 },
    /// Integer value within inclusive bounds.
    Integer { min: i64, max: i64 },
    /// Free-form text.
    Text,
    /// One of the declared literals.
    Choice { options: Vec<String> },
    /// Reference to a file: a local path or a storage key.
    FileRef,
}

impl FieldConstraint {
    /// Human-readable description used in validation errors.
    pub fn describe(&self) -> String {
        match self {
            FieldConstraint::Float { min, max } => format!("must be within [{}, {}]", min, max),
            FieldConstraint::Integer { min, max } => format!("must be within [{}, {}]", min, max),
            FieldConstraint::Text => "must be a string".to_string(),
            FieldConstraint::Choice { options } => {
                format!("must be one of [{}]", options.join(", "))
            }
            FieldConstraint::FileRef => "must be a non-empty file path or storage key".to_string(),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub constraint: FieldConstraint,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Declared shape of an experiment's input or output records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSchema {
    pub fields: Vec<FieldSchema>,
}

impl ExperimentSchema {
    pub fn builder() -> ExperimentSchemaBuilder {
        ExperimentSchemaBuilder { fields: Vec::new() }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Fluent builder for [`ExperimentSchema`].
pub struct ExperimentSchemaBuilder {
    fields: Vec<FieldSchema>,
}

impl ExperimentSchemaBuilder {
    fn push(mut self, name: &str, constraint: FieldConstraint) -> Self {
        self.fields.push(FieldSchema {
            name: name.to_string(),
            constraint,
            required: true,
        });
        self
    }

    pub fn float(self, name: &str, min: f64, max: f64) -> Self {
        self.push(name, FieldConstraint::Float { min, max })
    }

    pub fn integer(self, name: &str, min: i64, max: i64) -> Self {
        self.push(name, FieldConstraint::Integer { min, max })
    }

    pub fn text(self, name: &str) -> Self {
        self.push(name, FieldConstraint::Text)
    }

    pub fn choice<I, S>(self, name: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(
            name,
            FieldConstraint::Choice {
                options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn file(self, name: &str) -> Self {
        self.push(name, FieldConstraint::FileRef)
    }

    /// Mark the most recently declared field as optional.
    pub fn optional(mut self) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.required = false;
        }
        self
    }

    pub fn build(self) -> ExperimentSchema {
        ExperimentSchema {
            fields: self.fields,
        }
    }
}
