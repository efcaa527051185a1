//! Form definitions: the draft builder used by legal staff, the registry
//! persisting finished forms, and the filler turning client input into a
//! submission payload.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::error::{LexflowError, Result};
use crate::models::{Field, FieldType, FormDefinition, Payload, PayloadValue};
use crate::storage::{slots, Storage};

const MIN_LABEL_LEN: usize = 2;
const MIN_FORM_NAME_LEN: usize = 2;

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Builder input for one field, as typed by the form author.
#[derive(Debug, Clone)]
pub struct FieldDraft {
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub placeholder: String,
    /// Comma-separated; only read for `Select`.
    pub options: String,
}

impl FieldDraft {
    pub fn new(field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            field_type,
            label: label.into(),
            required: false,
            placeholder: String::new(),
            options: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Validate and turn the draft into a field with a fresh id.
    pub fn build(&self) -> Result<Field> {
        let label = self.label.trim();
        if label.chars().count() < MIN_LABEL_LEN {
            return Err(LexflowError::invalid(
                "label",
                format!("must be at least {MIN_LABEL_LEN} characters"),
            ));
        }
        let options = match self.field_type {
            FieldType::Select => {
                let options = split_options(&self.options);
                if options.is_empty() {
                    return Err(LexflowError::invalid(
                        "options",
                        "a select field needs at least one option",
                    ));
                }
                Some(options)
            }
            _ => None,
        };
        let placeholder = self.placeholder.trim();
        Ok(Field {
            id: new_id(),
            field_type: self.field_type,
            label: label.to_string(),
            required: self.required,
            placeholder: (!placeholder.is_empty()).then(|| placeholder.to_string()),
            options,
        })
    }
}

fn split_options(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Form under construction. Nothing is persisted until it is saved through
/// [`FormRegistry::create_form`].
#[derive(Debug, Clone, Default)]
pub struct FormDraft {
    pub name: String,
    fields: Vec<Field>,
}

impl FormDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Start editing from a saved form. Saving creates a new definition.
    pub fn from_definition(form: &FormDefinition) -> Self {
        Self {
            name: form.name.clone(),
            fields: form.fields.clone(),
        }
    }

    pub fn add_field(&mut self, draft: &FieldDraft) -> Result<&Field> {
        let field = draft.build()?;
        self.fields.push(field);
        Ok(&self.fields[self.fields.len() - 1])
    }

    /// Returns whether a field was removed.
    pub fn remove_field(&mut self, field_id: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != field_id);
        self.fields.len() != before
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn can_save(&self) -> bool {
        self.name.trim().chars().count() >= MIN_FORM_NAME_LEN && !self.fields.is_empty()
    }
}

#[derive(Clone)]
pub struct FormRegistry {
    storage: Storage,
}

impl FormRegistry {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Most recently created first.
    pub fn list_forms(&self) -> Vec<FormDefinition> {
        self.storage.load(slots::FORM_DEFINITIONS)
    }

    pub fn get_form(&self, id: &str) -> Result<FormDefinition> {
        self.list_forms()
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| LexflowError::not_found("form", id))
    }

    pub fn create_form(&self, name: &str, fields: Vec<Field>) -> Result<FormDefinition> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LexflowError::invalid("name", "must not be empty"));
        }
        validate_fields(&fields)?;

        let form = FormDefinition {
            id: new_id(),
            name: name.to_string(),
            fields,
        };
        let mut forms = self.list_forms();
        forms.insert(0, form.clone());
        self.storage.save(slots::FORM_DEFINITIONS, &forms)?;
        info!(form_id = %form.id, name = %form.name, fields = form.fields.len(), "form created");
        Ok(form)
    }

    pub fn save_draft(&self, draft: &FormDraft) -> Result<FormDefinition> {
        if draft.name.trim().chars().count() < MIN_FORM_NAME_LEN {
            return Err(LexflowError::invalid(
                "name",
                format!("must be at least {MIN_FORM_NAME_LEN} characters"),
            ));
        }
        self.create_form(&draft.name, draft.fields.clone())
    }
}

fn validate_fields(fields: &[Field]) -> Result<()> {
    if fields.is_empty() {
        return Err(LexflowError::invalid("fields", "a form needs at least one field"));
    }
    let mut ids = HashSet::new();
    for field in fields {
        if !ids.insert(field.id.as_str()) {
            return Err(LexflowError::invalid(
                "fields",
                format!("duplicate field id `{}`", field.id),
            ));
        }
        if field.label.trim().is_empty() {
            return Err(LexflowError::invalid("label", "must not be empty"));
        }
        match (field.field_type, &field.options) {
            (FieldType::Select, Some(options)) if !options.is_empty() => {}
            (FieldType::Select, _) => {
                return Err(LexflowError::invalid(
                    "options",
                    format!("select field `{}` has no options", field.label),
                ));
            }
            (_, Some(_)) => {
                return Err(LexflowError::invalid(
                    "options",
                    format!("only select fields take options (`{}`)", field.label),
                ));
            }
            (_, None) => {}
        }
    }
    Ok(())
}

impl FormDefinition {
    /// Convert raw input keyed by field id into a payload keyed by label.
    ///
    /// Missing checkbox values count as unchecked; other missing values as
    /// blank. Blank optional fields are stored as empty text.
    pub fn fill(&self, values: &HashMap<String, String>) -> Result<Payload> {
        let mut payload = Payload::new();
        for field in &self.fields {
            let raw = values.get(&field.id).map(|v| v.trim()).unwrap_or("");
            let value = parse_value(field, raw)?;
            payload.push(field.label.clone(), value);
        }
        Ok(payload)
    }
}

fn parse_value(field: &Field, raw: &str) -> Result<PayloadValue> {
    let invalid = |message: String| LexflowError::ValidationFailed {
        field: "value",
        message: format!("{}: {message}", field.label),
    };

    match field.field_type {
        FieldType::Checkbox => {
            let checked = match raw.to_ascii_lowercase().as_str() {
                "" | "false" | "no" | "0" | "off" => false,
                "true" | "yes" | "si" | "sí" | "1" | "on" => true,
                other => return Err(invalid(format!("`{other}` is not a yes/no value"))),
            };
            if field.required && !checked {
                return Err(invalid("must be checked".to_string()));
            }
            Ok(PayloadValue::Bool(checked))
        }
        _ if raw.is_empty() => {
            if field.required {
                return Err(invalid("is required".to_string()));
            }
            Ok(PayloadValue::Text(String::new()))
        }
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(PayloadValue::Number)
            .ok_or_else(|| invalid(format!("`{raw}` is not a number"))),
        FieldType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| PayloadValue::Text(d.format("%Y-%m-%d").to_string()))
            .map_err(|_| invalid(format!("`{raw}` is not a YYYY-MM-DD date"))),
        FieldType::Email => match raw.split_once('@') {
            Some((user, host)) if !user.is_empty() && !host.is_empty() => {
                Ok(PayloadValue::Text(raw.to_string()))
            }
            _ => Err(invalid(format!("`{raw}` is not an email address"))),
        },
        FieldType::Select => {
            let allowed = field.options.as_deref().unwrap_or_default();
            if allowed.iter().any(|o| o == raw) {
                Ok(PayloadValue::Text(raw.to_string()))
            } else {
                Err(invalid(format!("`{raw}` is not one of {}", allowed.join(", "))))
            }
        }
        FieldType::Text | FieldType::Phone => Ok(PayloadValue::Text(raw.to_string())),
    }
}
