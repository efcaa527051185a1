use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LexflowError;

/// Closed set of actor roles. Every role-dependent branch matches on this.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Legal staff ("jurídica"): authors forms and answers submissions.
    Legal,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Legal => "legal",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LexflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "legal" | "juridica" | "jurídica" => Ok(Role::Legal),
            "client" | "cliente" => Ok(Role::Client),
            other => Err(LexflowError::invalid(
                "role",
                format!("unknown role `{other}` (expected admin, legal or client)"),
            )),
        }
    }
}

/// Public view of a user: what the session and `list_users` expose.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

/// Persisted directory record (registered-directory slot).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub display_name: String,
}

impl DirectoryEntry {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "tel")]
    Phone,
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "checkbox")]
    Checkbox,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Phone => "tel",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = LexflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "email" => Ok(FieldType::Email),
            "tel" | "phone" => Ok(FieldType::Phone),
            "select" => Ok(FieldType::Select),
            "checkbox" | "bool" => Ok(FieldType::Checkbox),
            other => Err(LexflowError::invalid(
                "type",
                format!("unknown field type `{other}`"),
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Present only for `Select` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FormDefinition {
    pub id: String,
    pub name: String,
    pub fields: Vec<Field>,
}

/// A single entered value. Dates are kept as ISO `YYYY-MM-DD` text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Bool(true) => f.write_str("yes"),
            PayloadValue::Bool(false) => f.write_str("no"),
            PayloadValue::Number(n) => write!(f, "{n}"),
            PayloadValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PayloadEntry {
    pub label: String,
    pub value: PayloadValue,
}

/// Label → value mapping of one submission, in form field order.
///
/// Stored as a JSON object. A label is kept once: pushing it again replaces
/// the value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload(Vec<PayloadEntry>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: PayloadValue) {
        let label = label.into();
        match self.0.iter_mut().find(|e| e.label == label) {
            Some(entry) => entry.value = value,
            None => self.0.push(PayloadEntry { label, value }),
        }
    }

    pub fn get(&self, label: &str) -> Option<&PayloadValue> {
        self.0.iter().find(|e| e.label == label).map(|e| &e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PayloadEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|e| (&e.label, &e.value)))
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of field labels to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Payload, A::Error> {
        let mut payload = Payload::new();
        while let Some((label, value)) = map.next_entry::<String, PayloadValue>()? {
            payload.push(label, value);
        }
        Ok(payload)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PayloadVisitor)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub from: String,
    pub from_display: String,
    /// Always `Role::Legal`: submissions go to the legal inbox as a whole.
    pub to: Role,
    pub form_id: String,
    pub form_name: String,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    pub to_user: String,
    pub to_display: String,
    pub body: String,
    pub in_reply_to: String,
    pub form_name: String,
    pub created_at: DateTime<Utc>,
}

/// Mailbox record, tagged by `type` in the stored JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Submission(Submission),
    Response(Response),
}

impl Message {
    pub fn id(&self) -> &str {
        match self {
            Message::Submission(s) => &s.id,
            Message::Response(r) => &r.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Message::Submission(s) => s.created_at,
            Message::Response(r) => r.created_at,
        }
    }

    pub fn form_name(&self) -> &str {
        match self {
            Message::Submission(s) => &s.form_name,
            Message::Response(r) => &r.form_name,
        }
    }

    pub fn as_submission(&self) -> Option<&Submission> {
        match self {
            Message::Submission(s) => Some(s),
            Message::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Response(r) => Some(r),
            Message::Submission(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_json_is_tagged_and_camel_cased() {
        let msg = Message::Response(Response {
            id: "r1".to_string(),
            to_user: "12345678".to_string(),
            to_display: "Ana".to_string(),
            body: "Recibido".to_string(),
            in_reply_to: "s1".to_string(),
            form_name: "Ficha".to_string(),
            created_at: Utc::now(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "response");
        assert_eq!(json["toUser"], "12345678");
        assert_eq!(json["inReplyTo"], "s1");
    }

    #[test]
    fn test_payload_values_keep_their_json_types() {
        let mut payload = Payload::new();
        payload.push("Nombre", PayloadValue::Text("Ana".to_string()));
        payload.push("Edad", PayloadValue::Number(31.0));
        payload.push("Acepto", PayloadValue::Bool(true));

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"Nombre":"Ana","Edad":31.0,"Acepto":true}"#);
        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.get("Edad"), Some(&PayloadValue::Number(31.0)));
        assert_eq!(back.get("Acepto"), Some(&PayloadValue::Bool(true)));
    }

    #[test]
    fn test_payload_repeated_label_keeps_last_value() {
        let mut payload = Payload::new();
        payload.push("Nombre", PayloadValue::Text("first".to_string()));
        payload.push("Edad", PayloadValue::Number(40.0));
        payload.push("Nombre", PayloadValue::Text("second".to_string()));

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("Nombre"), Some(&PayloadValue::Text("second".to_string())));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"Nombre": "second", "Edad": 40.0})
        );

        let back: Payload = serde_json::from_str(r#"{"Nombre":"a","Nombre":"b"}"#).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.get("Nombre"), Some(&PayloadValue::Text("b".to_string())));
    }

    #[test]
    fn test_role_parses_original_spanish_names() {
        assert_eq!("juridica".parse::<Role>().unwrap(), Role::Legal);
        assert_eq!("Cliente".parse::<Role>().unwrap(), Role::Client);
        assert!(matches!(
            "judge".parse::<Role>(),
            Err(LexflowError::ValidationFailed { field: "role", .. })
        ));
    }

    #[test]
    fn test_field_type_wire_names() {
        let json = serde_json::to_string(&FieldType::Phone).unwrap();
        assert_eq!(json, "\"tel\"");
        assert_eq!("phone".parse::<FieldType>().unwrap(), FieldType::Phone);
    }
}
