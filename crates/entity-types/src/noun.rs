use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The conjugation triple for a verb, plus its derived reverse-relation
/// names. See the conjugator (C2) for how these are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conjugation {
    pub action: String,
    pub activity: String,
    pub event: String,
    #[serde(rename = "reverseBy")]
    pub reverse_by: String,
    #[serde(rename = "reverseAt")]
    pub reverse_at: String,
}

impl Conjugation {
    pub fn new(action: impl Into<String>, activity: impl Into<String>, event: impl Into<String>) -> Self {
        let event = event.into();
        Self {
            action: action.into(),
            activity: activity.into(),
            reverse_by: format!("{event}By"),
            reverse_at: format!("{event}At"),
            event,
        }
    }
}

/// A primitive scalar type for a field. The noun-definition mini-language
/// (out of scope here) is the thing that parses surface syntax like
/// `"string!"` into one of these; this crate only models the parsed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Date,
}

/// The kind of a single field-map entry in a noun schema. A noun's field
/// map can describe a data field (scalar/enum/relationship), a custom verb
/// marker, or a disabled-verb marker — all keyed by name (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    Scalar { of: ScalarType },
    Enum { variants: Vec<String> },
    Relationship { target: String },
    CustomVerb,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModifiers {
    pub required: bool,
    pub optional: bool,
    pub indexed: bool,
    pub unique: bool,
    pub array: bool,
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    #[serde(default)]
    pub modifiers: FieldModifiers,
}

/// A registered noun (entity type) schema. Never deleted in-place — a
/// re-registration replaces the prior schema wholesale (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NounSchema {
    pub name: String,
    pub singular: String,
    pub plural: String,
    pub slug: String,
    pub fields: HashMap<String, FieldDescriptor>,
    pub verbs: HashMap<String, Conjugation>,
    pub disabled_verbs: HashSet<String>,
    pub created_at: DateTime<Utc>,
}

impl NounSchema {
    pub fn is_verb_disabled(&self, verb: &str) -> bool {
        self.disabled_verbs.contains(verb)
    }
}

/// The input to `defineNoun` — field/verb maps supplied by the (out of
/// scope) noun-definition parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NounDefinition {
    pub singular: Option<String>,
    pub plural: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, FieldDescriptor>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub disabled_verbs: HashSet<String>,
}
