// src/record.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::SENTINEL;
use crate::rules::{DocumentRole, FieldName};

/// A single row of the goods table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} @ {} = {}",
            self.name, self.quantity, self.unit_price, self.amount
        )
    }
}

/// Value held for one field. Unmatched fields hold `Text(SENTINEL)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Items(Vec<LineItem>),
}

impl FieldValue {
    pub fn not_found() -> Self {
        Self::Text(SENTINEL.to_string())
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Text(s) if s == SENTINEL)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Items(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Items(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Canonical field values extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub role: DocumentRole,
    fields: BTreeMap<FieldName, FieldValue>,
}

impl DocumentRecord {
    pub fn new(role: DocumentRole) -> Self {
        Self {
            role,
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, field: FieldName, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: FieldName) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Text value of a field, `None` when undeclared or a line-item list.
    pub fn text(&self, field: FieldName) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// How many declared fields were found (not the sentinel), out of all.
    pub fn coverage(&self) -> (usize, usize) {
        let found = self.fields.values().filter(|v| !v.is_sentinel()).count();
        (found, self.fields.len())
    }
}
