// src/compare.rs

use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::normalize::{digits_only, is_sentinel};
use crate::record::{DocumentRecord, FieldValue};
use crate::rules::{CompareField, CompareMode, FieldName};

/// What to do when a field is the sentinel on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelPolicy {
    #[default]
    Mismatch,
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Successful,
    Unsuccessful,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful => write!(f, "successful"),
            Self::Unsuccessful => write!(f, "unsuccessful"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMatch {
    pub field: FieldName,
    pub mode: CompareMode,
    pub matched: bool,
}

/// Per-field flags in comparison order. The verdict is derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    matches: Vec<FieldMatch>,
}

impl MatchResult {
    pub fn verdict(&self) -> Verdict {
        if self.matches.iter().all(|m| m.matched) {
            Verdict::Successful
        } else {
            Verdict::Unsuccessful
        }
    }

    pub fn is_successful(&self) -> bool {
        self.verdict() == Verdict::Successful
    }

    pub fn get(&self, field: FieldName) -> Option<bool> {
        self.matches
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.matched)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMatch> {
        self.matches.iter()
    }

    pub fn mismatched(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.matches.iter().filter(|m| !m.matched).map(|m| m.field)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

struct MatchFlags<'a>(&'a [FieldMatch]);

impl Serialize for MatchFlags<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for m in self.0 {
            map.serialize_entry(&m.field, &m.matched)?;
        }
        map.end()
    }
}

impl Serialize for MatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MatchResult", 2)?;
        s.serialize_field("matches", &MatchFlags(&self.matches))?;
        s.serialize_field("verdict", &self.verdict())?;
        s.end()
    }
}

/// Compare `a` (proforma) against `b` (agreement) over `fields`, in order.
/// A field missing from either record is a mismatch.
pub fn compare(
    a: &DocumentRecord,
    b: &DocumentRecord,
    fields: &[CompareField],
    policy: SentinelPolicy,
) -> MatchResult {
    let matches = fields
        .iter()
        .map(|cf| {
            let matched = match (a.get(cf.field), b.get(cf.field)) {
                (Some(x), Some(y)) => values_match(x, y, cf.mode, policy),
                _ => false,
            };
            FieldMatch {
                field: cf.field,
                mode: cf.mode,
                matched,
            }
        })
        .collect();
    MatchResult { matches }
}

fn values_match(a: &FieldValue, b: &FieldValue, mode: CompareMode, policy: SentinelPolicy) -> bool {
    match (a, b) {
        (FieldValue::Text(x), FieldValue::Text(y)) => text_match(x, y, mode, policy),
        (FieldValue::Items(x), FieldValue::Items(y)) => x == y,
        _ => false,
    }
}

fn text_match(a: &str, b: &str, mode: CompareMode, policy: SentinelPolicy) -> bool {
    match (is_sentinel(a), is_sentinel(b)) {
        (true, true) => return policy == SentinelPolicy::Match,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    match mode {
        CompareMode::Exact => a == b,
        CompareMode::NumericOnly => {
            let (x, y) = (digits_only(a), digits_only(b));
            !x.is_empty() && x == y
        }
        CompareMode::Substring => !b.is_empty() && a.contains(b),
    }
}
