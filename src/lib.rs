// src/lib.rs

pub mod artifact;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod gmail_hub;
pub mod normalize;
pub mod notify;
pub mod reconcile;
pub mod record;
pub mod render;
pub mod rules;
pub mod simple_refresh;
pub mod simplestore;
pub mod text_source;

pub use compare::{MatchResult, SentinelPolicy, Verdict, compare};
pub use extract::extract;
pub use normalize::{NormalizeMode, SENTINEL, normalize};
pub use reconcile::{Evaluation, ReconciliationOutcome, Reconciler};
pub use record::{DocumentRecord, FieldValue, LineItem};
pub use rules::{CompareMode, DocumentRole, FieldName, RuleTable};
