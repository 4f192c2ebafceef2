// src/artifact.rs

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::OverlayConfig;
use crate::error::ArtifactError;
use crate::record::DocumentRecord;

/// A source document as handed to the reconciler: its raw bytes and the
/// text already pulled out of them.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SignedCopy,
    PaymentInstruction,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedCopy => write!(f, "signed copy"),
            Self::PaymentInstruction => write!(f, "payment instruction"),
        }
    }
}

/// A rendered document. `content` is what gets attached to notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub path: Option<PathBuf>,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// The two fixed images stamped onto the signed copy, by name and location.
#[derive(Debug, Clone)]
pub struct Overlays {
    pub seal: Overlay,
    pub signature: Overlay,
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub name: String,
    pub path: PathBuf,
}

impl Overlay {
    fn from_path(path: &std::path::Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
        }
    }
}

impl From<&OverlayConfig> for Overlays {
    fn from(cfg: &OverlayConfig) -> Self {
        Self {
            seal: Overlay::from_path(&cfg.seal),
            signature: Overlay::from_path(&cfg.signature),
        }
    }
}

/// Produces a sealed and signed copy of the source document.
#[async_trait]
pub trait DocumentSigner: Send + Sync {
    async fn sign(
        &self,
        source: &SourceDocument,
        record: &DocumentRecord,
        overlays: &Overlays,
    ) -> Result<Artifact, ArtifactError>;
}

/// Produces the payment-instruction document from the proforma's fields.
#[async_trait]
pub trait PaymentInstructionRenderer: Send + Sync {
    async fn render(&self, record: &DocumentRecord) -> Result<Artifact, ArtifactError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlays_are_named_after_their_files() {
        let overlays = Overlays::from(&OverlayConfig {
            seal: PathBuf::from("assets/company-seal.png"),
            signature: PathBuf::from("assets/director-sign.png"),
        });
        assert_eq!(overlays.seal.name, "company-seal.png");
        assert_eq!(overlays.signature.name, "director-sign.png");
        assert_eq!(overlays.seal.path, PathBuf::from("assets/company-seal.png"));
    }
}
