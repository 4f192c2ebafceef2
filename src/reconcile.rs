// src/reconcile.rs

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::artifact::{
    Artifact, ArtifactKind, DocumentSigner, Overlays, PaymentInstructionRenderer, SourceDocument,
};
use crate::compare::{MatchResult, SentinelPolicy, compare};
use crate::config::{DeliveryConfig, Party};
use crate::error::ArtifactError;
use crate::extract::extract;
use crate::notify::{Notification, Notifier};
use crate::record::DocumentRecord;
use crate::rules::{DocumentRole, FieldName, RuleTable};

/// The pure part of a reconciliation: both records and the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub proforma: DocumentRecord,
    pub agreement: DocumentRecord,
    pub result: MatchResult,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Produced { artifact: Artifact },
    Failed { error: String },
}

#[derive(Debug, Serialize)]
pub struct ArtifactReport {
    pub kind: ArtifactKind,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

impl ArtifactReport {
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.status {
            ArtifactStatus::Produced { artifact } => Some(artifact),
            ArtifactStatus::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed { error: String },
    /// The artifact it would carry was not produced.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub kind: ArtifactKind,
    pub party: Party,
    pub recipient: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// Everything one reconciliation produced. Artifact and delivery failures are
/// recorded here and leave `result` untouched.
#[derive(Debug, Serialize)]
pub struct ReconciliationOutcome {
    pub proforma: DocumentRecord,
    pub agreement: DocumentRecord,
    pub result: MatchResult,
    pub artifacts: Vec<ArtifactReport>,
    pub deliveries: Vec<DeliveryReport>,
}

impl ReconciliationOutcome {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn delivery(&self, kind: ArtifactKind) -> Option<&DeliveryReport> {
        self.deliveries.iter().find(|d| d.kind == kind)
    }
}

/// Downstream collaborators fired on a successful verdict.
#[derive(Clone)]
pub struct Collaborators {
    pub signer: Arc<dyn DocumentSigner>,
    pub renderer: Arc<dyn PaymentInstructionRenderer>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub sentinel_policy: SentinelPolicy,
    pub delivery: DeliveryConfig,
    pub overlays: Overlays,
}

/// Stateless between calls; share it behind an `Arc` across tasks.
pub struct Reconciler {
    rules: Arc<RuleTable>,
    settings: ReconcileSettings,
    collaborators: Collaborators,
}

impl Reconciler {
    pub fn new(rules: Arc<RuleTable>, settings: ReconcileSettings, collaborators: Collaborators) -> Self {
        Self {
            rules,
            settings,
            collaborators,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Extract both documents and compare them. No side effects.
    pub fn evaluate(&self, proforma_text: &str, agreement_text: &str) -> Evaluation {
        let proforma = extract(proforma_text, &self.rules, DocumentRole::Proforma);
        let agreement = extract(agreement_text, &self.rules, DocumentRole::Agreement);
        let result = compare(
            &proforma,
            &agreement,
            self.rules.compare_fields(),
            self.settings.sentinel_policy,
        );

        let mismatched: Vec<FieldName> = result.mismatched().collect();
        info!(
            verdict = %result.verdict(),
            compared = result.len(),
            mismatched = ?mismatched,
            "Comparison complete"
        );

        Evaluation {
            proforma,
            agreement,
            result,
        }
    }

    /// Evaluate, then on a successful verdict sign the proforma, render the
    /// payment instruction, and deliver both. Each trigger runs once.
    pub async fn reconcile(
        &self,
        proforma: &SourceDocument,
        agreement: &SourceDocument,
    ) -> ReconciliationOutcome {
        let span = info_span!("reconcile", proforma = %proforma.name, agreement = %agreement.name);

        async move {
            let Evaluation {
                proforma: proforma_record,
                agreement: agreement_record,
                result,
            } = self.evaluate(&proforma.text, &agreement.text);

            let mut outcome = ReconciliationOutcome {
                proforma: proforma_record,
                agreement: agreement_record,
                result,
                artifacts: Vec::new(),
                deliveries: Vec::new(),
            };

            if !outcome.result.is_successful() {
                info!("Verdict unsuccessful — no artifacts produced");
                return outcome;
            }

            let signed = self
                .collaborators
                .signer
                .sign(proforma, &outcome.proforma, &self.settings.overlays)
                .await;
            outcome.artifacts.push(report(ArtifactKind::SignedCopy, signed));

            let instruction = self.collaborators.renderer.render(&outcome.proforma).await;
            outcome
                .artifacts
                .push(report(ArtifactKind::PaymentInstruction, instruction));

            for artifact in &outcome.artifacts {
                let delivery = self.deliver(artifact, &outcome.proforma).await;
                outcome.deliveries.push(delivery);
            }

            outcome
        }
        .instrument(span)
        .await
    }

    async fn deliver(&self, report: &ArtifactReport, record: &DocumentRecord) -> DeliveryReport {
        let routing = self.settings.delivery.routing;
        let party = match report.kind {
            ArtifactKind::SignedCopy => routing.signed_copy,
            ArtifactKind::PaymentInstruction => routing.payment_instruction,
        };
        let recipient = self.settings.delivery.address(party).to_string();

        let status = match report.artifact() {
            None => {
                warn!(kind = %report.kind, "Artifact missing — delivery skipped");
                DeliveryStatus::Skipped
            }
            Some(artifact) => {
                let notification = Notification {
                    to: &recipient,
                    subject: subject(report.kind, record),
                    body: body(report.kind, record),
                    attachment: artifact,
                };
                match self.collaborators.notifier.send(&notification).await {
                    Ok(()) => DeliveryStatus::Sent,
                    Err(e) => {
                        warn!(kind = %report.kind, to = %recipient, error = %e, "Delivery failed");
                        DeliveryStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            }
        };

        DeliveryReport {
            kind: report.kind,
            party,
            recipient,
            status,
        }
    }
}

fn report(kind: ArtifactKind, result: Result<Artifact, ArtifactError>) -> ArtifactReport {
    let status = match result {
        Ok(artifact) => {
            info!(kind = %kind, file = %artifact.file_name, "Artifact produced");
            ArtifactStatus::Produced { artifact }
        }
        Err(e) => {
            warn!(kind = %kind, error = %e, "Artifact failed");
            ArtifactStatus::Failed {
                error: e.to_string(),
            }
        }
    };
    ArtifactReport { kind, status }
}

fn contract_no(record: &DocumentRecord) -> &str {
    record.text(FieldName::ContractNo).unwrap_or("unknown")
}

fn subject(kind: ArtifactKind, record: &DocumentRecord) -> String {
    match kind {
        ArtifactKind::SignedCopy => format!("Signed proforma invoice, contract {}", contract_no(record)),
        ArtifactKind::PaymentInstruction => {
            format!("Payment instruction, contract {}", contract_no(record))
        }
    }
}

fn body(kind: ArtifactKind, record: &DocumentRecord) -> String {
    format!(
        "The proforma invoice and the agreement for contract {} match on every checked field.\n\
         Please find the {kind} attached.\n",
        contract_no(record)
    )
}
