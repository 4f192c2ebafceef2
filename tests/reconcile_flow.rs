use std::path::Path;
use std::sync::Arc;

use lopdf::Document;
use trade_recon::artifact::{ArtifactKind, Overlay, Overlays, SourceDocument};
use trade_recon::compare::SentinelPolicy;
use trade_recon::config::{DeliveryConfig, Routing};
use trade_recon::notify::LogNotifier;
use trade_recon::reconcile::{
    ArtifactStatus, Collaborators, DeliveryStatus, ReconcileSettings, Reconciler,
};
use trade_recon::render::{PdfRenderer, text_pdf};
use trade_recon::{FieldName, export, rules};

const PROFORMA: &[&str] = &[
    "PROFORMA INVOICE",
    "Company Name: Sunrise Agro Exports Pvt Ltd",
    "Contract No: SAE-2024-118",
    "Date: 05.06.2024",
    "Seller's Bank: State Bank of India, Kandla Branch",
    "Account No: 3021 4455 9001",
    "SWIFT Code: SBININBB104",
    "Net Weight: 25,000.00",
    "Gross Weight: 25,150.00",
    "Loading Port: Kandla, Gujarat, India",
    "Destination Port: Port Klang, Malaysia",
    "Buyer: Straits Commodities Sdn Bhd",
];

const AGREEMENT: &[&str] = &[
    "SALES AGREEMENT",
    "Company Name: SUNRISE AGRO EXPORTS PVT. LTD.",
    "Contract No. SAE/2024/118",
    "Date: 05-06-2024",
    "Seller's Bank: State Bank of India - Kandla Branch",
    "Account No: 302144559001",
    "SWIFT Code: sbininbb104",
    "Net Weight: 25000.00",
    "Gross Weight: 25150.00",
    "Loading Port: Kandla",
    "Destination Port: Port Klang",
    "Buyer: Straits Commodities Sdn. Bhd.",
];

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

fn document(name: &str, lines: &[&str]) -> SourceDocument {
    let bytes = text_pdf(&owned(lines)).unwrap();
    SourceDocument::new(name, bytes, lines.join("\n"))
}

fn overlays(dir: &Path) -> Overlays {
    let seal = dir.join("seal.png");
    let sign = dir.join("sign.png");
    std::fs::write(&seal, b"seal image").unwrap();
    std::fs::write(&sign, b"signature image").unwrap();
    Overlays {
        seal: Overlay {
            name: "seal.png".into(),
            path: seal,
        },
        signature: Overlay {
            name: "sign.png".into(),
            path: sign,
        },
    }
}

fn reconciler(dir: &Path, overlays: Overlays) -> Reconciler {
    let renderer = Arc::new(PdfRenderer::new(dir.join("out")));
    Reconciler::new(
        Arc::new(rules::builtin().unwrap().clone()),
        ReconcileSettings {
            sentinel_policy: SentinelPolicy::Match,
            delivery: DeliveryConfig {
                sender: "docs@sunrise.example".into(),
                buyer: "ap@straits.example".into(),
                seller: "sales@sunrise.example".into(),
                routing: Routing::default(),
                dry_run: true,
            },
            overlays,
        },
        Collaborators {
            signer: renderer.clone(),
            renderer,
            notifier: Arc::new(LogNotifier),
        },
    )
}

#[tokio::test]
async fn matching_pair_produces_signed_copy_and_instruction() {
    let dir = tempfile::tempdir().unwrap();
    let r = reconciler(dir.path(), overlays(dir.path()));

    let outcome = r
        .reconcile(
            &document("proforma_118", PROFORMA),
            &document("agreement_118", AGREEMENT),
        )
        .await;

    assert!(outcome.result.is_successful(), "{:?}", outcome.result);
    assert_eq!(outcome.result.get(FieldName::LoadingPort), Some(true));

    let signed = outcome
        .artifact(ArtifactKind::SignedCopy)
        .and_then(|a| a.artifact())
        .expect("signed copy");
    assert_eq!(signed.file_name, "proforma_118_signed.pdf");
    let doc = Document::load_mem(&signed.content).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    assert!(dir.path().join("out/proforma_118_signed.pdf").exists());

    let instruction = outcome
        .artifact(ArtifactKind::PaymentInstruction)
        .and_then(|a| a.artifact())
        .expect("payment instruction");
    assert_eq!(instruction.file_name, "payment_instruction_sae2024118.pdf");

    assert_eq!(outcome.deliveries.len(), 2);
    assert!(outcome.deliveries.iter().all(|d| d.status == DeliveryStatus::Sent));
}

#[tokio::test]
async fn missing_overlay_fails_only_the_signed_copy() {
    let dir = tempfile::tempdir().unwrap();
    let mut overlays = overlays(dir.path());
    overlays.seal.path = dir.path().join("no_such_seal.png");
    let r = reconciler(dir.path(), overlays);

    let outcome = r
        .reconcile(
            &document("proforma_118", PROFORMA),
            &document("agreement_118", AGREEMENT),
        )
        .await;

    assert!(outcome.result.is_successful());
    let signed = outcome.artifact(ArtifactKind::SignedCopy).unwrap();
    match &signed.status {
        ArtifactStatus::Failed { error } => assert!(error.contains("seal.png"), "{error}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        outcome.delivery(ArtifactKind::SignedCopy).unwrap().status,
        DeliveryStatus::Skipped
    );
    assert_eq!(
        outcome.delivery(ArtifactKind::PaymentInstruction).unwrap().status,
        DeliveryStatus::Sent
    );
}

#[tokio::test]
async fn mismatched_pair_is_audited_and_produces_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let r = reconciler(dir.path(), overlays(dir.path()));

    let mut agreement = AGREEMENT.to_vec();
    agreement[6] = "SWIFT Code: HDFCINBB";
    let outcome = r
        .reconcile(
            &document("proforma_118", PROFORMA),
            &document("agreement_118", &agreement),
        )
        .await;

    assert!(!outcome.result.is_successful());
    assert_eq!(outcome.result.mismatched().collect::<Vec<_>>(), vec![FieldName::Swift]);
    assert!(outcome.artifacts.is_empty());
    assert!(!dir.path().join("out").exists());

    let csv_path = dir.path().join("audit.csv");
    export::write_csv_file(&csv_path, &outcome.proforma, &outcome.agreement, &outcome.result)
        .unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("swift,sbininbb104,hdfcinbb,false"));
    assert!(csv.trim_end().ends_with("verdict,,,unsuccessful"));
}

#[test]
fn outcome_serializes_verdict_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let r = reconciler(dir.path(), overlays(dir.path()));
    let eval = r.evaluate(&PROFORMA.join("\n"), &AGREEMENT.join("\n"));
    let json = serde_json::to_value(&eval).unwrap();
    assert_eq!(json["result"]["verdict"], "successful");
    assert_eq!(json["result"]["matches"]["contract_no"], true);
    assert_eq!(json["proforma"]["role"], "proforma");
}
