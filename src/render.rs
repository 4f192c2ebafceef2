// src/render.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::artifact::{
    Artifact, ArtifactKind, DocumentSigner, Overlay, Overlays, PaymentInstructionRenderer,
    SourceDocument,
};
use crate::error::ArtifactError;
use crate::record::{DocumentRecord, FieldValue};
use crate::rules::FieldName;

/// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 15;

/// Fields printed on the payment instruction, in order.
const INSTRUCTION_FIELDS: [(FieldName, &str); 9] = [
    (FieldName::ContractNo, "Contract No"),
    (FieldName::Date, "Date"),
    (FieldName::CompanyName, "Beneficiary"),
    (FieldName::SellerBank, "Beneficiary Bank"),
    (FieldName::AccountNo, "Account No"),
    (FieldName::Swift, "SWIFT"),
    (FieldName::AmountWords, "Amount"),
    (FieldName::PaymentTerms, "Payment Terms"),
    (FieldName::Buyer, "Remitter"),
];

/// Writes rendered PDFs to `output_dir` and keeps their bytes for delivery.
pub struct PdfRenderer {
    output_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    async fn write(
        &self,
        kind: ArtifactKind,
        file_name: String,
        content: Vec<u8>,
    ) -> Result<Artifact, ArtifactError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(&file_name);
        tokio::fs::write(&path, &content).await?;
        info!(kind = %kind, path = %path.display(), bytes = content.len(), "Artifact written");
        Ok(Artifact {
            kind,
            file_name,
            path: Some(path),
            content,
        })
    }
}

#[async_trait]
impl DocumentSigner for PdfRenderer {
    async fn sign(
        &self,
        source: &SourceDocument,
        record: &DocumentRecord,
        overlays: &Overlays,
    ) -> Result<Artifact, ArtifactError> {
        let seal = overlay_digest(&overlays.seal).await?;
        let signature = overlay_digest(&overlays.signature).await?;

        let mut lines = vec![
            "SEALED AND SIGNED COPY".to_string(),
            String::new(),
            format!("Source: {}", source.name),
        ];
        if let Some(contract) = record.text(FieldName::ContractNo) {
            lines.push(format!("Contract No: {contract}"));
        }
        lines.push(format!("Seal: {} (sha256 {seal})", overlays.seal.name));
        lines.push(format!(
            "Signature: {} (sha256 {signature})",
            overlays.signature.name
        ));

        let bytes = source.bytes.clone();
        let content = tokio::task::spawn_blocking(move || append_text_page(&bytes, &lines))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))??;

        self.write(ArtifactKind::SignedCopy, signed_file_name(&source.name), content)
            .await
    }
}

#[async_trait]
impl PaymentInstructionRenderer for PdfRenderer {
    async fn render(&self, record: &DocumentRecord) -> Result<Artifact, ArtifactError> {
        let lines = payment_instruction_lines(record);
        let content = tokio::task::spawn_blocking(move || text_pdf(&lines))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))??;

        let contract = record
            .text(FieldName::ContractNo)
            .unwrap_or("unknown")
            .to_string();
        self.write(
            ArtifactKind::PaymentInstruction,
            format!("payment_instruction_{contract}.pdf"),
            content,
        )
        .await
    }
}

async fn overlay_digest(overlay: &Overlay) -> Result<String, ArtifactError> {
    let bytes = tokio::fs::read(&overlay.path)
        .await
        .map_err(|source| ArtifactError::Overlay {
            name: overlay.name.clone(),
            path: overlay.path.clone(),
            source,
        })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// `invoice.pdf` -> `invoice_signed.pdf`
fn signed_file_name(source: &str) -> String {
    let path = Path::new(source);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}_signed.pdf")
}

pub fn payment_instruction_lines(record: &DocumentRecord) -> Vec<String> {
    let mut lines = vec!["PAYMENT INSTRUCTION".to_string(), String::new()];
    for (field, label) in INSTRUCTION_FIELDS {
        if let Some(value) = record.get(field) {
            lines.push(format!("{label}: {value}"));
        }
    }
    if let Some(FieldValue::Items(items)) = record.get(FieldName::LineItems) {
        lines.push(String::new());
        lines.push("Goods:".to_string());
        lines.extend(items.iter().map(|item| format!("  {item}")));
    }
    lines
}

fn text_content(lines: &[String]) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Adds a Helvetica text page under `parent` and returns its id.
fn add_text_page(
    doc: &mut Document,
    parent: lopdf::ObjectId,
    lines: &[String],
) -> Result<lopdf::ObjectId, lopdf::Error> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, text_content(lines).encode()?));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    }))
}

/// A one-page PDF listing `lines`.
pub fn text_pdf(lines: &[String]) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = add_text_page(&mut doc, pages_id, lines)?;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Copy of `source` with one extra page listing `lines` at the end.
pub fn append_text_page(source: &[u8], lines: &[String]) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::load_mem(source)?;
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let pages_id = doc.get_object(root_id)?.as_dict()?.get(b"Pages")?.as_reference()?;
    let page_id = add_text_page(&mut doc, pages_id, lines)?;

    // Kids and Count may be stored as indirect objects.
    let (kids_ref, count) = {
        let pages = doc.get_object(pages_id)?.as_dict()?;
        let kids_ref = pages.get(b"Kids")?.as_reference().ok();
        let (_, count) = doc.dereference(pages.get(b"Count")?)?;
        (kids_ref, count.as_i64()?)
    };
    let kids = match kids_ref {
        Some(id) => doc.get_object_mut(id)?,
        None => doc.get_object_mut(pages_id)?.as_dict_mut()?.get_mut(b"Kids")?,
    };
    kids.as_array_mut()?.push(page_id.into());
    doc.get_object_mut(pages_id)?
        .as_dict_mut()?
        .set("Count", count + 1);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
