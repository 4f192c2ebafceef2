// src/notify.rs

use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine;
use google_gmail1::api::{Message, Scope};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::artifact::Artifact;
use crate::error::ArtifactError;
use crate::gmail_hub::GmailHub;

/// Base64 line length for MIME bodies (RFC 2045).
const MIME_LINE: usize = 76;

#[derive(Debug)]
pub struct Notification<'a> {
    pub to: &'a str,
    pub subject: String,
    pub body: String,
    pub attachment: &'a Artifact,
}

/// Delivers one message with one attachment. Decides nothing about who
/// receives what.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification<'_>) -> Result<(), ArtifactError>;
}

/// Logs the notification instead of sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification<'_>) -> Result<(), ArtifactError> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            attachment = %notification.attachment.file_name,
            bytes = notification.attachment.content.len(),
            "Dry run: notification not sent"
        );
        Ok(())
    }
}

pub struct GmailNotifier {
    hub: GmailHub,
    user: String,
    from: String,
}

impl GmailNotifier {
    pub fn new(hub: GmailHub, user: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            hub,
            user: user.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for GmailNotifier {
    async fn send(&self, notification: &Notification<'_>) -> Result<(), ArtifactError> {
        let raw = build_mime_message(&self.from, notification);
        let mime_type: mime::Mime = "message/rfc822"
            .parse()
            .map_err(|e: mime::FromStrError| ArtifactError::Notify(e.to_string()))?;

        info!(to = %notification.to, bytes = raw.len(), "Sending notification");
        let (_, sent) = self
            .hub
            .users()
            .messages_send(Message::default(), &self.user)
            .add_scope(Scope::Send)
            .upload(Cursor::new(raw), mime_type)
            .await
            .map_err(|e| ArtifactError::Notify(e.to_string()))?;

        info!(to = %notification.to, id = ?sent.id, "Notification sent");
        Ok(())
    }
}

/// RFC 822 message with a plain-text body and the artifact as a base64
/// attachment.
pub fn build_mime_message(from: &str, notification: &Notification<'_>) -> Vec<u8> {
    let attachment = notification.attachment;
    let boundary = boundary_for(&attachment.content);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&attachment.content);

    let mut msg = String::new();
    msg.push_str(&format!("From: {from}\r\n"));
    msg.push_str(&format!("To: {}\r\n", notification.to));
    msg.push_str(&format!("Subject: {}\r\n", notification.subject));
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    msg.push_str(&format!("--{boundary}\r\n"));
    msg.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    msg.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
    msg.push_str(&notification.body);
    msg.push_str("\r\n");

    msg.push_str(&format!("--{boundary}\r\n"));
    msg.push_str(&format!(
        "Content-Type: application/pdf; name=\"{}\"\r\n",
        attachment.file_name
    ));
    msg.push_str(&format!(
        "Content-Disposition: attachment; filename=\"{}\"\r\n",
        attachment.file_name
    ));
    msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    // base64 output is ASCII, so byte chunks are valid str slices
    for chunk in encoded.as_bytes().chunks(MIME_LINE) {
        msg.push_str(&String::from_utf8_lossy(chunk));
        msg.push_str("\r\n");
    }
    msg.push_str(&format!("--{boundary}--\r\n"));

    msg.into_bytes()
}

fn boundary_for(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = format!("{:x}", hasher.finalize());
    format!("=_trade_recon_{}", &digest[..24])
}
