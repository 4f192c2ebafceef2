// src/main.rs

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trade_recon::artifact::{Overlays, SourceDocument};
use trade_recon::cli::{Cli, Commands};
use trade_recon::config::Config;
use trade_recon::error::ExtractError;
use trade_recon::notify::{GmailNotifier, LogNotifier, Notifier};
use trade_recon::reconcile::{Collaborators, ReconcileSettings, Reconciler};
use trade_recon::render::PdfRenderer;
use trade_recon::text_source::{PdfTextSource, TextSource};
use trade_recon::{RuleTable, export, extract, gmail_hub, rules, simple_refresh};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Install crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let rules_path = cli.rules.clone().or_else(|| cfg.compare.rules_file.clone());
    let table: Arc<RuleTable> = match rules_path {
        Some(path) => Arc::new(RuleTable::load(&path)?),
        None => Arc::new(rules::builtin()?.clone()),
    };
    info!(version = table.version(), "Rules loaded");

    match cli.command {
        Commands::Compare {
            proforma,
            agreement,
            csv,
            dry_run,
            evaluate_only,
        } => {
            let source = PdfTextSource::default();
            let proforma = read_document(&source, &proforma).await?;
            let agreement = read_document(&source, &agreement).await?;

            let notifier: Arc<dyn Notifier> = match (&cfg.gmail, dry_run || cfg.delivery.dry_run) {
                (Some(gmail), false) => {
                    let hub = gmail_hub::create_hub(gmail, &cli.config).await?;
                    Arc::new(GmailNotifier::new(hub, gmail.user.clone(), cfg.delivery.sender.clone()))
                }
                (None, false) => {
                    warn!("No [gmail_oauth] section — notifications are logged only");
                    Arc::new(LogNotifier)
                }
                (_, true) => Arc::new(LogNotifier),
            };
            let renderer = Arc::new(PdfRenderer::new(&cfg.output_dir));

            let reconciler = Reconciler::new(
                table,
                ReconcileSettings {
                    sentinel_policy: cfg.compare.sentinel_policy,
                    delivery: cfg.delivery.clone(),
                    overlays: Overlays::from(&cfg.overlays),
                },
                Collaborators {
                    signer: renderer.clone(),
                    renderer,
                    notifier,
                },
            );

            let json = if evaluate_only {
                let eval = reconciler.evaluate(&proforma.text, &agreement.text);
                if let Some(path) = &csv {
                    export::write_csv_file(path, &eval.proforma, &eval.agreement, &eval.result)?;
                }
                serde_json::to_string_pretty(&eval)?
            } else {
                let outcome = reconciler.reconcile(&proforma, &agreement).await;
                if let Some(path) = &csv {
                    export::write_csv_file(path, &outcome.proforma, &outcome.agreement, &outcome.result)?;
                }
                serde_json::to_string_pretty(&outcome)?
            };
            println!("{json}");
        }
        Commands::Extract { pdf, role } => {
            let source = PdfTextSource::default();
            let document = read_document(&source, &pdf).await?;
            let record = extract(&document.text, &table, role.into());
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::RefreshToken => {
            let gmail = cfg.gmail.as_ref().ok_or("No [gmail_oauth] section in config")?;
            let token = simple_refresh::manual_refresh(gmail).await?;
            let expires_at = time::OffsetDateTime::now_utc() + time::Duration::seconds(token.expires_in);
            Config::update_access_token(&cli.config, &token.access_token, Some(expires_at.unix_timestamp()))?;
            info!(expires_in = token.expires_in, "Access token refreshed");
        }
    }

    Ok(())
}

async fn read_document(source: &PdfTextSource, path: &Path) -> Result<SourceDocument, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ExtractError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let text = source.text(&bytes)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    info!(document = %name, bytes = bytes.len(), chars = text.len(), "Document read");
    Ok(SourceDocument::new(name, bytes, text))
}
