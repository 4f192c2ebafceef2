// src/cli.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::rules::DocumentRole;

pub const DEFAULT_CONFIG_PATH: &str = ".config/trade_recon.toml";

#[derive(Parser, Debug)]
#[command(
    name = "trade_recon",
    version,
    about = "Reconcile a proforma invoice against its sales agreement"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH, help = "Path to the TOML config")]
    pub config: PathBuf,
    #[arg(long, global = true, help = "Rule table TOML; overrides [compare].rules_file")]
    pub rules: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two documents and, on success, sign and deliver.
    Compare {
        proforma: PathBuf,
        agreement: PathBuf,
        #[arg(long, help = "Also write the field-by-field audit as CSV")]
        csv: Option<PathBuf>,
        #[arg(long, default_value_t = false, help = "Log notifications instead of sending them")]
        dry_run: bool,
        #[arg(long, default_value_t = false, help = "Stop after the verdict; produce no artifacts")]
        evaluate_only: bool,
    },
    /// Print the fields extracted from one document.
    Extract {
        pdf: PathBuf,
        #[arg(long, value_enum, default_value_t = RoleArg::Proforma)]
        role: RoleArg,
    },
    /// Exchange the refresh token for a new access token and store it.
    RefreshToken,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    Proforma,
    Agreement,
}

impl From<RoleArg> for DocumentRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Proforma => DocumentRole::Proforma,
            RoleArg::Agreement => DocumentRole::Agreement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compare_with_globals() {
        let cli = Cli::try_parse_from([
            "trade_recon",
            "--config",
            "recon.toml",
            "compare",
            "pi.pdf",
            "sa.pdf",
            "--csv",
            "audit.csv",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("recon.toml"));
        match cli.command {
            Commands::Compare {
                proforma,
                csv,
                dry_run,
                evaluate_only,
                ..
            } => {
                assert_eq!(proforma, PathBuf::from("pi.pdf"));
                assert_eq!(csv, Some(PathBuf::from("audit.csv")));
                assert!(dry_run);
                assert!(!evaluate_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn extract_role_defaults_to_proforma() {
        let cli = Cli::try_parse_from(["trade_recon", "extract", "doc.pdf"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Commands::Extract { role, .. } => {
                assert_eq!(DocumentRole::from(role), DocumentRole::Proforma)
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn compare_requires_two_documents() {
        assert!(Cli::try_parse_from(["trade_recon", "compare", "pi.pdf"]).is_err());
    }
}
