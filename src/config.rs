#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::storage::StorageGateway;

pub const DEFAULT_REGION: &str = "eu-central-1";
pub const DEFAULT_EDITOR: &str = "vim";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// AWS S3 or any S3-compatible endpoint.
    S3,
    /// Seeded in-process store; needs no credentials.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Listing {
    Tree,
    Paged,
}

/// Command-line configuration; unset flags fall back to the environment.
#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal browser for S3 buckets")]
pub struct Args {
    /// Region for new buckets and the client (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// S3-compatible endpoint, e.g. a local MinIO (overrides S3_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    #[arg(long, value_enum, default_value_t = Backend::S3)]
    pub backend: Backend,

    /// Editor command line (overrides EDITOR)
    #[arg(long)]
    pub editor: Option<String>,

    /// What opening a bucket shows
    #[arg(long, value_enum, default_value_t = Listing::Tree)]
    pub listing: Listing,

    /// Rows per page in the paged listing
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Fetch every object's content when opening the paged listing
    #[arg(long)]
    pub prefetch_content: bool,

    /// Log file (overrides BUCKETCOMMANDER_LOG)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub backend: Backend,
    pub editor: String,
    pub listing: Listing,
    pub page_size: usize,
    pub prefetch_content: bool,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            backend: Backend::S3,
            editor: DEFAULT_EDITOR.to_string(),
            listing: Listing::Tree,
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_content: false,
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    env::temp_dir().join("bucketcommander.log")
}

impl AppConfig {
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::merge(args, |name| env::var(name).ok())
    }

    /// Flags win over environment values, which win over defaults.
    pub fn merge(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if args.page_size == 0 {
            anyhow::bail!("--page-size must be at least 1");
        }
        let region = args
            .region
            .or_else(|| non_empty("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let log_file = match args.log_file {
            Some(path) => path,
            None => non_empty("BUCKETCOMMANDER_LOG").map(PathBuf::from).unwrap_or_else(default_log_file),
        };
        let cfg = Self {
            region,
            endpoint_url: args.endpoint_url.or_else(|| non_empty("S3_ENDPOINT_URL")),
            backend: args.backend,
            editor: args
                .editor
                .or_else(|| non_empty("EDITOR"))
                .unwrap_or_else(|| DEFAULT_EDITOR.to_string()),
            listing: args.listing,
            page_size: args.page_size,
            prefetch_content: args.prefetch_content,
            log_file,
        };
        if let Some(url) = &cfg.endpoint_url {
            url::Url::parse(url).with_context(|| format!("parsing endpoint url `{url}`"))?;
        }
        Ok(cfg)
    }
}

/// Everything the views need from outside, built once before the event loop.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub gateway: Arc<dyn StorageGateway>,
}

impl AppContext {
    pub fn new(config: AppConfig, gateway: Arc<dyn StorageGateway>) -> Self {
        Self { config, gateway }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str], env: &[(&str, &str)]) -> Result<AppConfig> {
        let args = Args::try_parse_from(std::iter::once("bucketcommander").chain(argv.iter().copied()))?;
        AppConfig::merge(args, |name| {
            env.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn defaults_without_flags_or_env() {
        let cfg = parse(&[], &[]).unwrap();
        assert_eq!(cfg.region, "eu-central-1");
        assert_eq!(cfg.editor, "vim");
        assert_eq!(cfg.backend, Backend::S3);
        assert_eq!(cfg.listing, Listing::Tree);
        assert_eq!(cfg.page_size, 10);
        assert!(!cfg.prefetch_content);
        assert!(cfg.log_file.ends_with("bucketcommander.log"));
    }

    #[test]
    fn env_fills_unset_flags() {
        let cfg = parse(
            &["--backend", "memory"],
            &[("AWS_REGION", "us-west-2"), ("EDITOR", "nano"), ("BUCKETCOMMANDER_LOG", "/var/log/bc.log")],
        )
        .unwrap();
        assert_eq!(cfg.region, "us-west-2");
        assert_eq!(cfg.editor, "nano");
        assert_eq!(cfg.backend, Backend::Memory);
        assert_eq!(cfg.log_file, PathBuf::from("/var/log/bc.log"));
    }

    #[test]
    fn flags_win_over_env() {
        let cfg = parse(
            &["--region", "ap-south-1", "--editor", "code --wait", "--listing", "paged", "--page-size", "4"],
            &[("AWS_REGION", "us-west-2"), ("EDITOR", "nano")],
        )
        .unwrap();
        assert_eq!(cfg.region, "ap-south-1");
        assert_eq!(cfg.editor, "code --wait");
        assert_eq!(cfg.listing, Listing::Paged);
        assert_eq!(cfg.page_size, 4);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = parse(&[], &[("EDITOR", "  "), ("AWS_REGION", "")]).unwrap();
        assert_eq!(cfg.editor, "vim");
        assert_eq!(cfg.region, "eu-central-1");
    }

    #[test]
    fn rejects_zero_page_size_and_bad_endpoint() {
        assert!(parse(&["--page-size", "0"], &[]).is_err());
        assert!(parse(&["--endpoint-url", "not a url"], &[]).is_err());
        let cfg = parse(&[], &[("S3_ENDPOINT_URL", "http://localhost:9000")]).unwrap();
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:9000"));
    }
}
