use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

pub const DEFAULT_DATA_DIR: &str = "data";
const WRITE_PROBE: &str = ".write_test";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "QUESTION_BANK_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Directory holding the database, attachments and backups.
    #[arg(long, env = "QUESTION_BANK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Largest accepted upload, in megabytes.
    #[arg(long, env = "QUESTION_BANK_MAX_UPLOAD_MB", default_value_t = 50)]
    pub max_upload_mb: usize,

    /// Seed the catalog and sample questions when the database is empty.
    #[arg(long, env = "QUESTION_BANK_SEED")]
    pub seed: bool,
}

impl Config {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

pub fn ensure_dir_writable(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let test_path = dir.join(WRITE_PROBE);
    fs::write(&test_path, b"test")?;
    fs::remove_file(&test_path)?;
    Ok(())
}

fn exe_data_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.join(DEFAULT_DATA_DIR)))
}

/// An explicit directory must be writable. Without one, `./data` is tried
/// first and then a `data/` directory next to the executable.
pub fn resolve_data_dir(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = &config.data_dir {
        ensure_dir_writable(dir)
            .with_context(|| format!("data directory {} is not writable", dir.display()))?;
        return Ok(dir.clone());
    }
    let mut candidates = vec![PathBuf::from(DEFAULT_DATA_DIR)];
    candidates.extend(exe_data_dir());
    for candidate in candidates {
        match ensure_dir_writable(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) => {
                tracing::warn!(path = %candidate.display(), error = %err, "data directory not writable");
            }
        }
    }
    Err(anyhow!("no writable data directory found"))
}
