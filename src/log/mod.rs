use fs_err as fs;
use serde_json::{json, to_string_pretty};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::provider::ModelCall;

/// Structured logs go to stderr so stdout stays pipeable (`copy` output).
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: PathBuf,
    pub response: PathBuf,
}

fn run_dir(data_dir: &Path, run: Uuid) -> PathBuf {
    data_dir.join("runs").join(run.to_string())
}

/// Keeps the exact call and the untouched model text of one generation.
pub fn save_exchange(
    data_dir: &Path,
    run: Uuid,
    call: &ModelCall,
    raw: &str,
) -> anyhow::Result<SavedPaths> {
    let dir = run_dir(data_dir, run);
    fs::create_dir_all(&dir)?;

    let request = dir.join("request.json");
    let body = json!({
        "instruction": call.instruction,
        "schema": call.schema,
        "temperature": call.temperature,
    });
    fs::write(&request, to_string_pretty(&body)?)?;

    let response = dir.join("response.txt");
    fs::write(&response, raw)?;

    Ok(SavedPaths { dir, request, response })
}
