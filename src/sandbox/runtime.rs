//! Container runtime selection.
//!
//! The host is probed once for `docker`, then `podman`; the choice is stable
//! for the process lifetime.

use once_cell::sync::OnceCell;

use crate::error::{Error, Result};

const CANDIDATES: [&str; 2] = ["docker", "podman"];

static RUNTIME: OnceCell<String> = OnceCell::new();

pub fn container_runtime() -> Result<&'static str> {
    let name = RUNTIME.get_or_try_init(|| {
        for candidate in CANDIDATES {
            if probe(candidate) {
                tracing::info!(runtime = candidate, "container runtime selected");
                return Ok(candidate.to_string());
            }
        }
        Err(Error::RuntimeUnavailable)
    })?;
    Ok(name.as_str())
}

fn probe(name: &str) -> bool {
    std::process::Command::new(name)
        .arg("version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
