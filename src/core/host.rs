//! Host identifier lookup and per-host directory derivation.

use std::path::{Path, PathBuf};

/// Local hostname from `gethostname(2)`, trailing whitespace trimmed.
pub fn local_hostname() -> Result<String, String> {
    let raw = nix::unistd::gethostname().map_err(|e| format!("gethostname failed: {}", e))?;
    parse_host(&raw.to_string_lossy()).map_err(|e| format!("gethostname: {}", e))
}

/// Normalize a host identifier, rejecting one that is empty after trimming.
pub fn parse_host(raw: &str) -> Result<String, String> {
    let name = normalize_host(raw);
    if name.is_empty() {
        return Err("empty host identifier".to_string());
    }
    Ok(name)
}

/// Trim trailing whitespace and newlines from a host identifier.
pub fn normalize_host(raw: &str) -> String {
    raw.trim_end().to_string()
}

/// `<base>/<host>`: the per-host working directory.
pub fn host_dir(base: &Path, host: &str) -> PathBuf {
    base.join(host)
}
