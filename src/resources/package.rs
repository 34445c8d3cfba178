//! Package handler (apt + cargo).
//!
//! The runner never installs packages itself: it asks a `PackageManager`.
//! `SystemPackages` is the real collaborator and shells out to the provider.

use crate::transport::local;

/// Providers with generated check/install scripts.
pub const PROVIDERS: &[&str] = &["apt", "cargo"];

/// External package-installation collaborator.
pub trait PackageManager {
    /// Query whether `package` is present. `Err` means the query itself
    /// could not run.
    fn is_installed(&mut self, package: &str, provider: &str) -> Result<bool, String>;

    /// Install `package`. `Err` carries the failure detail.
    fn install(&mut self, package: &str, provider: &str) -> Result<(), String>;
}

/// Shells out to dpkg/apt-get or cargo on the local host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPackages;

impl PackageManager for SystemPackages {
    fn is_installed(&mut self, package: &str, provider: &str) -> Result<bool, String> {
        let script = check_script(package, provider)?;
        let out = local::exec_local(&script)?;
        Ok(out.success())
    }

    fn install(&mut self, package: &str, provider: &str) -> Result<(), String> {
        let script = install_script(package, provider)?;
        let out = local::exec_local(&script)?;
        if out.success() {
            Ok(())
        } else {
            Err(format!("exit code {}: {}", out.exit_code, out.stderr.trim()))
        }
    }
}

/// Single-quote a value for bash, escaping embedded quotes.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Generate a script that exits 0 iff the package is installed.
pub fn check_script(package: &str, provider: &str) -> Result<String, String> {
    let q = shell_quote(package);
    match provider {
        "apt" => Ok(format!(
            "dpkg-query -W -f '${{Status}}' {q} 2>/dev/null | grep -q 'install ok installed'"
        )),
        "cargo" => Ok(format!("command -v {q} >/dev/null 2>&1")),
        other => Err(format!("unsupported package provider: {}", other)),
    }
}

/// Generate a script that installs the package and checks the postcondition.
pub fn install_script(package: &str, provider: &str) -> Result<String, String> {
    let q = shell_quote(package);
    match provider {
        "apt" => Ok(format!(
            "set -euo pipefail\n\
             apt-get update -qq\n\
             DEBIAN_FRONTEND=noninteractive apt-get install -y -qq {q}\n\
             # Postcondition: package installed\n\
             dpkg-query -W -f '${{Status}}' {q} | grep -q 'install ok installed'"
        )),
        "cargo" => Ok(format!(
            "set -euo pipefail\n\
             cargo install {q}\n\
             command -v {q} >/dev/null 2>&1"
        )),
        other => Err(format!("unsupported package provider: {}", other)),
    }
}
