//! CI image bootstrap: system packages followed by a default test install.

use std::path::Path;

use crate::error::Result;
use crate::install::{InstallOptions, InstallPaths, Installer};
use crate::process::Shell;

/// Installs the `svn` and `mysql` clients.
pub const APT_INSTALL: &str =
    "sudo apt-get update && sudo apt-get install -y subversion default-mysql-client";

/// Install options used by the bootstrap: `wordpress_test` as root on 127.0.0.1.
pub fn bootstrap_options() -> InstallOptions {
    let mut options = InstallOptions::new("wordpress_test", "root");
    options.db_host = "127.0.0.1".to_string();
    options
}

/// Installs system packages through `sh -c`.
pub fn install_system_packages(shell: &Shell, cwd: &Path) -> Result<()> {
    tracing::info!("installing system packages");
    let output = shell.run_script(APT_INSTALL, cwd)?;
    tracing::debug!(output = %output.trim(), "apt-get finished");
    Ok(())
}

/// Installs system packages, then the latest WordPress test environment.
pub async fn install_dependencies(
    shell: &Shell,
    installer: &Installer,
    cwd: &Path,
) -> Result<InstallPaths> {
    install_system_packages(shell, cwd)?;
    installer.install(&bootstrap_options()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_installs_latest_as_root() {
        let options = bootstrap_options();
        assert_eq!(options.db_name, "wordpress_test");
        assert_eq!(options.db_user, "root");
        assert_eq!(options.db_pass, "");
        assert_eq!(options.db_host, "127.0.0.1");
        assert_eq!(options.wp_version, "latest");
        assert!(!options.skip_db);
    }

    #[test]
    fn apt_command_installs_clients() {
        assert!(APT_INSTALL.contains("subversion"));
        assert!(APT_INSTALL.contains("default-mysql-client"));
    }
}
