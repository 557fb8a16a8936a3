//! WordPress PHPUnit test environment installer.
//!
//! Installs WordPress core and the develop-repo test fixtures for a requested
//! version into a work directory, renders `wp-tests-config.php` and creates
//! the test database.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::archive;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::process::Shell;
use crate::svn::SvnClient;
use crate::template::TestsConfig;
use crate::version::{self, Endpoints, ResolvedVersion, VersionSpec};

/// Name of the rendered tests config inside the tests directory.
pub const TESTS_CONFIG_FILE: &str = "wp-tests-config.php";

/// Fixture directories checked out from the develop repository.
pub const FIXTURE_DIRS: &[&str] = &["includes", "data"];

/// Installer arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub db_name: String,
    pub db_user: String,
    pub db_pass: String,
    pub db_host: String,
    pub wp_version: String,
    pub skip_db: bool,
    pub work_dir: PathBuf,
}

impl InstallOptions {
    /// Options with the default host, version and a fresh work directory.
    pub fn new(db_name: impl Into<String>, db_user: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            db_user: db_user.into(),
            db_pass: String::new(),
            db_host: "localhost".to_string(),
            wp_version: "latest".to_string(),
            skip_db: false,
            work_dir: default_work_dir(),
        }
    }
}

/// A uniquely named directory under the system temp dir.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join(format!("wp-{}", Uuid::new_v4()))
}

/// Interprets the skip-database-creation argument.
pub fn parse_skip_db(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Locations produced by an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub work_dir: PathBuf,
    pub core_dir: PathBuf,
    pub tests_dir: PathBuf,
}

impl InstallPaths {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            core_dir: work_dir.join("wordpress"),
            tests_dir: work_dir.join("wordpress-tests-lib"),
        }
    }

    /// Core directory with a trailing slash, as written to ABSPATH.
    pub fn core_abspath(&self) -> String {
        format!("{}/", self.core_dir.display())
    }

    pub fn tests_config(&self) -> PathBuf {
        self.tests_dir.join(TESTS_CONFIG_FILE)
    }
}

/// SQL run to create the test database.
///
/// E2E jobs get the fixed e2e database, created unconditionally.
pub fn create_database_sql(database: &DatabaseConfig, job: Option<&str>, db_name: &str) -> String {
    if database.is_e2e_job(job) {
        format!("CREATE DATABASE {}", database.e2e_database)
    } else {
        format!("CREATE DATABASE IF NOT EXISTS {}", db_name)
    }
}

/// Arguments for the `mysql` client. A `host:port` host is split.
pub fn mysql_args(user: &str, password: &str, host: &str, sql: &str) -> Vec<String> {
    let mut args = vec![format!("--user={}", user)];
    if !password.is_empty() {
        args.push(format!("--password={}", password));
    }

    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            args.push(format!("--host={}", name));
            args.push(format!("--port={}", port));
            args.push("--protocol=tcp".to_string());
        }
        _ => args.push(format!("--host={}", host)),
    }

    args.push("-e".to_string());
    args.push(sql.to_string());
    args
}

fn is_database_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Extracts a downloaded core archive into the work dir and checks that it
/// produced the core directory.
pub fn unpack_core(archive_path: &Path, paths: &InstallPaths) -> Result<()> {
    archive::extract_zip(archive_path, &paths.work_dir)?;
    if !paths.core_dir.is_dir() {
        return Err(Error::Archive {
            path: archive_path.to_path_buf(),
            reason: format!("archive did not contain {}", paths.core_dir.display()),
        });
    }
    Ok(())
}

/// Removes a directory tree if it exists.
fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Installs test environments.
pub struct Installer {
    http: HttpClient,
    svn: SvnClient,
    shell: Shell,
    endpoints: Endpoints,
    database: DatabaseConfig,
    job: Option<String>,
}

impl Installer {
    pub fn new(
        http: HttpClient,
        shell: Shell,
        endpoints: Endpoints,
        database: DatabaseConfig,
        job: Option<String>,
    ) -> Self {
        Self {
            http,
            svn: SvnClient::new(shell.clone()),
            shell,
            endpoints,
            database,
            job,
        }
    }

    /// Runs the full install and returns the resulting paths.
    pub async fn install(&self, options: &InstallOptions) -> Result<InstallPaths> {
        if !options.skip_db && !is_database_name(&options.db_name) {
            return Err(Error::Config(format!(
                "invalid database name '{}'",
                options.db_name
            )));
        }

        let resolved = self.resolve_version(&options.wp_version).await?;
        tracing::info!(
            requested = %options.wp_version,
            resolved = %resolved,
            "resolved WordPress version"
        );

        std::fs::create_dir_all(&options.work_dir)?;
        let paths = InstallPaths::new(&options.work_dir);
        remove_dir_if_exists(&paths.tests_dir)?;
        remove_dir_if_exists(&paths.core_dir)?;

        self.install_core(&resolved, &paths).await?;
        self.install_test_suite(&resolved, &paths, options).await?;

        if options.skip_db {
            tracing::info!("skipping database creation");
        } else {
            self.create_database(options)?;
        }

        tracing::info!(
            core_dir = %paths.core_dir.display(),
            tests_dir = %paths.tests_dir.display(),
            "test environment installed"
        );
        Ok(paths)
    }

    /// Resolves `requested`, fetching the version-check payload only when needed.
    pub async fn resolve_version(&self, requested: &str) -> Result<ResolvedVersion> {
        let descriptor = if VersionSpec::parse(requested).needs_latest_descriptor() {
            self.http.fetch_text(&self.endpoints.version_check).await?
        } else {
            String::new()
        };
        version::resolve(requested, &descriptor)
    }

    async fn install_core(&self, resolved: &ResolvedVersion, paths: &InstallPaths) -> Result<()> {
        if paths.core_dir.exists() {
            return Err(Error::Config(format!(
                "core directory already exists: {}",
                paths.core_dir.display()
            )));
        }

        let archive_name = if resolved.is_nightly() {
            "wordpress-nightly.zip"
        } else {
            "wordpress.zip"
        };
        let archive_path = paths.work_dir.join(archive_name);

        self.http
            .download(&resolved.core_download_url(&self.endpoints), &archive_path)
            .await?;
        unpack_core(&archive_path, paths)?;

        tracing::info!(core_dir = %paths.core_dir.display(), "installed WordPress core");
        Ok(())
    }

    async fn install_test_suite(
        &self,
        resolved: &ResolvedVersion,
        paths: &InstallPaths,
        options: &InstallOptions,
    ) -> Result<()> {
        if !paths.tests_dir.exists() {
            std::fs::create_dir_all(&paths.tests_dir)?;
            for dir in FIXTURE_DIRS {
                let url = resolved.tests_checkout_url(&self.endpoints, dir);
                self.svn.checkout_quiet(&url, &paths.tests_dir.join(dir))?;
            }
        }

        let config_path = paths.tests_config();
        if !config_path.exists() {
            let sample = self
                .http
                .fetch_text(&resolved.config_template_url(&self.endpoints))
                .await?;
            let config = TestsConfig {
                core_dir: paths.core_abspath(),
                db_name: options.db_name.clone(),
                db_user: options.db_user.clone(),
                db_password: options.db_pass.clone(),
                db_host: options.db_host.clone(),
            };
            std::fs::write(&config_path, config.render(&sample))?;
            tracing::info!(path = %config_path.display(), "wrote tests config");
        }

        Ok(())
    }

    fn create_database(&self, options: &InstallOptions) -> Result<()> {
        let sql = create_database_sql(&self.database, self.job.as_deref(), &options.db_name);
        let args = mysql_args(&options.db_user, &options.db_pass, &options.db_host, &sql);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        tracing::info!(sql = %sql, host = %options.db_host, "creating database");
        let output = self.shell.output("mysql", &args, &options.work_dir)?;
        if !output.success {
            return Err(Error::Database(output.failure_detail()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[&str]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for name in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(b"<?php").unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn skip_db_accepts_truthy_values() {
        assert!(parse_skip_db("true"));
        assert!(parse_skip_db("TRUE"));
        assert!(parse_skip_db("1"));
        assert!(parse_skip_db("yes"));
        assert!(!parse_skip_db("false"));
        assert!(!parse_skip_db(""));
        assert!(!parse_skip_db("0"));
    }

    #[test]
    fn paths_layout() {
        let paths = InstallPaths::new(Path::new("/tmp/wp-1"));
        assert_eq!(paths.core_dir, PathBuf::from("/tmp/wp-1/wordpress"));
        assert_eq!(paths.tests_dir, PathBuf::from("/tmp/wp-1/wordpress-tests-lib"));
        assert_eq!(paths.core_abspath(), "/tmp/wp-1/wordpress/");
        assert_eq!(
            paths.tests_config(),
            PathBuf::from("/tmp/wp-1/wordpress-tests-lib/wp-tests-config.php")
        );
    }

    #[test]
    fn default_work_dirs_are_unique() {
        let a = default_work_dir();
        let b = default_work_dir();
        assert_ne!(a, b);
        assert!(a.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn e2e_job_creates_fixed_database() {
        let database = DatabaseConfig::default();
        assert_eq!(
            create_database_sql(&database, Some("e2e-chrome"), "wordpress_test"),
            "CREATE DATABASE coblocks"
        );
        assert_eq!(
            create_database_sql(&database, Some("php-tests"), "wordpress_test"),
            "CREATE DATABASE IF NOT EXISTS wordpress_test"
        );
        assert_eq!(
            create_database_sql(&database, None, "wordpress_test"),
            "CREATE DATABASE IF NOT EXISTS wordpress_test"
        );
    }

    #[test]
    fn mysql_args_split_host_and_port() {
        let args = mysql_args("root", "", "127.0.0.1:3306", "SELECT 1");
        assert_eq!(
            args,
            vec![
                "--user=root",
                "--host=127.0.0.1",
                "--port=3306",
                "--protocol=tcp",
                "-e",
                "SELECT 1"
            ]
        );
    }

    #[test]
    fn mysql_args_plain_host_with_password() {
        let args = mysql_args("wp", "secret", "localhost", "SELECT 1");
        assert_eq!(
            args,
            vec!["--user=wp", "--password=secret", "--host=localhost", "-e", "SELECT 1"]
        );
    }

    #[test]
    fn unpack_core_extracts_wordpress_dir() {
        let dir = TempDir::new().unwrap();
        let paths = InstallPaths::new(dir.path());
        let archive = dir.path().join("wordpress.zip");
        write_zip(&archive, &["wordpress/index.php", "wordpress/wp-includes/version.php"]);

        unpack_core(&archive, &paths).unwrap();

        assert!(paths.core_dir.join("index.php").is_file());
        assert!(paths.core_dir.join("wp-includes/version.php").is_file());
    }

    #[test]
    fn unpack_core_rejects_archive_without_core() {
        let dir = TempDir::new().unwrap();
        let paths = InstallPaths::new(dir.path());
        let archive = dir.path().join("wordpress.zip");
        write_zip(&archive, &["other/index.php"]);

        let err = unpack_core(&archive, &paths).unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
    }

    #[tokio::test]
    async fn explicit_versions_resolve_without_network() {
        let installer = Installer::new(
            HttpClient::new().unwrap(),
            Shell::default(),
            Endpoints {
                version_check: "http://127.0.0.1:9/unreachable".to_string(),
                ..Endpoints::default()
            },
            DatabaseConfig::default(),
            None,
        );

        let resolved = installer.resolve_version("6.1.2").await.unwrap();
        assert_eq!(resolved.tag_path, "tags/6.1.2");
        let resolved = installer.resolve_version("trunk").await.unwrap();
        assert!(resolved.is_nightly());
    }

    #[tokio::test]
    async fn invalid_database_name_is_rejected_before_work() {
        let dir = TempDir::new().unwrap();
        let installer = Installer::new(
            HttpClient::new().unwrap(),
            Shell::default(),
            Endpoints::default(),
            DatabaseConfig::default(),
            None,
        );
        let mut options = InstallOptions::new("bad name; DROP", "root");
        options.work_dir = dir.path().join("work");

        let err = installer.install(&options).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!options.work_dir.exists());
    }

    #[tokio::test]
    #[ignore] // Requires network access, svn and mysql
    async fn installs_latest_release() {
        let dir = TempDir::new().unwrap();
        let installer = Installer::new(
            HttpClient::new().unwrap(),
            Shell::default(),
            Endpoints::default(),
            DatabaseConfig::default(),
            None,
        );
        let mut options = InstallOptions::new("wordpress_test", "root");
        options.skip_db = true;
        options.work_dir = dir.path().to_path_buf();

        let paths = installer.install(&options).await.unwrap();
        assert!(paths.core_dir.join("wp-settings.php").is_file());
        assert!(paths.tests_dir.join("includes").is_dir());
        assert!(paths.tests_config().is_file());
    }
}
