//! Integration tests for test environment installation pieces that run
//! without network access.

use std::io::Write;
use std::path::Path;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use plugin_ci::install::{unpack_core, InstallPaths};
use plugin_ci::{resolve, Endpoints, TestsConfig};

const SAMPLE_CONFIG: &str = r#"<?php
define( 'ABSPATH', dirname( __FILE__ ) . '/src/' );
define( 'DB_NAME', 'youremptytestdbnamehere' );
define( 'DB_USER', 'yourusernamehere' );
define( 'DB_PASSWORD', 'yourpasswordhere' );
define( 'DB_HOST', 'localhost' );
"#;

fn write_core_zip(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for name in ["wordpress/wp-settings.php", "wordpress/wp-includes/version.php"] {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<?php").unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn release_version_urls() {
    let endpoints = Endpoints::default();
    let resolved = resolve("6.1.0", "").unwrap();

    assert_eq!(resolved.tag_path, "tags/6.1");
    assert_eq!(
        resolved.tests_checkout_url(&endpoints, "includes"),
        "https://develop.svn.wordpress.org/tags/6.1/tests/phpunit/includes/"
    );
    assert_eq!(
        resolved.config_template_url(&endpoints),
        "https://develop.svn.wordpress.org/tags/6.1/wp-tests-config-sample.php"
    );
    assert_eq!(
        resolved.core_download_url(&endpoints),
        "https://wordpress.org/wordpress-6.1.zip"
    );
}

#[test]
fn latest_version_uses_version_check_payload() {
    let payload = r#"{"offers":[{"response":"upgrade","current":"6.4.2","version":"6.4.2"}]}"#;
    let resolved = resolve("latest", payload).unwrap();

    assert_eq!(resolved.tag_path, "tags/6.4.2");
    assert_eq!(
        resolved.core_download_url(&Endpoints::default()),
        "https://wordpress.org/latest.zip"
    );
}

#[test]
fn core_install_and_config_render() {
    let work = TempDir::new().unwrap();
    let paths = InstallPaths::new(work.path());
    let archive = work.path().join("wordpress.zip");
    write_core_zip(&archive);

    unpack_core(&archive, &paths).unwrap();
    assert!(paths.core_dir.join("wp-settings.php").is_file());

    std::fs::create_dir_all(&paths.tests_dir).unwrap();
    let config = TestsConfig {
        core_dir: paths.core_abspath(),
        db_name: "wordpress_test".to_string(),
        db_user: "root".to_string(),
        db_password: String::new(),
        db_host: "127.0.0.1".to_string(),
    };
    std::fs::write(paths.tests_config(), config.render(SAMPLE_CONFIG)).unwrap();

    let rendered = std::fs::read_to_string(paths.tests_config()).unwrap();
    let abspath = format!("define( 'ABSPATH', '{}' );", paths.core_abspath());
    assert!(rendered.contains(&abspath));
    assert!(rendered.contains("define( 'DB_HOST', '127.0.0.1' );"));
}
