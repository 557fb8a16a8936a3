//! Zip archive extraction.

use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};

/// Extracts every entry of the zip at `archive` into `dest`.
///
/// Existing files are overwritten. Returns the number of entries.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let to_archive_error = |e: zip::result::ZipError| Error::Archive {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(to_archive_error)?;
    let entries = zip.len();

    std::fs::create_dir_all(dest)?;
    zip.extract(dest).map_err(to_archive_error)?;

    tracing::debug!(
        archive = %archive.display(),
        dest = %dest.display(),
        entries,
        "extracted archive"
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("wordpress.zip");
        write_zip(
            &archive,
            &[
                ("wordpress/index.php", "<?php // core"),
                ("wordpress/wp-includes/version.php", "<?php $wp_version = '6.3.1';"),
            ],
        );

        let count = extract_zip(&archive, dir.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("wordpress/index.php")).unwrap(),
            "<?php // core"
        );
        assert!(dir.path().join("wordpress/wp-includes/version.php").exists());
    }

    #[test]
    fn not_a_zip_is_archive_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, "<html>403 Forbidden</html>").unwrap();

        let err = extract_zip(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
    }

    #[test]
    fn missing_archive_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = extract_zip(&dir.path().join("nope.zip"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
