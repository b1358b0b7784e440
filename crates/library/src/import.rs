use std::io;
use std::path::{Path, PathBuf};

use common::MetadataRecord;
use metadata::{is_playlist_path, playlist_records, read_record, AudioFormat, MetadataError};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{Library, LibraryError};

#[derive(Debug)]
pub struct ImportFailure {
    pub path: PathBuf,
    pub error: MetadataError,
}

#[derive(Debug, Default)]
pub struct ImportBatch {
    pub records: Vec<MetadataRecord>,
    pub failures: Vec<ImportFailure>,
    /// Files that are neither audio nor a playlist.
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub read: usize,
    pub added: usize,
    pub duplicates: Vec<String>,
    pub failures: Vec<ImportFailure>,
    pub skipped: usize,
}

/// Reads every input, descending into folders. A bad input is recorded in
/// `failures` and the rest of the batch carries on.
pub fn metadata_for_paths(paths: &[PathBuf]) -> ImportBatch {
    let mut batch = ImportBatch::default();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
            {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => read_input(entry.path(), &mut batch),
                    Ok(_) => {}
                    Err(err) => warn!("Failed to walk {:?}: {}", path, err),
                }
            }
        } else if path.exists() {
            read_input(path, &mut batch);
        } else {
            batch.failures.push(ImportFailure {
                path: path.clone(),
                error: MetadataError::Io(io::Error::new(io::ErrorKind::NotFound, "no such file")),
            });
        }
    }

    info!(
        "Read {} records ({} failed, {} skipped)",
        batch.records.len(),
        batch.failures.len(),
        batch.skipped
    );
    batch
}

fn read_input(path: &Path, batch: &mut ImportBatch) {
    let result = if AudioFormat::from_path(path).is_some() {
        read_record(path).map(|record| vec![record])
    } else if is_playlist_path(path) {
        playlist_records(path)
    } else {
        debug!("Skipping {:?}", path);
        batch.skipped += 1;
        return;
    };

    match result {
        Ok(records) => batch.records.extend(records),
        Err(error) => {
            warn!("Failed to read {:?}: {}", path, error);
            batch.failures.push(ImportFailure {
                path: path.to_path_buf(),
                error,
            });
        }
    }
}

pub fn import_paths(library: &Library, paths: &[PathBuf]) -> Result<ImportSummary, LibraryError> {
    let batch = metadata_for_paths(paths);
    let outcome = library.add_records(&batch.records)?;
    Ok(ImportSummary {
        read: batch.records.len(),
        added: outcome.added,
        duplicates: outcome.duplicates,
        failures: batch.failures,
        skipped: batch.skipped,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use metadata::playlist::file_uri;
    use metadata::MetadataError;
    use tempfile::tempdir;

    use super::{import_paths, metadata_for_paths};
    use crate::Library;

    fn playlist(tracks: &[(&str, &str, &Path)]) -> String {
        let mut out = String::from("<plist version=\"1.0\">\n<dict>\n<key>Tracks</key>\n<dict>\n");
        for (idx, (id, name, location)) in tracks.iter().enumerate() {
            out.push_str(&format!(
                concat!(
                    "<key>{}</key><dict>",
                    "<key>Persistent ID</key><string>{}</string>",
                    "<key>Name</key><string>{}</string>",
                    "<key>Artist</key><string>ZONE</string>",
                    "<key>Description</key><string>Sony</string>",
                    "<key>Composer</key><string>Machida Noriko</string>",
                    "<key>Location</key><string>{}</string>",
                    "</dict>\n"
                ),
                idx + 1,
                id,
                name,
                file_uri(location)
            ));
        }
        out.push_str("</dict>\n</dict>\n</plist>\n");
        out
    }

    #[test]
    fn walks_folders_and_collects_failures() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("exports").join("2012");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("cover.jpg"), [0u8; 4]).unwrap();
        fs::write(
            nested.join("library.xml"),
            playlist(&[
                ("00000000000000A1", "secret base (AnoHana ED)", &dir.path().join("a.mp3")),
                ("00000000000000A2", "Sora", &dir.path().join("b.flac")),
            ]),
        )
        .unwrap();
        fs::write(nested.join("broken.plist"), "<plist><dict><key>Tracks").unwrap();

        let missing = dir.path().join("missing.mp3");
        let batch = metadata_for_paths(&[dir.path().to_path_buf(), missing.clone()]);

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.failures.len(), 2);

        let failed: Vec<&PathBuf> = batch.failures.iter().map(|f| &f.path).collect();
        assert!(failed.contains(&&nested.join("broken.plist")));
        assert!(failed.contains(&&missing));
        assert!(batch
            .failures
            .iter()
            .any(|f| matches!(f.error, MetadataError::Io(_))));

        let secret_base = &batch.records[0];
        assert_eq!(secret_base.id, "00000000000000A1");
        assert_eq!(secret_base.title, "secret base");
        assert_eq!(secret_base.roles[0].anime, "AnoHana");
    }

    #[test]
    fn second_import_reports_duplicates() {
        let dir = tempdir().unwrap();
        let export = dir.path().join("library.xml");
        fs::write(
            &export,
            playlist(&[("00000000000000B1", "Sora (Show OP)", &dir.path().join("s.m4a"))]),
        )
        .unwrap();
        let library = Library::open(dir.path().join("music"), &dir.path().join("index.redb")).unwrap();

        let first = import_paths(&library, &[export.clone()]).unwrap();
        assert_eq!(first.read, 1);
        assert_eq!(first.added, 1);
        assert!(first.failures.is_empty());

        let second = import_paths(&library, &[export]).unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.duplicates, vec!["00000000000000B1".to_string()]);
        assert_eq!(library.stats().unwrap().tracks, 1);
    }
}
