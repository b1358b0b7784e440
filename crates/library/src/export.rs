use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use metadata::write_playlist;
use tracing::info;

use crate::{Library, LibraryError};

/// Writes the whole index to `output` as a property-list playlist. Returns the
/// number of tracks written.
pub fn export_playlist(library: &Library, output: &Path) -> Result<usize, LibraryError> {
    let entries = library.export_entries()?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(output)?;
    write_playlist(&entries, library.root(), BufWriter::new(file))?;
    info!("Exported {} tracks to {:?}", entries.len(), output);
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use common::{parse_title, CatalogStatus, MetadataRecord};
    use metadata::read_playlist;
    use tempfile::tempdir;

    use super::export_playlist;
    use crate::Library;

    #[test]
    fn exported_playlist_reads_back() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("music");
        let library = Library::open(root.clone(), &dir.path().join("index.redb")).unwrap();

        let parts = parse_title("Lion (Macross Frontier OP2|Macross Frontier ED)");
        library
            .add_records(&[MetadataRecord {
                id: "0123456789ABCDEF".to_string(),
                original_file: PathBuf::from("/incoming/lion.mp3"),
                filename: PathBuf::from("May'n").join("Lion (0123456789ABCDEF).mp3"),
                title: parts.title,
                album: "Lion".to_string(),
                duration_ms: 338000,
                roles: parts.roles.clone(),
                artist: "May'n & Nakajima Megumi".to_string(),
                composer: "Kanno Yoko".to_string(),
                label: "Victor".to_string(),
                year: Some(2008),
                catalog: CatalogStatus::Noted("pending".to_string()),
                date_added: "2024-03-09 07:05".to_string(),
            }])
            .unwrap();

        let output = dir.path().join("out").join("library.xml");
        assert_eq!(export_playlist(&library, &output).unwrap(), 1);

        let playlist = read_playlist(&output).unwrap();
        assert_eq!(playlist.total, 1);
        let track = &playlist.tracks[0];
        assert_eq!(track.persistent_id, "0123456789ABCDEF");
        assert_eq!(track.artist, "May'n & Nakajima Megumi");
        assert_eq!(track.description, "Victor");
        assert_eq!(track.episode.as_deref(), Some("pending"));
        assert_eq!(track.path(), root.join("May'n").join("Lion (0123456789ABCDEF).mp3"));

        let record = playlist.into_records().remove(0);
        assert_eq!(record.title, "Lion");
        assert_eq!(record.roles, parts.roles);
    }
}
