use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use common::record::timestamp_to_iso8601;
use common::{
    capture_timestamp, format_title, join_relpath, parse_title, random_id, CatalogStatus,
    MetadataRecord, RoleAssignment,
};
use tracing::{debug, info, warn};

use crate::plist::{self, PlistValue, PlistWriter};
use crate::{destination, read_tags, MetadataError};

const FILE_SCHEME: &str = "file://";

/// One local-file entry of a playlist export, fields as written there.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaylistTrack {
    pub persistent_id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub location: String,
    pub total_time: u32,
    pub description: String,
    pub composer: String,
    pub year: Option<i32>,
    pub episode: Option<String>,
}

impl PlaylistTrack {
    /// `None` for entries that do not point at a local file (streams,
    /// purchases still in the cloud).
    fn from_value(value: &PlistValue) -> Option<Self> {
        let location = value.get("Location").and_then(PlistValue::as_str)?;
        if !location.starts_with("file") {
            return None;
        }

        let persistent_id = match text_field(value, "Persistent ID") {
            id if id.is_empty() => random_id(),
            id => id,
        };

        Some(Self {
            persistent_id,
            name: text_field(value, "Name"),
            artist: text_field(value, "Artist"),
            album: text_field(value, "Album"),
            location: location.to_string(),
            total_time: value
                .get("Total Time")
                .and_then(PlistValue::as_integer)
                .and_then(|ms| u32::try_from(ms).ok())
                .unwrap_or(0),
            description: text_field(value, "Description"),
            composer: text_field(value, "Composer"),
            year: value
                .get("Year")
                .and_then(PlistValue::as_integer)
                .and_then(|year| i32::try_from(year).ok()),
            episode: value
                .get("Episode")
                .and_then(PlistValue::as_str)
                .map(str::to_string),
        })
    }

    pub fn path(&self) -> PathBuf {
        decode_location(&self.location)
    }

    /// Builds the record, reading the file itself for a label or composer the
    /// export left out.
    pub fn into_record(self) -> MetadataRecord {
        let original = self.path();
        let parts = parse_title(&self.name);

        let mut label = self.description;
        let mut composer = self.composer;
        let mut year = self.year;
        if label.is_empty() || composer.is_empty() {
            match read_tags(&original) {
                Ok(info) => {
                    if label.is_empty() {
                        label = info.label;
                    }
                    if composer.is_empty() {
                        composer = info.composer;
                    }
                    year = year.or(info.year);
                }
                Err(err) => warn!("Unable to get extra metadata for {:?}: {}", original, err),
            }
        }

        let filename = destination(&self.persistent_id, &self.artist, &parts.title, &original);
        MetadataRecord {
            id: self.persistent_id,
            original_file: original,
            filename,
            title: parts.title,
            album: self.album,
            duration_ms: self.total_time,
            roles: parts.roles,
            artist: self.artist,
            composer,
            label,
            year,
            catalog: CatalogStatus::from_marker(self.episode.as_deref()),
            date_added: capture_timestamp(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParsedPlaylist {
    pub tracks: Vec<PlaylistTrack>,
    /// Every entry in the document, local or not.
    pub total: usize,
}

impl ParsedPlaylist {
    pub fn into_records(self) -> Vec<MetadataRecord> {
        self.tracks
            .into_iter()
            .map(PlaylistTrack::into_record)
            .collect()
    }
}

pub fn parse_playlist(xml: &[u8]) -> Result<ParsedPlaylist, MetadataError> {
    let root = plist::parse(xml)?;
    let entries = root
        .get("Tracks")
        .and_then(PlistValue::as_dict)
        .ok_or_else(|| MetadataError::Plist("missing Tracks dict".to_string()))?;

    let mut tracks = Vec::new();
    for (key, value) in entries {
        match PlaylistTrack::from_value(value) {
            Some(track) => tracks.push(track),
            None => debug!("Skipping playlist entry {}: not a local file", key),
        }
    }

    Ok(ParsedPlaylist {
        tracks,
        total: entries.len(),
    })
}

pub fn read_playlist(path: &Path) -> Result<ParsedPlaylist, MetadataError> {
    let bytes = fs::read(path)?;
    parse_playlist(&bytes)
}

pub fn playlist_records(path: &Path) -> Result<Vec<MetadataRecord>, MetadataError> {
    let playlist = read_playlist(path)?;
    let total = playlist.total;
    let records = playlist.into_records();
    info!(
        "Got metadata for {} tracks, out of {} in {:?}",
        records.len(),
        total,
        path
    );
    Ok(records)
}

/// A stored track, flattened for export.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaylistEntry {
    pub id: String,
    /// Library-relative, `/`-separated.
    pub filename: String,
    pub title: String,
    pub roles: Vec<RoleAssignment>,
    pub artist: String,
    pub album: String,
    pub duration_ms: u32,
    pub label: String,
    pub composer: String,
    pub catalog: CatalogStatus,
    pub date_added: String,
    pub year: Option<i32>,
}

pub fn write_playlist<W: Write>(
    entries: &[PlaylistEntry],
    library_root: &Path,
    out: W,
) -> Result<(), MetadataError> {
    let mut writer = PlistWriter::new(out);
    writer.start_document()?;
    writer.begin_dict()?;
    writer.key("Tracks")?;
    writer.begin_dict()?;

    for (idx, entry) in entries.iter().enumerate() {
        let track_id = (idx + 1) as i64;
        writer.key(&track_id.to_string())?;
        writer.begin_dict()?;
        writer.key("Track ID")?;
        writer.integer(track_id)?;
        writer.key("Persistent ID")?;
        writer.string(&entry.id)?;
        writer.key("Location")?;
        writer.string(&file_uri(&join_relpath(library_root, &entry.filename)))?;
        writer.key("Name")?;
        writer.string(&format_title(&entry.title, &entry.roles))?;
        writer.key("Artist")?;
        writer.string(&entry.artist)?;
        writer.key("Album")?;
        writer.string(&entry.album)?;
        writer.key("Total Time")?;
        writer.integer(i64::from(entry.duration_ms))?;
        writer.key("Description")?;
        writer.string(&entry.label)?;
        writer.key("Composer")?;
        writer.string(&entry.composer)?;
        writer.key("Episode")?;
        writer.string(entry.catalog.marker())?;
        if let Some(date) = timestamp_to_iso8601(&entry.date_added) {
            writer.key("Date Added")?;
            writer.date(&date)?;
        }
        if let Some(year) = entry.year {
            writer.key("Year")?;
            writer.integer(i64::from(year))?;
        }
        writer.end_dict()?;
    }

    writer.end_dict()?;
    writer.end_dict()?;
    writer.end_document()?;
    Ok(())
}

/// `file://` URI for a path, every segment percent-encoded.
pub fn file_uri(path: &Path) -> String {
    let mut out = String::from("file://localhost");
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                out.push('/');
                out.push_str(&prefix.as_os_str().to_string_lossy());
            }
            Component::Normal(part) => {
                out.push('/');
                out.push_str(&urlencoding::encode(&part.to_string_lossy()));
            }
            _ => {}
        }
    }
    out
}

/// Path part of a `file://` location, percent-decoded. Any host is dropped.
pub fn decode_location(location: &str) -> PathBuf {
    let rest = location.strip_prefix(FILE_SCHEME).unwrap_or(location);
    let path = match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => rest,
    };
    let decoded = urlencoding::decode_binary(path.as_bytes());
    PathBuf::from(String::from_utf8_lossy(&decoded).to_string())
}

fn text_field(value: &PlistValue, key: &str) -> String {
    value
        .get(key)
        .and_then(PlistValue::as_str)
        .unwrap_or("")
        .to_string()
}
