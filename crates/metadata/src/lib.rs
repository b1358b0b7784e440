use std::path::{Path, PathBuf};

use common::{
    canonical_filename, capture_timestamp, parse_title, year_from_date, CatalogStatus,
    MetadataRecord, UNKNOWN_ARTIST,
};
use lofty::error::LoftyError;
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::tag::Tag;

pub mod playlist;
pub mod plist;

pub use playlist::{
    parse_playlist, playlist_records, read_playlist, write_playlist, ParsedPlaylist,
    PlaylistEntry, PlaylistTrack,
};
pub use plist::PlistValue;

/// Tag layout family, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Id3,
    Mp4,
    Flac,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "mp3" | "aac" => Some(AudioFormat::Id3),
            "m4a" => Some(AudioFormat::Mp4),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }
}

pub fn is_playlist_path(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            ext == "xml" || ext == "plist"
        }
        None => false,
    }
}

#[derive(Debug, Default, Clone)]
pub struct TagInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub composer: String,
    pub label: String,
    pub year: Option<i32>,
    pub duration_ms: u32,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
    Xml(quick_xml::Error),
    Plist(String),
    Unsupported(PathBuf),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
            MetadataError::Xml(err) => write!(f, "xml error: {}", err),
            MetadataError::Plist(message) => write!(f, "playlist error: {}", message),
            MetadataError::Unsupported(path) => write!(f, "unsupported file: {:?}", path),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

impl From<quick_xml::Error> for MetadataError {
    fn from(err: quick_xml::Error) -> Self {
        MetadataError::Xml(err)
    }
}

pub fn read_tags(path: &Path) -> Result<TagInfo, MetadataError> {
    let format =
        AudioFormat::from_path(path).ok_or_else(|| MetadataError::Unsupported(path.into()))?;
    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    let mut info = TagInfo::default();

    let duration_ms = properties.duration().as_millis();
    info.duration_ms = duration_ms.min(u128::from(u32::MAX)) as u32;

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        apply_tag(&mut info, tag, format);
    }

    Ok(info)
}

fn apply_tag(info: &mut TagInfo, tag: &Tag, format: AudioFormat) {
    info.title = text_of(tag, &ItemKey::TrackTitle);
    info.artist = text_of(tag, &ItemKey::TrackArtist);
    if info.artist.is_empty() {
        info.artist = text_of(tag, &ItemKey::AlbumArtist);
    }
    info.album = text_of(tag, &ItemKey::AlbumTitle);
    info.composer = text_of(tag, &ItemKey::Composer);
    info.year = tag
        .get_string(&ItemKey::Year)
        .or_else(|| tag.get_string(&ItemKey::RecordingDate))
        .and_then(year_from_date);
    info.label = find_label(tag, format).unwrap_or_default();
}

/// Reads an audio file into a record. Files are never part of the broadcast
/// catalog until a playlist says otherwise.
pub fn read_record(path: &Path) -> Result<MetadataRecord, MetadataError> {
    let info = read_tags(path)?;
    let parts = parse_title(&info.title);
    let id = common::random_id();
    let filename = destination(&id, &info.artist, &parts.title, path);

    Ok(MetadataRecord {
        id,
        original_file: path.to_path_buf(),
        filename,
        title: parts.title,
        album: info.album,
        duration_ms: info.duration_ms,
        roles: parts.roles,
        artist: info.artist,
        composer: info.composer,
        label: info.label,
        year: info.year,
        catalog: CatalogStatus::Unlisted,
        date_added: capture_timestamp(),
    })
}

/// Library-relative destination for a track, keeping the source extension.
pub fn destination(id: &str, artist: &str, title: &str, original: &Path) -> PathBuf {
    let artist = if artist.trim().is_empty() {
        UNKNOWN_ARTIST
    } else {
        artist
    };
    let extension = original
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default();
    canonical_filename(id, artist, title, &extension)
}

enum LabelSource {
    Key(ItemKey),
    Named(&'static str),
}

// ItemKey owns a String in its Unknown variant, so this cannot be a const.
fn label_sources(format: AudioFormat) -> Vec<LabelSource> {
    match format {
        AudioFormat::Id3 => vec![
            LabelSource::Key(ItemKey::Label),
            LabelSource::Key(ItemKey::Publisher),
            LabelSource::Key(ItemKey::TrackSubtitle),
            LabelSource::Named("SUBTITLE"),
            LabelSource::Named("LABEL"),
            LabelSource::Named("DESCRIPTION"),
        ],
        AudioFormat::Mp4 => vec![
            LabelSource::Key(ItemKey::Description),
            LabelSource::Named("desc"),
        ],
        AudioFormat::Flac => vec![
            LabelSource::Key(ItemKey::Description),
            LabelSource::Named("DESCRIPTION"),
            LabelSource::Key(ItemKey::TrackSubtitle),
            LabelSource::Named("SUBTITLE"),
        ],
    }
}

fn find_label(tag: &Tag, format: AudioFormat) -> Option<String> {
    for source in label_sources(format) {
        let text = match source {
            LabelSource::Key(key) => tag.get_string(&key).map(str::to_string),
            LabelSource::Named(name) => named_text(tag, name),
        };
        if let Some(text) = text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Free-form field lookup. User text frames surface as `TXXX:NAME`.
fn named_text(tag: &Tag, name: &str) -> Option<String> {
    for item in tag.items() {
        if let ItemKey::Unknown(key) = item.key() {
            if key_matches(key, name) {
                if let Some(text) = item.value().text() {
                    return Some(text.to_string());
                }
            }
        }
    }
    None
}

fn key_matches(key: &str, name: &str) -> bool {
    if key.eq_ignore_ascii_case(name) {
        return true;
    }
    match key.rsplit_once(':') {
        Some((_, suffix)) => suffix.eq_ignore_ascii_case(name),
        None => false,
    }
}

fn text_of(tag: &Tag, key: &ItemKey) -> String {
    tag.get_string(key)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}
