use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod naming;
pub mod names;
pub mod record;
pub mod role;
pub mod title;

pub use naming::{canonical_filename, random_id, sanitize, UNKNOWN_ARTIST};
pub use names::{split_credit, CreditPart, PronounceableText, Spelling};
pub use record::{capture_timestamp, year_from_date, CatalogStatus, MetadataRecord};
pub use role::{
    format_roles, format_title, parse_role, parse_roles, RoleAssignment, RoleCategory, RoleKind,
};
pub use title::{parse_title, split_title, ParsedTitle, TitleParts};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: PronounceableText,
}

/// A full attribution ("ROUND TABLE featuring NINO"), as credited on a track
/// either as performer or composer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetaArtist {
    pub id: String,
    pub credit: String,
    pub components: Vec<CreditComponent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditComponent {
    Artist { artist_id: String },
    Text { text: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: PronounceableText,
    pub year: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: PronounceableText,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anime {
    pub id: String,
    pub title: PronounceableText,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub filename: String,
    pub title: PronounceableText,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub composer_id: Option<String>,
    pub label_id: Option<String>,
    pub duration_ms: u32,
    pub year: Option<i32>,
    pub catalog: CatalogStatus,
    pub date_added: String,
}

/// A role a stored track plays in a stored anime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub track_id: String,
    pub anime_id: Option<String>,
    pub kind: Option<RoleKind>,
    pub category: Option<RoleCategory>,
    pub keyword: String,
    pub qualifier: String,
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

pub fn join_relpath(root: &Path, relpath: &str) -> PathBuf {
    let mut out = PathBuf::from(root);
    for part in relpath.split('/') {
        if part.is_empty() {
            continue;
        }
        out.push(part);
    }
    out
}

pub fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}
