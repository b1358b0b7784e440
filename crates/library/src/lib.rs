use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bincode;
use common::{
    join_relpath, path_to_slash_string, split_credit, stable_id, Album, Anime, Artist,
    CreditComponent, CreditPart, Label, MetaArtist, MetadataRecord, PronounceableText, Role,
    RoleAssignment, Track,
};
use metadata::{MetadataError, PlaylistEntry};
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod config;
pub mod export;
pub mod import;

pub use config::{
    config_path_from_env, load_or_create_config, resolve_path, save_config, ConfigError,
    LibraryConfig,
};
pub use export::export_playlist;
pub use import::{import_paths, metadata_for_paths, ImportBatch, ImportFailure, ImportSummary};

const INDEX_VERSION: u32 = 1;
const KEY_SEP: char = '\x1f';

const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");
const TRACKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks");
const TRACKS_BY_NAME_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks_by_name");
const ARTISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artists");
const META_ARTISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta_artists");
const ALBUMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("albums");
const LABELS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("labels");
const ANIME_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("anime");
const ANIME_BY_NAME_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("anime_by_name");
const ROLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("roles");

const ALL_TABLES: &[TableDefinition<&str, &[u8]>] = &[
    META_TABLE,
    TRACKS_TABLE,
    TRACKS_BY_NAME_TABLE,
    ARTISTS_TABLE,
    META_ARTISTS_TABLE,
    ALBUMS_TABLE,
    LABELS_TABLE,
    ANIME_TABLE,
    ANIME_BY_NAME_TABLE,
    ROLES_TABLE,
];

const META_VERSION_KEY: &str = "version";
const META_STATS_KEY: &str = "stats";

const ARTIST_KIND: &str = "artist";
const META_ARTIST_KIND: &str = "meta_artist";
const ALBUM_KIND: &str = "album";
const LABEL_KIND: &str = "label";
const ANIME_KIND: &str = "anime";

#[derive(Clone)]
pub struct Library {
    root: PathBuf,
    db: Arc<Database>,
}

impl Library {
    /// Opens the index at `db_path`, creating it when missing. `root` is the
    /// folder track filenames are relative to.
    pub fn open(root: PathBuf, db_path: &Path) -> Result<Self, LibraryError> {
        let db = open_or_create_db(db_path)?;
        let library = Self {
            root,
            db: Arc::new(db),
        };

        match read_version(&library.db)? {
            Some(version) if version == INDEX_VERSION => {
                info!("Loaded index from {:?}", db_path);
            }
            Some(version) => return Err(LibraryError::VersionMismatch(version)),
            None => {
                info!("Creating index at {:?}", db_path);
                library.init()?;
            }
        }

        Ok(library)
    }

    fn init(&self) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        for table in ALL_TABLES {
            write_txn.open_table(*table)?;
        }
        {
            let mut meta_table = write_txn.open_table(META_TABLE)?;
            let version_bytes = encode_value(&INDEX_VERSION)?;
            meta_table.insert(META_VERSION_KEY, version_bytes.as_slice())?;
            let stats_bytes = encode_value(&LibraryStats::default())?;
            meta_table.insert(META_STATS_KEY, stats_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Stores every record whose id is not in the index yet, in one
    /// transaction. Records with a known id are reported, not overwritten.
    pub fn add_records(&self, records: &[MetadataRecord]) -> Result<AddOutcome, LibraryError> {
        let mut outcome = AddOutcome::default();
        let write_txn = self.db.begin_write()?;

        {
            let mut meta_table = write_txn.open_table(META_TABLE)?;
            let mut tracks_table = write_txn.open_table(TRACKS_TABLE)?;
            let mut tracks_by_name_table = write_txn.open_table(TRACKS_BY_NAME_TABLE)?;
            let mut artists_table = write_txn.open_table(ARTISTS_TABLE)?;
            let mut meta_artists_table = write_txn.open_table(META_ARTISTS_TABLE)?;
            let mut albums_table = write_txn.open_table(ALBUMS_TABLE)?;
            let mut labels_table = write_txn.open_table(LABELS_TABLE)?;
            let mut anime_table = write_txn.open_table(ANIME_TABLE)?;
            let mut anime_by_name_table = write_txn.open_table(ANIME_BY_NAME_TABLE)?;
            let mut roles_table = write_txn.open_table(ROLES_TABLE)?;

            for record in records {
                if tracks_table.get(record.id.as_str())?.is_some() {
                    debug!("Skipping {}: already in the index", record.id);
                    outcome.duplicates.push(record.id.clone());
                    continue;
                }

                let artist_id =
                    ensure_meta_artist(&mut meta_artists_table, &mut artists_table, &record.artist)?;
                let composer_id = ensure_meta_artist(
                    &mut meta_artists_table,
                    &mut artists_table,
                    &record.composer,
                )?;
                let album_id =
                    ensure_entity(&mut albums_table, ALBUM_KIND, &record.album, |id, title| {
                        Album {
                            id,
                            title,
                            year: record.year,
                        }
                    })?;
                let label_id =
                    ensure_entity(&mut labels_table, LABEL_KIND, &record.label, |id, name| {
                        Label { id, name }
                    })?;

                let track = Track {
                    id: record.id.clone(),
                    filename: path_to_slash_string(&record.filename),
                    title: PronounceableText::romaji(record.title.as_str()),
                    artist_id,
                    album_id,
                    composer_id,
                    label_id,
                    duration_ms: record.duration_ms,
                    year: record.year,
                    catalog: record.catalog.clone(),
                    date_added: record.date_added.clone(),
                };
                let track_bytes = encode_value(&track)?;
                tracks_table.insert(track.id.as_str(), track_bytes.as_slice())?;
                let by_name = name_key(&[record.title.as_str(), record.artist.as_str()], &track.id);
                tracks_by_name_table.insert(by_name.as_str(), track.id.as_bytes())?;

                for (order, assignment) in record.roles.iter().enumerate() {
                    let anime_id = ensure_anime(
                        &mut anime_table,
                        &mut anime_by_name_table,
                        &assignment.anime,
                    )?;
                    let role = Role {
                        track_id: track.id.clone(),
                        anime_id,
                        kind: assignment.role,
                        category: assignment.role.map(|kind| kind.category()),
                        keyword: assignment.keyword.clone(),
                        qualifier: assignment.qualifier.clone(),
                    };
                    let role_bytes = encode_value(&role)?;
                    let key = role_key(&track.id, order);
                    roles_table.insert(key.as_str(), role_bytes.as_slice())?;
                }

                outcome.added += 1;
            }

            let stats = LibraryStats {
                tracks: tracks_table.len()? as usize,
                artists: artists_table.len()? as usize,
                meta_artists: meta_artists_table.len()? as usize,
                albums: albums_table.len()? as usize,
                labels: labels_table.len()? as usize,
                anime: anime_table.len()? as usize,
                roles: roles_table.len()? as usize,
            };
            let stats_bytes = encode_value(&stats)?;
            meta_table.insert(META_STATS_KEY, stats_bytes.as_slice())?;
        }

        write_txn.commit()?;
        info!(
            "Added {} tracks ({} already present)",
            outcome.added,
            outcome.duplicates.len()
        );
        Ok(outcome)
    }

    pub fn stats(&self) -> Result<LibraryStats, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META_TABLE)?;
        let stats = get_decoded(&table, META_STATS_KEY)?;
        Ok(stats.unwrap_or_default())
    }

    pub fn get_track(&self, track_id: &str) -> Result<Option<Track>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let track_table = read_txn.open_table(TRACKS_TABLE)?;
        get_decoded(&track_table, track_id)
    }

    pub fn list_tracks(
        &self,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Track>, usize), LibraryError> {
        let read_txn = self.db.begin_read()?;
        let name_table = read_txn.open_table(TRACKS_BY_NAME_TABLE)?;
        let track_table = read_txn.open_table(TRACKS_TABLE)?;
        list_by_name(&name_table, &track_table, search, limit, offset)
    }

    /// Roles of one track, in annotation order.
    pub fn track_roles(&self, track_id: &str) -> Result<Vec<Role>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let roles_table = read_txn.open_table(ROLES_TABLE)?;
        read_roles(&roles_table, track_id)
    }

    pub fn get_anime(&self, anime_id: &str) -> Result<Option<Anime>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let anime_table = read_txn.open_table(ANIME_TABLE)?;
        get_decoded(&anime_table, anime_id)
    }

    pub fn list_anime(
        &self,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Anime>, usize), LibraryError> {
        let read_txn = self.db.begin_read()?;
        let name_table = read_txn.open_table(ANIME_BY_NAME_TABLE)?;
        let anime_table = read_txn.open_table(ANIME_TABLE)?;
        list_by_name(&name_table, &anime_table, search, limit, offset)
    }

    pub fn get_meta_artist(&self, meta_artist_id: &str) -> Result<Option<MetaArtist>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META_ARTISTS_TABLE)?;
        get_decoded(&table, meta_artist_id)
    }

    /// Every stored track with its references resolved to display text.
    pub fn export_entries(&self) -> Result<Vec<PlaylistEntry>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let tracks_table = read_txn.open_table(TRACKS_TABLE)?;
        let meta_artists_table = read_txn.open_table(META_ARTISTS_TABLE)?;
        let albums_table = read_txn.open_table(ALBUMS_TABLE)?;
        let labels_table = read_txn.open_table(LABELS_TABLE)?;
        let anime_table = read_txn.open_table(ANIME_TABLE)?;
        let roles_table = read_txn.open_table(ROLES_TABLE)?;

        let mut entries = Vec::new();
        for entry in tracks_table.iter()? {
            let entry = entry?;
            let track: Track = decode_value(entry.1.value())?;

            let artist = match track.artist_id.as_deref() {
                Some(id) => get_decoded::<MetaArtist, _>(&meta_artists_table, id)?
                    .map(|meta| meta.credit)
                    .unwrap_or_default(),
                None => String::new(),
            };
            let composer = match track.composer_id.as_deref() {
                Some(id) => get_decoded::<MetaArtist, _>(&meta_artists_table, id)?
                    .map(|meta| meta.credit)
                    .unwrap_or_default(),
                None => String::new(),
            };
            let album = match track.album_id.as_deref() {
                Some(id) => get_decoded::<Album, _>(&albums_table, id)?
                    .map(|album| album.title.display().to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };
            let label = match track.label_id.as_deref() {
                Some(id) => get_decoded::<Label, _>(&labels_table, id)?
                    .map(|label| label.name.display().to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };

            let mut roles = Vec::new();
            for role in read_roles(&roles_table, &track.id)? {
                let anime = match role.anime_id.as_deref() {
                    Some(id) => get_decoded::<Anime, _>(&anime_table, id)?
                        .map(|anime| anime.title.display().to_string())
                        .unwrap_or_default(),
                    None => String::new(),
                };
                roles.push(RoleAssignment {
                    anime,
                    role: role.kind,
                    keyword: role.keyword,
                    qualifier: role.qualifier,
                });
            }

            entries.push(PlaylistEntry {
                title: track.title.display().to_string(),
                id: track.id,
                filename: track.filename,
                roles,
                artist,
                album,
                duration_ms: track.duration_ms,
                label,
                composer,
                catalog: track.catalog,
                date_added: track.date_added,
                year: track.year,
            });
        }

        Ok(entries)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a stored track's file lives under the library root.
    pub fn track_path(&self, track: &Track) -> PathBuf {
        join_relpath(&self.root, &track.filename)
    }

    pub fn is_in_library(&self, track: &Track) -> bool {
        self.track_path(track).is_file()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub tracks: usize,
    pub artists: usize,
    pub meta_artists: usize,
    pub albums: usize,
    pub labels: usize,
    pub anime: usize,
    pub roles: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOutcome {
    pub added: usize,
    /// Ids that were already stored, in input order.
    pub duplicates: Vec<String>,
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Metadata(MetadataError),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
    KeyParse(String),
    VersionMismatch(u32),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Metadata(err) => write!(f, "metadata error: {}", err),
            LibraryError::Redb(err) => write!(f, "db error: {}", err),
            LibraryError::Bincode(err) => write!(f, "bincode error: {}", err),
            LibraryError::KeyParse(value) => write!(f, "key parse error: {}", value),
            LibraryError::VersionMismatch(version) => {
                write!(f, "index version mismatch: {}", version)
            }
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<MetadataError> for LibraryError {
    fn from(err: MetadataError) -> Self {
        LibraryError::Metadata(err)
    }
}

impl From<redb::Error> for LibraryError {
    fn from(err: redb::Error) -> Self {
        LibraryError::Redb(err)
    }
}

impl From<DatabaseError> for LibraryError {
    fn from(err: DatabaseError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TableError> for LibraryError {
    fn from(err: TableError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TransactionError> for LibraryError {
    fn from(err: TransactionError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<StorageError> for LibraryError {
    fn from(err: StorageError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<CommitError> for LibraryError {
    fn from(err: CommitError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for LibraryError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        LibraryError::Bincode(err)
    }
}

fn open_or_create_db(path: &Path) -> Result<Database, LibraryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

fn read_version(db: &Database) -> Result<Option<u32>, LibraryError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(META_TABLE) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    get_decoded(&table, META_VERSION_KEY)
}

/// Id of the entity called `name`, storing it first when new. Blank names
/// have no entity.
fn ensure_entity<T, F>(
    table: &mut redb::Table<&str, &[u8]>,
    kind: &str,
    name: &str,
    build: F,
) -> Result<Option<String>, LibraryError>
where
    T: Serialize,
    F: FnOnce(String, PronounceableText) -> T,
{
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let id = entity_id(kind, name);
    if table.get(id.as_str())?.is_none() {
        let entity = build(id.clone(), PronounceableText::romaji(name));
        let bytes = encode_value(&entity)?;
        table.insert(id.as_str(), bytes.as_slice())?;
    }
    Ok(Some(id))
}

fn ensure_anime(
    anime_table: &mut redb::Table<&str, &[u8]>,
    anime_by_name_table: &mut redb::Table<&str, &[u8]>,
    name: &str,
) -> Result<Option<String>, LibraryError> {
    let id = match ensure_entity(anime_table, ANIME_KIND, name, |id, title| Anime { id, title })? {
        Some(id) => id,
        None => return Ok(None),
    };
    let key = name_key(&[name.trim()], &id);
    anime_by_name_table.insert(key.as_str(), id.as_bytes())?;
    Ok(Some(id))
}

/// Stores a full credit and each individual artist named in it.
fn ensure_meta_artist(
    meta_artists_table: &mut redb::Table<&str, &[u8]>,
    artists_table: &mut redb::Table<&str, &[u8]>,
    credit: &str,
) -> Result<Option<String>, LibraryError> {
    let credit = credit.trim();
    if credit.is_empty() {
        return Ok(None);
    }
    let id = entity_id(META_ARTIST_KIND, credit);
    if meta_artists_table.get(id.as_str())?.is_some() {
        return Ok(Some(id));
    }

    let mut components = Vec::new();
    for part in split_credit(credit) {
        match part {
            CreditPart::Artist(name) => {
                let artist_id =
                    ensure_entity(artists_table, ARTIST_KIND, &name, |id, name| Artist { id, name })?;
                match artist_id {
                    Some(artist_id) => components.push(CreditComponent::Artist { artist_id }),
                    None => components.push(CreditComponent::Text { text: name }),
                }
            }
            CreditPart::Joiner(text) => components.push(CreditComponent::Text { text }),
        }
    }

    let meta = MetaArtist {
        id: id.clone(),
        credit: credit.to_string(),
        components,
    };
    let bytes = encode_value(&meta)?;
    meta_artists_table.insert(id.as_str(), bytes.as_slice())?;
    Ok(Some(id))
}

fn read_roles<R>(roles_table: &R, track_id: &str) -> Result<Vec<Role>, LibraryError>
where
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let prefix = prefix_key(track_id);
    let mut end = prefix.clone();
    end.push('\u{10ffff}');

    let mut roles = Vec::new();
    for entry in roles_table.range(prefix.as_str()..end.as_str())? {
        let entry = entry?;
        let role: Role = decode_value(entry.1.value())?;
        roles.push(role);
    }
    Ok(roles)
}

/// Walks a `name SEP id` index in name order, resolving ids in `items`.
fn list_by_name<T, N, I>(
    name_table: &N,
    items: &I,
    search: Option<&str>,
    limit: usize,
    offset: usize,
) -> Result<(Vec<T>, usize), LibraryError>
where
    T: DeserializeOwned,
    N: ReadableTable<&'static str, &'static [u8]>,
    I: ReadableTable<&'static str, &'static [u8]>,
{
    let search = search
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_lowercase());

    let mut total = 0usize;
    let mut out = Vec::new();

    for entry in name_table.iter()? {
        let entry = entry?;
        let key = entry.0.value();
        let (name, id) = split_key_last(key)?;
        if let Some(search) = &search {
            if !name.contains(search.as_str()) {
                continue;
            }
        }

        total += 1;
        if total <= offset {
            continue;
        }
        if out.len() >= limit {
            continue;
        }

        if let Some(item) = get_decoded(items, id)? {
            out.push(item);
        }
    }

    Ok((out, total))
}

fn get_decoded<T, R>(table: &R, key: &str) -> Result<Option<T>, LibraryError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(decode_value(value.value())?)),
        None => Ok(None),
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, LibraryError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, LibraryError> {
    Ok(bincode::deserialize(bytes)?)
}

fn entity_id(kind: &str, name: &str) -> String {
    let mut key = String::new();
    key.push_str(kind);
    key.push(KEY_SEP);
    key.push_str(name);
    stable_id(&key)
}

fn name_key(parts: &[&str], id: &str) -> String {
    let mut out = String::new();
    for part in parts {
        out.push_str(part.trim().to_lowercase().as_str());
        out.push(KEY_SEP);
    }
    out.push_str(id);
    out
}

fn role_key(track_id: &str, order: usize) -> String {
    let mut out = prefix_key(track_id);
    out.push_str(&format!("{:04}", order));
    out
}

fn prefix_key(prefix: &str) -> String {
    let mut out = String::new();
    out.push_str(prefix);
    out.push(KEY_SEP);
    out
}

fn split_key_last(value: &str) -> Result<(&str, &str), LibraryError> {
    let idx = value
        .rfind(KEY_SEP)
        .ok_or_else(|| LibraryError::KeyParse(value.to_string()))?;
    let next = idx + KEY_SEP.len_utf8();
    Ok((&value[..idx], &value[next..]))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use common::{parse_title, CatalogStatus, CreditComponent, MetadataRecord, RoleCategory, RoleKind};
    use tempfile::tempdir;

    use super::{LibraryStats, Library};

    fn record(id: &str, raw_title: &str, artist: &str) -> MetadataRecord {
        let parts = parse_title(raw_title);
        MetadataRecord {
            id: id.to_string(),
            original_file: PathBuf::from(format!("/incoming/{}.mp3", id)),
            filename: metadata::destination(id, artist, &parts.title, Path::new("x.mp3")),
            title: parts.title,
            album: "Best Of".to_string(),
            duration_ms: 240000,
            roles: parts.roles,
            artist: artist.to_string(),
            composer: "Kanno Yoko".to_string(),
            label: "Victor".to_string(),
            year: Some(2008),
            catalog: CatalogStatus::Listed,
            date_added: "2024-03-09 07:05".to_string(),
        }
    }

    #[test]
    fn new_index_is_empty() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().join("music"), &dir.path().join("index.redb")).unwrap();
        assert_eq!(library.stats().unwrap(), LibraryStats::default());
        assert!(library.get_track("missing").unwrap().is_none());
        assert_eq!(library.list_tracks(None, 10, 0).unwrap().1, 0);
        assert_eq!(library.root(), dir.path().join("music"));
    }

    #[test]
    fn deduplicates_reference_entities() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().into(), &dir.path().join("index.redb")).unwrap();

        let outcome = library
            .add_records(&[
                record("A1", "Lion (Macross Frontier OP2|Macross Frontier ED)", "May'n & Nakajima Megumi"),
                record("A2", "Diamond Crevasse (Macross Frontier ED)", "May'n"),
            ])
            .unwrap();
        assert_eq!(outcome.added, 2);
        assert!(outcome.duplicates.is_empty());

        let stats = library.stats().unwrap();
        assert_eq!(stats.tracks, 2);
        // May'n, Nakajima Megumi and Kanno Yoko.
        assert_eq!(stats.artists, 3);
        // Both performer credits plus the composer.
        assert_eq!(stats.meta_artists, 3);
        assert_eq!(stats.albums, 1);
        assert_eq!(stats.labels, 1);
        assert_eq!(stats.anime, 1);
        assert_eq!(stats.roles, 3);
    }

    #[test]
    fn repeated_ids_are_reported() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().into(), &dir.path().join("index.redb")).unwrap();

        library.add_records(&[record("A1", "Lion", "May'n")]).unwrap();
        let outcome = library
            .add_records(&[
                record("A1", "Lion (again)", "May'n"),
                record("B1", "Sora", "ZONE"),
                record("B1", "Sora", "ZONE"),
            ])
            .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.duplicates, vec!["A1".to_string(), "B1".to_string()]);

        let kept = library.get_track("A1").unwrap().unwrap();
        assert_eq!(kept.title.display(), "Lion");
        assert_eq!(library.stats().unwrap().tracks, 2);
    }

    #[test]
    fn roles_keep_order_and_category() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().into(), &dir.path().join("index.redb")).unwrap();
        library
            .add_records(&[record(
                "A1",
                "Sakura (Show main theme|Show insert track|Blah)",
                "Someone",
            )])
            .unwrap();

        let roles = library.track_roles("A1").unwrap();
        assert_eq!(roles.len(), 3);
        assert_eq!(roles[0].kind, Some(RoleKind::MainTheme));
        assert_eq!(roles[0].category, Some(RoleCategory::MainTheme));
        assert_eq!(roles[1].kind, Some(RoleKind::InsertSong));
        assert_eq!(roles[1].keyword, "insert track");
        assert_eq!(roles[2].kind, None);
        assert_eq!(roles[2].anime_id, None);
        assert_eq!(roles[2].qualifier, "Blah");
        assert!(library.track_roles("nope").unwrap().is_empty());
    }

    #[test]
    fn anime_listing_and_lookup() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().into(), &dir.path().join("index.redb")).unwrap();
        library
            .add_records(&[
                record("A1", "Lion (Macross Frontier OP)", "May'n"),
                record("A2", "Butter-Fly (Digimon Adventure OP)", "Wada Kouji"),
                record("A3", "Brave Heart (Digimon Adventure insert song)", "Miyazaki Ayumi"),
            ])
            .unwrap();

        let (anime, total) = library.list_anime(None, 10, 0).unwrap();
        assert_eq!(total, 2);
        let titles: Vec<&str> = anime.iter().map(|a| a.title.display()).collect();
        assert_eq!(titles, vec!["Digimon Adventure", "Macross Frontier"]);

        let (found, total) = library.list_anime(Some("MACROSS"), 10, 0).unwrap();
        assert_eq!(total, 1);
        let fetched = library.get_anime(&found[0].id).unwrap().unwrap();
        assert_eq!(fetched.title.display(), "Macross Frontier");

        let (page, total) = library.list_tracks(None, 1, 1).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title.display(), "Butter-Fly");
    }

    #[test]
    fn meta_artist_components() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().into(), &dir.path().join("index.redb")).unwrap();
        library
            .add_records(&[record("A1", "Sennen no Ai", "ROUND TABLE featuring NINO")])
            .unwrap();

        let track = library.get_track("A1").unwrap().unwrap();
        let meta = library
            .get_meta_artist(track.artist_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(meta.credit, "ROUND TABLE featuring NINO");
        assert_eq!(meta.components.len(), 3);
        assert_eq!(
            meta.components[1],
            CreditComponent::Text {
                text: " featuring ".to_string()
            }
        );
        assert!(matches!(meta.components[0], CreditComponent::Artist { .. }));
    }

    #[test]
    fn export_entries_resolve_references() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().into(), &dir.path().join("index.redb")).unwrap();
        let mut unlisted = record("A1", "Lion (Macross Frontier OP2)", "May'n");
        unlisted.catalog = CatalogStatus::Unlisted;
        library.add_records(&[unlisted.clone()]).unwrap();

        let entries = library.export_entries().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.id, "A1");
        assert_eq!(entry.filename, "May'n/Lion (A1).mp3");
        assert_eq!(entry.title, "Lion");
        assert_eq!(entry.roles, unlisted.roles);
        assert_eq!(entry.artist, "May'n");
        assert_eq!(entry.composer, "Kanno Yoko");
        assert_eq!(entry.album, "Best Of");
        assert_eq!(entry.label, "Victor");
        assert_eq!(entry.catalog, CatalogStatus::Unlisted);
        assert_eq!(entry.year, Some(2008));
    }

    #[test]
    fn index_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("data").join("index.redb");
        {
            let library = Library::open(dir.path().into(), &db_path).unwrap();
            library.add_records(&[record("A1", "Lion", "May'n")]).unwrap();
        }
        let library = Library::open(dir.path().into(), &db_path).unwrap();
        assert_eq!(library.stats().unwrap().tracks, 1);
        assert!(library.get_track("A1").unwrap().is_some());
    }

    #[test]
    fn resolves_track_files_under_the_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("music");
        let library = Library::open(root.clone(), &dir.path().join("index.redb")).unwrap();
        library.add_records(&[record("A1", "Lion", "May'n")]).unwrap();

        let track = library.get_track("A1").unwrap().unwrap();
        let path = library.track_path(&track);
        assert_eq!(path, root.join("May'n").join("Lion (A1).mp3"));
        assert!(!library.is_in_library(&track));

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();
        assert!(library.is_in_library(&track));
    }
}
