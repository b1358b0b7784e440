use std::path::PathBuf;

use rand::Rng;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const ID_LEN: usize = 16;

const PATH_ILLEGAL: &[char] = &['/', '\\', '\n'];

/// Deletes characters that cannot appear in a single path segment.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|ch| !PATH_ILLEGAL.contains(ch)).collect()
}

/// `artist/title (id).extension`, relative to the library root.
pub fn canonical_filename(id: &str, artist: &str, title: &str, extension: &str) -> PathBuf {
    let mut out = PathBuf::from(sanitize(artist));
    out.push(format!("{} ({}).{}", sanitize(title), id, extension));
    out
}

/// Sixteen uppercase hex digits, shaped like a playlist persistent ID.
///
/// Not a security token: with 16^16 values the collision chance across a few
/// thousand tracks is negligible.
pub fn random_id() -> String {
    let value: u64 = rand::rng().random();
    format!("{:0width$X}", value, width = ID_LEN)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{canonical_filename, random_id, sanitize, ID_LEN};

    #[test]
    fn sanitize_removes_separators() {
        assert_eq!(sanitize("ON/OFF"), "ONOFF");
        assert_eq!(sanitize(r"C:\WINDOWS"), "C:WINDOWS");
        assert_eq!(sanitize("Sakamoto \nMaaya"), "Sakamoto Maaya");
        assert_eq!(sanitize("Tachibana Kanade"), "Tachibana Kanade");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for text in ["a/b\\c\nd", "", "🐱/🐶", "plain"] {
            let once = sanitize(text);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn random_id_shape() {
        for _ in 0..64 {
            let id = random_id();
            assert_eq!(id.len(), ID_LEN);
            assert!(id
                .chars()
                .all(|ch| ch.is_ascii_digit() || ('A'..='F').contains(&ch)));
        }
    }

    #[test]
    fn random_ids_differ() {
        assert_ne!(random_id(), random_id());
    }

    #[test]
    fn canonical_filename_layout() {
        let path = canonical_filename("0123456789ABCDEF", "AC/DC", "Lion", "mp3");
        assert_eq!(path, Path::new("ACDC").join("Lion (0123456789ABCDEF).mp3"));
    }

    #[test]
    fn canonical_filename_is_deterministic() {
        let first = canonical_filename("ID", "May'n", "Lion", "flac");
        let second = canonical_filename("ID", "May'n", "Lion", "flac");
        assert_eq!(first, second);

        let other = canonical_filename("ID", "Nakajima Megumi", "Lion", "flac");
        assert_ne!(first.parent(), other.parent());
        assert_eq!(first.file_name(), other.file_name());
    }
}
