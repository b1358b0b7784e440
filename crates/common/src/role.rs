use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

const ROLE_SEP: char = '|';
const REBROADCAST: &str = "rebroadcast";

// The regex crate has no lookahead, so "OP"/"ED" directly followed by a digit
// ("OP2") is its own branch whose post-fragment starts with that digit.
static ROLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<anime>.*?) ?\b(?P<rolepre>(?:rebroadcast)?) ?\b(?:(?P<role>(?:ED|OP)\b|(?:character|image) song\b|insert (?:track|song)\b|ins|(?:main )?theme|bgm|ost) ?(?P<rolepost>.*)|(?P<numbered>ED|OP)(?P<numpost>\d.*))$",
    )
    .unwrap()
});

/// The function a track serves within an anime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Op,
    Ed,
    CharacterSong,
    InsertSong,
    Theme,
    MainTheme,
    Bgm,
    Ost,
}

impl RoleKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let normalized = keyword.trim().to_lowercase();
        let kind = match normalized.as_str() {
            "op" => RoleKind::Op,
            "ed" => RoleKind::Ed,
            "character song" | "image song" => RoleKind::CharacterSong,
            "insert song" | "insert track" | "ins" => RoleKind::InsertSong,
            "theme" => RoleKind::Theme,
            "main theme" => RoleKind::MainTheme,
            "bgm" => RoleKind::Bgm,
            "ost" => RoleKind::Ost,
            _ => return None,
        };
        Some(kind)
    }

    pub fn category(self) -> RoleCategory {
        match self {
            RoleKind::Op => RoleCategory::Op,
            RoleKind::Ed => RoleCategory::Ed,
            RoleKind::CharacterSong => RoleCategory::CharacterSong,
            RoleKind::InsertSong => RoleCategory::InsertSong,
            RoleKind::Theme | RoleKind::MainTheme => RoleCategory::MainTheme,
            RoleKind::Bgm => RoleCategory::Bgm,
            RoleKind::Ost => RoleCategory::Ost,
        }
    }

    pub fn spelling(self) -> &'static str {
        match self {
            RoleKind::Op => "OP",
            RoleKind::Ed => "ED",
            RoleKind::CharacterSong => "Character Song",
            RoleKind::InsertSong => "Insert Song",
            RoleKind::Theme => "Theme",
            RoleKind::MainTheme => "Main Theme",
            RoleKind::Bgm => "BGM",
            RoleKind::Ost => "OST",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

/// Storage bucket for a role. Lossy: theme and main theme share a bucket, as
/// do insert song, insert track and "ins".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleCategory {
    Op,
    Ed,
    CharacterSong,
    InsertSong,
    MainTheme,
    Bgm,
    Ost,
}

/// One role a track plays in one anime.
///
/// `keyword` is the role word as it appeared in the annotation, cased for
/// display ("OP", "insert track"), so the distinction the [`RoleCategory`]
/// bucket drops is still available. `role` is `None` when the annotation
/// could not be classified; the whole clause is then kept in `qualifier`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub anime: String,
    pub role: Option<RoleKind>,
    pub keyword: String,
    pub qualifier: String,
}

impl RoleAssignment {
    pub fn is_classified(&self) -> bool {
        self.role.is_some()
    }

    /// Renders the clause back into annotation form, e.g. `Macross Frontier OP 2`.
    /// The typed keyword is kept; the kind's spelling stands in only when no
    /// keyword was recorded.
    pub fn to_annotation(&self) -> String {
        let keyword = match (self.keyword.as_str(), self.role) {
            ("", Some(kind)) => kind.spelling(),
            (keyword, _) => keyword,
        };
        let (pre, post) = if !keyword.is_empty() && is_rebroadcast(&self.qualifier) {
            let rest = self.qualifier.get(REBROADCAST.len()..).unwrap_or("");
            (REBROADCAST, rest.trim_start_matches(", "))
        } else {
            ("", self.qualifier.as_str())
        };

        let mut out = String::new();
        for part in [self.anime.as_str(), pre, keyword, post] {
            if part.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(part);
        }
        out
    }
}

/// Parses a single annotation clause. Unrecognised text fails soft: no anime,
/// no role, whole clause as the qualifier.
pub fn parse_role(annotation: &str) -> Option<RoleAssignment> {
    if annotation.is_empty() {
        return None;
    }

    let caps = match ROLE_PATTERN.captures(annotation) {
        Some(caps) => caps,
        None => {
            return Some(RoleAssignment {
                qualifier: annotation.to_string(),
                ..RoleAssignment::default()
            })
        }
    };

    let anime = group(&caps, "anime");
    let pre = group(&caps, "rolepre");
    let (keyword, post) = match caps.name("role") {
        Some(role) => (role.as_str(), group(&caps, "rolepost")),
        None => (group(&caps, "numbered"), group(&caps, "numpost")),
    };

    Some(RoleAssignment {
        anime: anime.to_string(),
        role: RoleKind::from_keyword(keyword),
        keyword: display_keyword(keyword),
        qualifier: join_qualifier(pre, post.trim()),
    })
}

pub fn parse_roles(annotation: &str) -> Vec<RoleAssignment> {
    annotation
        .split(ROLE_SEP)
        .filter(|clause| !clause.is_empty())
        .filter_map(parse_role)
        .collect()
}

/// Joins role clauses back into one annotation, `A OP|A ED`.
pub fn format_roles(roles: &[RoleAssignment]) -> String {
    let clauses: Vec<String> = roles.iter().map(RoleAssignment::to_annotation).collect();
    clauses.join(&ROLE_SEP.to_string())
}

/// Inverse of [`crate::parse_title`]: `title (annotation)`, or the bare title
/// when there are no roles.
pub fn format_title(title: &str, roles: &[RoleAssignment]) -> String {
    let annotation = format_roles(roles);
    if annotation.is_empty() {
        title.to_string()
    } else if title.is_empty() {
        format!("({})", annotation)
    } else {
        format!("{} ({})", title, annotation)
    }
}

/// Two-letter keywords are codes (`OP`); longer ones are words (`insert song`).
pub fn display_keyword(keyword: &str) -> String {
    if keyword.chars().count() == 2 {
        keyword.to_uppercase()
    } else {
        keyword.to_lowercase()
    }
}

pub fn is_rebroadcast(qualifier: &str) -> bool {
    qualifier
        .split(", ")
        .next()
        .map(|head| head.eq_ignore_ascii_case(REBROADCAST))
        .unwrap_or(false)
}

fn join_qualifier(pre: &str, post: &str) -> String {
    if pre.is_empty() || post.is_empty() {
        format!("{}{}", pre, post)
    } else {
        format!("{}, {}", pre, post)
    }
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map(|m| m.as_str()).unwrap_or("")
}
