use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spelling {
    Romaji,
    Original,
    Pronunciation,
}

/// Text that can be read aloud: a romanisation, the original-script rendition
/// and a pronunciation guide (e.g. kana). Any of them may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronounceableText {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub pronunciation: Option<String>,
}

impl PronounceableText {
    pub fn romaji(text: impl Into<String>) -> Self {
        Self {
            romaji: Some(text.into()),
            original: None,
            pronunciation: None,
        }
    }

    /// The requested spelling, or with `fallback` the best other one
    /// (romaji, then original, then pronunciation).
    pub fn text(&self, spelling: Spelling, fallback: bool) -> Option<&str> {
        let requested = match spelling {
            Spelling::Romaji => self.romaji.as_deref(),
            Spelling::Original => self.original.as_deref(),
            Spelling::Pronunciation => self.pronunciation.as_deref(),
        };
        if requested.is_some() || !fallback {
            return requested;
        }
        self.romaji
            .as_deref()
            .or(self.original.as_deref())
            .or(self.pronunciation.as_deref())
    }

    pub fn display(&self) -> &str {
        self.text(Spelling::Romaji, true).unwrap_or("")
    }
}

/// One piece of a full attribution such as `ROUND TABLE featuring NINO`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditPart {
    Artist(String),
    Joiner(String),
}

impl CreditPart {
    pub fn text(&self) -> &str {
        match self {
            CreditPart::Artist(name) | CreditPart::Joiner(name) => name,
        }
    }
}

const JOINERS: &[&str] = &[
    " featuring ",
    " feat. ",
    " with ",
    " and ",
    " vs. ",
    " ft. ",
    " & ",
    " x ",
    " × ",
    " / ",
    ", ",
    "; ",
];

/// Splits an attribution into artists and the text joining them.
/// Concatenating every part's text gives back the input.
pub fn split_credit(credit: &str) -> Vec<CreditPart> {
    let mut parts = Vec::new();
    let mut rest = credit;

    while let Some((idx, joiner)) = next_joiner(rest) {
        let name = &rest[..idx];
        if !name.is_empty() {
            parts.push(CreditPart::Artist(name.to_string()));
        }
        let end = idx + joiner.len();
        parts.push(CreditPart::Joiner(rest[idx..end].to_string()));
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        parts.push(CreditPart::Artist(rest.to_string()));
    }
    parts
}

/// Earliest joiner in `text`; the longer one wins a tie. Matching ignores
/// case only for ASCII input, where offsets survive lowercasing.
fn next_joiner(text: &str) -> Option<(usize, &'static str)> {
    let lower;
    let haystack = if text.is_ascii() {
        lower = text.to_ascii_lowercase();
        lower.as_str()
    } else {
        text
    };
    let mut best: Option<(usize, &'static str)> = None;
    for &joiner in JOINERS {
        if let Some(idx) = haystack.find(joiner) {
            let better = match best {
                Some((best_idx, best_joiner)) => {
                    idx < best_idx || (idx == best_idx && joiner.len() > best_joiner.len())
                }
                None => true,
            };
            if better {
                best = Some((idx, joiner));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{split_credit, CreditPart, PronounceableText, Spelling};

    #[test]
    fn spelling_prefers_requested() {
        let text = PronounceableText {
            romaji: Some("Kaze".to_string()),
            original: Some("風".to_string()),
            pronunciation: Some("かぜ".to_string()),
        };
        assert_eq!(text.text(Spelling::Original, true), Some("風"));
        assert_eq!(text.text(Spelling::Pronunciation, false), Some("かぜ"));
    }

    #[test]
    fn spelling_falls_back_to_romaji_first() {
        let text = PronounceableText {
            romaji: Some("Kaze".to_string()),
            original: Some("風".to_string()),
            pronunciation: None,
        };
        assert_eq!(text.text(Spelling::Pronunciation, true), Some("Kaze"));
        assert_eq!(text.text(Spelling::Pronunciation, false), None);

        let original_only = PronounceableText {
            romaji: None,
            original: Some("風".to_string()),
            pronunciation: Some("かぜ".to_string()),
        };
        assert_eq!(original_only.text(Spelling::Romaji, true), Some("風"));
        assert_eq!(PronounceableText::default().text(Spelling::Romaji, true), None);
    }

    #[test]
    fn splits_featuring() {
        assert_eq!(
            split_credit("ROUND TABLE featuring NINO"),
            vec![
                CreditPart::Artist("ROUND TABLE".to_string()),
                CreditPart::Joiner(" featuring ".to_string()),
                CreditPart::Artist("NINO".to_string()),
            ]
        );
    }

    #[test]
    fn single_artist_is_one_part() {
        assert_eq!(
            split_credit("Sakamoto Maaya"),
            vec![CreditPart::Artist("Sakamoto Maaya".to_string())]
        );
        assert!(split_credit("").is_empty());
    }

    #[test]
    fn splitting_round_trips() {
        for credit in [
            "Sheryl Nome starring May'n & Ranka Lee = Nakajima Megumi",
            "Kalafina, FictionJunction / Yuki Kajiura",
            "supercell feat. Nagi",
            "放課後ティータイム × 澪",
        ] {
            let joined: String = split_credit(credit).iter().map(CreditPart::text).collect();
            assert_eq!(joined, credit);
        }
    }

    #[test]
    fn matches_joiners_case_insensitively() {
        let parts = split_credit("supercell Feat. Nagi");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], CreditPart::Joiner(" Feat. ".to_string()));
    }
}
