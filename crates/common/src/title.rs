use serde::{Deserialize, Serialize};

use crate::role::{parse_roles, RoleAssignment};

/// A raw track title split into its bare text and the trailing parenthetical,
/// e.g. `"Lion (Macross Frontier OP2)"` -> `"Lion"` + `"Macross Frontier OP2"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    pub title: String,
    pub annotation: Option<String>,
}

/// Title text with every role parsed out of its annotation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TitleParts {
    pub title: String,
    pub roles: Vec<RoleAssignment>,
}

pub fn split_title(raw: &str) -> ParsedTitle {
    let trimmed = raw.trim();
    let open_idx = match trailing_group_start(trimmed) {
        Some(idx) => idx,
        None => {
            return ParsedTitle {
                title: trimmed.to_string(),
                annotation: None,
            }
        }
    };

    // Both delimiters are single-byte ASCII.
    let annotation = &trimmed[open_idx + 1..trimmed.len() - 1];
    let title = trimmed[..open_idx].trim();
    ParsedTitle {
        title: title.to_string(),
        annotation: Some(annotation.to_string()),
    }
}

pub fn parse_title(raw: &str) -> TitleParts {
    let parsed = split_title(raw);
    let roles = parsed
        .annotation
        .as_deref()
        .map(parse_roles)
        .unwrap_or_default();
    TitleParts {
        title: parsed.title,
        roles,
    }
}

/// Byte offset of the `(` that balances the final `)`, scanning backwards.
fn trailing_group_start(text: &str) -> Option<usize> {
    if !text.ends_with(')') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            return Some(idx);
        }
    }
    None
}
