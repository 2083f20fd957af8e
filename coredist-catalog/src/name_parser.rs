//! Parser for free-text game names.
//!
//! Game list entries encode identification metadata in the fullname:
//! ```text
//! Super Game (USA) (Proto) [b]
//! ```
//!
//! The shortname is the prefix before the first parenthesis or bracket
//! group; every group's content becomes a tag. Tags are case-sensitive and
//! deduplicated as an unordered set.

/// Parsed components of a game fullname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGameName {
    /// Name prefix before the first tag group, trailing whitespace trimmed.
    pub shortname: String,
    /// Contents of every `(...)` and `[...]` group, deduplicated,
    /// in order of first appearance.
    pub tags: Vec<String>,
}

/// Parse a game fullname into shortname and tags.
///
/// # Examples
///
/// ```
/// use coredist_catalog::name_parser::parse_game_name;
///
/// let parsed = parse_game_name("Super Game (USA) (Proto)");
/// assert_eq!(parsed.shortname, "Super Game");
/// assert_eq!(parsed.tags, vec!["USA", "Proto"]);
/// ```
pub fn parse_game_name(name: &str) -> ParsedGameName {
    let mut tags: Vec<String> = Vec::new();
    let mut shortname_end = None;
    let mut chars = name.char_indices();

    while let Some((i, ch)) = chars.next() {
        let (open, close) = match ch {
            '(' => ('(', ')'),
            '[' => ('[', ']'),
            _ => continue,
        };

        if shortname_end.is_none() {
            shortname_end = Some(i);
        }

        let mut depth = 1u32;
        let start = i + open.len_utf8();
        let mut end = start;

        for (j, c) in chars.by_ref() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    end = j;
                    break;
                }
            }
        }

        let content = name[start..end].trim().to_string();
        if !content.is_empty() && !tags.contains(&content) {
            tags.push(content);
        }
    }

    let shortname = match shortname_end {
        Some(pos) => name[..pos].trim_end().to_string(),
        None => name.trim().to_string(),
    };

    ParsedGameName { shortname, tags }
}
