//! Forum post title parsing
//!
//! Recognises three request shapes, tried in order, each of which must match
//! the whole title:
//!
//! 1. `<item> for <character>`
//! 2. `<character> needs <item>`
//! 3. `Request: <item> - <character>`
//!
//! Matching is case-insensitive and runs of whitespace are collapsed first.
//! Shapes 1 and 3 split on the *last* separator so item names that contain
//! it survive ("Cloak for the Fallen for Gandalf").

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CraftingRequest, TitlePattern};

static ITEM_FOR_CHARACTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+)\s+for\s+(.+)$").expect("valid regex"));

static CHARACTER_NEEDS_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+needs\s+(.+)$").expect("valid regex"));

static REQUEST_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^request\s*:\s*(.+)\s+[-–]\s+(.+)$").expect("valid regex"));

/// Parse a post title into a crafting request. `None` means the post is not a
/// request at all, which is the common case in a shared forum.
pub fn parse(title: &str) -> Option<CraftingRequest> {
    let normalized = collapse_whitespace(title);
    if normalized.is_empty() {
        return None;
    }

    let patterns: [(&Regex, TitlePattern); 3] = [
        (&ITEM_FOR_CHARACTER, TitlePattern::ItemForCharacter),
        (&CHARACTER_NEEDS_ITEM, TitlePattern::CharacterNeedsItem),
        (&REQUEST_PREFIX, TitlePattern::RequestPrefix),
    ];

    patterns
        .into_iter()
        .find_map(|(regex, pattern)| try_pattern(regex, pattern, &normalized, title))
}

fn try_pattern(
    regex: &Regex,
    pattern: TitlePattern,
    normalized: &str,
    source_title: &str,
) -> Option<CraftingRequest> {
    let captures = regex.captures(normalized)?;
    let first = captures.get(1)?.as_str().trim();
    let second = captures.get(2)?.as_str().trim();

    let (item, character) = match pattern {
        TitlePattern::ItemForCharacter | TitlePattern::RequestPrefix => (first, second),
        TitlePattern::CharacterNeedsItem => (second, first),
    };

    if item.is_empty() || character.is_empty() {
        return None;
    }

    Some(CraftingRequest {
        requested_item_name: item.to_string(),
        requester_character: character.to_string(),
        source_title: source_title.to_string(),
        pattern,
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
