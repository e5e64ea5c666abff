//! EverQuest tradeskill codes and their profession names

/// Crafting and production skills as numbered in the game data
const TRADESKILLS: &[(i64, &str)] = &[
    (55, "Fishing"),
    (56, "Make Poison"),
    (57, "Tinkering"),
    (58, "Research"),
    (59, "Alchemy"),
    (60, "Baking"),
    (61, "Tailoring"),
    (63, "Blacksmithing"),
    (64, "Fletching"),
    (65, "Brewing"),
    (68, "Jewelry Making"),
    (69, "Pottery"),
];

/// Label used when a recipe names no tradeskill at all
pub const UNKNOWN_PROFESSION: &str = "Unknown Profession";

/// Display name for a tradeskill code. Never fails: unmapped codes get a
/// label carrying the raw code.
pub fn profession_name_for(code: i64) -> String {
    TRADESKILLS
        .iter()
        .find(|(known, _)| *known == code)
        .map_or_else(
            || format!("Unknown Tradeskill ({code})"),
            |(_, name)| (*name).to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_codes() {
        assert_eq!(profession_name_for(63), "Blacksmithing");
        assert_eq!(profession_name_for(69), "Pottery");
        assert_eq!(profession_name_for(55), "Fishing");
    }

    #[test]
    fn unknown_codes_fall_back_to_labelled_code() {
        assert_eq!(profession_name_for(62), "Unknown Tradeskill (62)");
        assert_eq!(profession_name_for(-1), "Unknown Tradeskill (-1)");
    }
}
