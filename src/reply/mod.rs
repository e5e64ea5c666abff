//! Rendering of resolution outcomes into reply payloads. Pure, no I/O.

use crate::models::{
    CraftingRequest, Failure, Missing, Recipe, ReplyField, ReplyKind, ReplyPayload,
    ResolutionOutcome,
};

pub fn format(outcome: &ResolutionOutcome, request: &CraftingRequest) -> ReplyPayload {
    match outcome {
        ResolutionOutcome::Resolved(recipe) => format_recipe(recipe, request),
        ResolutionOutcome::Failed(failure) => format_failure(failure, request),
    }
}

fn format_recipe(recipe: &Recipe, request: &CraftingRequest) -> ReplyPayload {
    let trivial = recipe
        .trivial_level
        .map_or_else(|| "Unknown".to_string(), |level| level.to_string());

    let components = recipe
        .components
        .iter()
        .map(|c| format!("{}x {}", c.quantity, c.item.name))
        .collect();

    let notes = recipe
        .partial_errors
        .iter()
        .map(|issue| format!("⚠️ Incomplete data: {issue}"))
        .collect();

    ReplyPayload {
        kind: ReplyKind::Recipe,
        title: format!("🔨 Recipe: {}", recipe.source_item.name),
        description: format!(
            "Requested for character: **{}**",
            request.requester_character
        ),
        fields: vec![
            ReplyField::inline("Profession", &recipe.profession_name),
            ReplyField::inline("Skill Required", recipe.skill_level_required.to_string()),
            ReplyField::inline("Trivial", trivial),
            ReplyField::inline("Crafting Station", &recipe.station_name),
        ],
        components,
        notes,
    }
}

fn format_failure(failure: &Failure, request: &CraftingRequest) -> ReplyPayload {
    let (title, description, fields) = match failure {
        Failure::NoMatchFound(Missing::Item { name }) => (
            "❌ Item Not Found".to_string(),
            format!(
                "Could not find item: **{name}**\n\
                 Please check the spelling in your post title."
            ),
            Vec::new(),
        ),
        Failure::NoMatchFound(Missing::Recipe { item }) => (
            "❌ Recipe Not Found".to_string(),
            format!(
                "**{}** exists, but there is no crafting recipe on file for it.\n\
                 This item may not be craftable.",
                item.name
            ),
            vec![ReplyField::inline("Item ID", item.id.to_string())],
        ),
        Failure::UpstreamUnavailable {
            lookup, status, ..
        } => {
            let cause = status.map_or_else(
                || "could not be reached".to_string(),
                |code| format!("answered with HTTP {code}"),
            );
            (
                "⏳ Data Service Unavailable".to_string(),
                format!(
                    "The item database is temporarily unavailable ({cause}), so the recipe \
                     for **{}** could not be fetched.\n\
                     Please try again in a few minutes by creating a new post.",
                    request.requested_item_name
                ),
                vec![ReplyField::inline("Failed Lookup", lookup)],
            )
        }
    };

    ReplyPayload {
        kind: ReplyKind::Failure,
        title,
        description,
        fields,
        components: Vec::new(),
        notes: Vec::new(),
    }
}
