//! Data models for crafting requests, resolved recipes and Discord reply payloads

use std::fmt;

use serde::{Deserialize, Serialize};

/// The title shape a request was recognised from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlePattern {
    /// `<item> for <character>`
    ItemForCharacter,
    /// `<character> needs <item>`
    CharacterNeedsItem,
    /// `Request: <item> - <character>`
    RequestPrefix,
}

/// A crafting request parsed from a forum post title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftingRequest {
    pub requested_item_name: String,
    pub requester_character: String,
    pub source_title: String,
    pub pattern: TitlePattern,
}

/// One item known to the data service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: u64,
    pub name: String,
}

impl ItemRef {
    /// Stand-in for a component whose name could not be looked up
    pub fn placeholder(id: u64) -> Self {
        Self {
            id,
            name: format!("Unknown Item (#{id})"),
        }
    }

    /// Stand-in for a crafting station whose name could not be looked up
    pub fn station_placeholder(id: u64) -> Self {
        Self {
            id,
            name: format!("Unknown Station (#{id})"),
        }
    }
}

/// A component pair exactly as the trades endpoint returned it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    pub item_id: u64,
    pub quantity: i64,
}

/// Recipe data before any name resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecipeData {
    pub tradeskill_code: Option<i64>,
    pub skill_level_required: i64,
    pub trivial_level: Option<i64>,
    pub station_container_id: Option<u64>,
    /// Source order, preserved all the way to the reply
    pub components: Vec<RawComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeComponent {
    pub item: ItemRef,
    /// Always at least 1
    pub quantity: u32,
}

/// Something that went wrong while assembling a recipe without making it unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialDataError {
    /// A component name lookup failed; the component carries a placeholder name
    Component { item_id: u64, reason: String },
    /// The station name lookup failed; the station carries a placeholder name
    Station { container_id: u64, reason: String },
    /// The source listed a component with a quantity below 1
    InvalidQuantity { item_id: u64, quantity: i64 },
    /// A skill level field was out of range and has been clamped
    InvalidLevel { field: &'static str, value: i64 },
    /// The recipe carried no tradeskill code, so the profession is unknown
    MissingTradeskill,
}

impl fmt::Display for PartialDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component { item_id, reason } => {
                write!(f, "component #{item_id} could not be named ({reason})")
            }
            Self::Station {
                container_id,
                reason,
            } => write!(
                f,
                "crafting station #{container_id} could not be named ({reason})"
            ),
            Self::InvalidQuantity { item_id, quantity } => write!(
                f,
                "component #{item_id} was listed with quantity {quantity} and was left out"
            ),
            Self::InvalidLevel { field, value } => {
                write!(f, "{field} of {value} is out of range")
            }
            Self::MissingTradeskill => write!(f, "recipe lists no tradeskill, profession unknown"),
        }
    }
}

/// A fully resolved recipe, ready to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub source_item: ItemRef,
    pub tradeskill_code: Option<i64>,
    pub profession_name: String,
    pub skill_level_required: u32,
    pub trivial_level: Option<u32>,
    pub station_container_id: Option<u64>,
    pub station_name: String,
    pub components: Vec<RecipeComponent>,
    pub partial_errors: Vec<PartialDataError>,
}

impl Recipe {
    pub fn is_partial(&self) -> bool {
        !self.partial_errors.is_empty()
    }
}

/// What could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    /// No item matched the requested name
    Item { name: String },
    /// The item exists but has no recipe on file
    Recipe { item: ItemRef },
}

/// Why a request produced no recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    NoMatchFound(Missing),
    UpstreamUnavailable {
        /// Human readable description of the lookup that failed
        lookup: String,
        status: Option<u16>,
        reason: String,
    },
}

impl Failure {
    /// Short tag for log fields
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NoMatchFound(Missing::Item { .. }) => "no_match_found.item",
            Self::NoMatchFound(Missing::Recipe { .. }) => "no_match_found.recipe",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
        }
    }
}

/// The single value handed from the resolver to the reply formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(Recipe),
    Failed(Failure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Recipe,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl ReplyField {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

/// Transport-neutral reply, rendered by the forum adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPayload {
    pub kind: ReplyKind,
    pub title: String,
    pub description: String,
    pub fields: Vec<ReplyField>,
    /// One `<quantity>x <name>` line per component, in recipe order
    pub components: Vec<String>,
    pub notes: Vec<String>,
}

/// Discord embed structure for thread replies
#[derive(Debug, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DiscordField>,
    pub footer: DiscordFooter,
}

/// Key-value field for Discord embeds
#[derive(Debug, Serialize)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct DiscordFooter {
    pub text: String,
}

/// Discord create-message payload
#[derive(Debug, Serialize)]
pub struct DiscordMessage {
    pub embeds: Vec<DiscordEmbed>,
}

/// Subset of a Discord channel object returned by the active threads endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordThread {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveThreads {
    pub threads: Vec<DiscordThread>,
}
