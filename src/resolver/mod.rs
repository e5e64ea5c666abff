//! Recipe resolution: item name -> item -> recipe -> component and station names
//!
//! Only the item search and the recipe fetch can fail a request. Component
//! and station lookups degrade to placeholder names and are recorded as
//! [`PartialDataError`]s on the recipe.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::client::DataSource;
use crate::error::ClientError;
use crate::models::{
    CraftingRequest, Failure, ItemRef, Missing, PartialDataError, RawRecipeData, Recipe,
    RecipeComponent, ResolutionOutcome,
};
use crate::tradeskills;

pub struct RecipeResolver<D> {
    source: Arc<D>,
}

impl<D: DataSource> RecipeResolver<D> {
    pub fn new(source: Arc<D>) -> Self {
        Self { source }
    }

    pub async fn resolve(&self, request: &CraftingRequest) -> ResolutionOutcome {
        match self.try_resolve(request).await {
            Ok(recipe) => ResolutionOutcome::Resolved(recipe),
            Err(failure) => ResolutionOutcome::Failed(failure),
        }
    }

    async fn try_resolve(&self, request: &CraftingRequest) -> Result<Recipe, Failure> {
        let name = &request.requested_item_name;

        let candidates = self
            .source
            .search_item_by_name(name)
            .await
            .map_err(|err| upstream(format!("item search for '{name}'"), &err))?;

        let Some(item) = select_candidate(name, candidates) else {
            info!("No item found for '{}'", name);
            return Err(Failure::NoMatchFound(Missing::Item { name: name.clone() }));
        };

        let raw = self
            .source
            .fetch_recipe_by_item_id(item.id)
            .await
            .map_err(|err| upstream(format!("recipe for item #{}", item.id), &err))?;

        let Some(raw) = raw else {
            info!("Item '{}' (#{}) has no recipe on file", item.name, item.id);
            return Err(Failure::NoMatchFound(Missing::Recipe { item }));
        };

        let recipe = self.assemble(item, raw).await;
        if recipe.is_partial() {
            for issue in &recipe.partial_errors {
                warn!(item = %recipe.source_item.name, "Partial recipe data: {}", issue);
            }
        }

        Ok(recipe)
    }

    /// Resolve component and station names concurrently and build the recipe.
    /// Component order always follows the raw recipe.
    async fn assemble(&self, source_item: ItemRef, raw: RawRecipeData) -> Recipe {
        let mut partial_errors = Vec::new();

        let mut wanted = Vec::with_capacity(raw.components.len());
        for component in &raw.components {
            match u32::try_from(component.quantity) {
                Ok(quantity) if quantity >= 1 => wanted.push((component.item_id, quantity)),
                _ => partial_errors.push(PartialDataError::InvalidQuantity {
                    item_id: component.item_id,
                    quantity: component.quantity,
                }),
            }
        }

        let component_lookups = join_all(wanted.iter().map(|(id, _)| self.item_name(*id)));
        let station_lookup = async {
            match raw.station_container_id {
                Some(id) => Some(self.item_name(id).await),
                None => None,
            }
        };
        let (component_results, station_result) = tokio::join!(component_lookups, station_lookup);

        let mut components = Vec::with_capacity(wanted.len());
        for ((item_id, quantity), result) in wanted.into_iter().zip(component_results) {
            let item = result.unwrap_or_else(|reason| {
                partial_errors.push(PartialDataError::Component { item_id, reason });
                ItemRef::placeholder(item_id)
            });
            components.push(RecipeComponent { item, quantity });
        }

        let station_name = match (raw.station_container_id, station_result) {
            (Some(_), Some(Ok(station))) => station.name,
            (Some(container_id), Some(Err(reason))) => {
                partial_errors.push(PartialDataError::Station {
                    container_id,
                    reason,
                });
                ItemRef::station_placeholder(container_id).name
            }
            _ => "Unknown Station".to_string(),
        };

        let profession_name = match raw.tradeskill_code {
            Some(code) => tradeskills::profession_name_for(code),
            None => {
                partial_errors.push(PartialDataError::MissingTradeskill);
                tradeskills::UNKNOWN_PROFESSION.to_string()
            }
        };

        let skill_level_required = level(
            "skill level",
            raw.skill_level_required,
            &mut partial_errors,
        );
        let trivial_level = raw
            .trivial_level
            .map(|value| level("trivial level", value, &mut partial_errors));

        Recipe {
            source_item,
            tradeskill_code: raw.tradeskill_code,
            profession_name,
            skill_level_required,
            trivial_level,
            station_container_id: raw.station_container_id,
            station_name,
            components,
            partial_errors,
        }
    }

    /// Name lookup that never fails the recipe; the error string is kept for
    /// diagnostics
    async fn item_name(&self, id: u64) -> Result<ItemRef, String> {
        match self.source.fetch_item_by_id(id).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err("not found".to_string()),
            Err(err) => Err(err.to_string()),
        }
    }
}

impl<D> Clone for RecipeResolver<D> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

/// Exact case-insensitive name match first, otherwise the first result
fn select_candidate(name: &str, candidates: Vec<ItemRef>) -> Option<ItemRef> {
    let wanted = name.trim().to_lowercase();
    let exact = candidates
        .iter()
        .position(|item| item.name.trim().to_lowercase() == wanted);

    candidates.into_iter().nth(exact.unwrap_or(0))
}

fn level(field: &'static str, value: i64, issues: &mut Vec<PartialDataError>) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        issues.push(PartialDataError::InvalidLevel { field, value });
        if value < 0 { 0 } else { u32::MAX }
    })
}

fn upstream(lookup: String, err: &ClientError) -> Failure {
    Failure::UpstreamUnavailable {
        lookup,
        status: err.status(),
        reason: err.to_string(),
    }
}
