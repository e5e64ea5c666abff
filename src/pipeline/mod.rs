//! Per-post pipeline: parse the title, resolve the recipe, post the reply
//!
//! ```text
//! Received -> Parsed -> Resolving -> Replied
//! Received -> Ignored
//! *        -> Failed    (a failure reply has been posted)
//! ```
//!
//! There are no retries here beyond the data client's own; a failed post is
//! final and the user may simply post again.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::client::DataSource;
use crate::forum::{ForumHost, NewPost};
use crate::models::{Failure, ResolutionOutcome};
use crate::parser;
use crate::reply;
use crate::resolver::RecipeResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OutsideWatchedForum,
    /// The title matched no request shape; most forum posts end here
    TitleUnparseable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostState {
    Received,
    Parsed,
    Resolving,
    Replied,
    Ignored(IgnoreReason),
    Failed(Failure),
}

impl PostState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Replied | Self::Ignored(_) | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Parsed => "parsed",
            Self::Resolving => "resolving",
            Self::Replied => "replied",
            Self::Ignored(_) => "ignored",
            Self::Failed(_) => "failed",
        }
    }
}

pub struct Coordinator<D, F> {
    resolver: RecipeResolver<D>,
    forum: Arc<F>,
    /// End-to-end limit for resolving one post
    budget: Duration,
}

impl<D: DataSource, F: ForumHost> Coordinator<D, F> {
    pub fn new(source: Arc<D>, forum: Arc<F>, budget: Duration) -> Self {
        Self {
            resolver: RecipeResolver::new(source),
            forum,
            budget,
        }
    }

    /// Run one post to a terminal state. `Err` only when the reply itself
    /// could not be delivered.
    pub async fn handle_post(&self, post: &NewPost) -> Result<PostState> {
        let state = PostState::Received;

        if self.forum.watched_forum_id() != post.forum_id {
            return Ok(transition(
                post,
                &state,
                PostState::Ignored(IgnoreReason::OutsideWatchedForum),
            ));
        }

        let Some(request) = parser::parse(&post.title) else {
            debug!("Post title doesn't match a crafting request: '{}'", post.title);
            return Ok(transition(
                post,
                &state,
                PostState::Ignored(IgnoreReason::TitleUnparseable),
            ));
        };

        let state = transition(post, &state, PostState::Parsed);
        info!(
            "Processing crafting request: {} for {}",
            request.requested_item_name, request.requester_character
        );
        let state = transition(post, &state, PostState::Resolving);

        let outcome = match tokio::time::timeout(self.budget, self.resolver.resolve(&request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => ResolutionOutcome::Failed(Failure::UpstreamUnavailable {
                lookup: format!("recipe for '{}'", request.requested_item_name),
                status: None,
                reason: format!("no answer within {}s", self.budget.as_secs_f32()),
            }),
        };

        let payload = reply::format(&outcome, &request);
        self.forum
            .post_reply(post.thread_id, &payload)
            .await
            .with_context(|| format!("failed to post reply in thread {}", post.thread_id))?;

        let terminal = match outcome {
            ResolutionOutcome::Resolved(recipe) => {
                info!(
                    components = recipe.components.len(),
                    partial = recipe.is_partial(),
                    "Recipe request fulfilled: {} for {}",
                    recipe.source_item.name,
                    request.requester_character
                );
                PostState::Replied
            }
            ResolutionOutcome::Failed(failure) => {
                match &failure {
                    Failure::UpstreamUnavailable {
                        lookup,
                        status,
                        reason,
                    } => error!(
                        thread_id = post.thread_id,
                        status = ?status,
                        "Data service unavailable during {}: {}",
                        lookup,
                        reason
                    ),
                    other => info!(
                        thread_id = post.thread_id,
                        tag = other.tag(),
                        "Nothing found for '{}'",
                        request.requested_item_name
                    ),
                }
                PostState::Failed(failure)
            }
        };

        Ok(transition(post, &state, terminal))
    }
}

impl<D, F> Clone for Coordinator<D, F> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            forum: Arc::clone(&self.forum),
            budget: self.budget,
        }
    }
}

fn transition(post: &NewPost, from: &PostState, to: PostState) -> PostState {
    debug!(
        thread_id = post.thread_id,
        from = from.name(),
        to = to.name(),
        "Post state changed"
    );
    to
}
