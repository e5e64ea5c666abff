use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, error, info};

use crate::client::EqdbClient;
use crate::config::Config;
use crate::discord::DiscordForum;
use crate::pipeline::{Coordinator, PostState};

#[derive(Clone)]
pub struct CraftingBot {
    forum: Arc<DiscordForum>,
    coordinator: Coordinator<EqdbClient, DiscordForum>,
}

impl CraftingBot {
    pub fn new(config: &Config) -> Result<Self> {
        let eqdb = EqdbClient::new(
            &config.eqdb.base_url,
            config.eqdb.timeout,
            config.eqdb.retry.clone(),
        )?;
        let forum = Arc::new(DiscordForum::new(&config.discord)?);
        let coordinator = Coordinator::new(Arc::new(eqdb), Arc::clone(&forum), config.post_timeout);

        Ok(Self { forum, coordinator })
    }

    pub async fn check_for_new_posts(&self) -> Result<()> {
        let posts = self.forum.poll_new_posts().await?;
        if posts.is_empty() {
            debug!("No new forum posts");
            return Ok(());
        }

        let results = join_all(posts.iter().map(|post| self.coordinator.handle_post(post))).await;

        let mut replied = 0;
        for (post, result) in posts.iter().zip(results) {
            match result {
                Ok(PostState::Replied) => replied += 1,
                Ok(state) => debug!(thread_id = post.thread_id, state = ?state, "Post finished"),
                Err(e) => error!("Error processing post '{}': {:#}", post.title, e),
            }
        }

        info!("Processed {} new posts, {} recipes posted", posts.len(), replied);
        Ok(())
    }
}
