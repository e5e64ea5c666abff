//! Contracts with the forum host: where posts come from and where replies go

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ReplyPayload;

/// A newly created forum post (a thread in a forum channel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub thread_id: u64,
    /// Forum the thread was created in
    pub forum_id: u64,
    pub title: String,
}

#[async_trait]
pub trait ForumHost: Send + Sync {
    /// Forum whose posts get replies
    fn watched_forum_id(&self) -> u64;

    /// Post a reply into a thread
    async fn post_reply(&self, thread_id: u64, reply: &ReplyPayload) -> Result<()>;
}
