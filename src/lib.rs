//! EverQuest crafting request bot
//!
//! Watches a Discord forum for posts titled like "Black Acrylia Pick for
//! Gandalf", looks the recipe up on eqdb.net and replies in the thread.

pub mod client;
pub mod config;
pub mod crafting_bot;
pub mod discord;
pub mod error;
pub mod forum;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod reply;
pub mod resolver;
pub mod tradeskills;
