pub mod api;
pub mod cli;
pub mod client;
pub mod concierge;
pub mod config;
pub mod db;
pub mod llm;
pub mod state;
pub mod terminal;
