pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod provider;
pub mod upload;
pub mod web_server;
