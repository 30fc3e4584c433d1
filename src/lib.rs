pub mod config;
pub mod feed;
pub mod gemini;
pub mod http_client;
pub mod ledger;
pub mod provider;
pub mod state;
pub mod store;
pub mod ui;
