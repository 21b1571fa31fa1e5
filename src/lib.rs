pub mod amount;
pub mod balances;
pub mod classifier;
pub mod config;
pub mod contracts;
pub mod fetcher;
pub mod indexer;
pub mod models;
pub mod optimistic;
pub mod query;
pub mod refresher;
pub mod rpc;
pub mod submit;
pub mod tokens;
