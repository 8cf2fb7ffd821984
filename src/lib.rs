pub mod api;
pub mod composer;
pub mod config;
pub mod data_models;
pub mod llm;
pub mod search;
pub mod session;
