pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod forms;
pub mod models;
pub mod observability;
pub mod platform;
pub mod realtime;
pub mod screens;
pub mod state;
