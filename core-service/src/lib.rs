pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod layers;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod services;
pub mod state;
