pub mod cache;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod latency;
pub mod lifecycle;
pub mod resource;
pub mod theme;
pub mod tui;
pub mod types;
pub mod views;
pub mod web;
