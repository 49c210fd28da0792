pub mod api;
pub mod app;
pub mod config;
pub mod reconcile;
pub mod ui;
