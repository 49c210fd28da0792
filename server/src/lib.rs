pub mod config;
pub mod db;
pub mod error;
pub mod gemini;
pub mod repository;
pub mod routes;
pub mod suggest;
