// Library exports for ShareIt
// This allows integration tests and the binary to share the modules

pub mod booking;
pub mod comment;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod item;
pub mod pagination;
pub mod request;
pub mod routes;
pub mod state;
pub mod user;
