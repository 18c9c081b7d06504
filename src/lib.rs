pub mod admission;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod scanners;
pub mod stores;
