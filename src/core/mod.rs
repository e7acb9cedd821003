//! Configuration and the request data model

pub mod config;
pub mod models;
