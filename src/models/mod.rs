// src/models/mod.rs
pub mod auth;
pub mod message;
