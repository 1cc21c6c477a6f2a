// src/handlers/mod.rs
pub mod auth;
pub mod chat;
pub mod sessions;
pub mod status;
