// src/handlers/mod.rs
pub mod chat;
pub mod error;
pub mod health;
pub mod news;
pub mod status;
pub mod stocks;
pub mod tasks;
