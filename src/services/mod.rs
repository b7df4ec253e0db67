// src/services/mod.rs
pub mod calculations;
pub mod chat;
pub mod google_oauth;
pub mod health;
pub mod market_data;
pub mod news;
pub mod tasks;
