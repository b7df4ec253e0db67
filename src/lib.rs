// src/lib.rs

pub mod client;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod state;
