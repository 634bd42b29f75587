mod client;
mod config;
mod models;

pub use client::SteamStorefront;
pub use config::SteamConfig;
