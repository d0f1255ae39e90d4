//! Command handlers

pub mod card;
pub mod config;
pub mod deck;
pub mod export;
pub mod session;
pub mod template;
