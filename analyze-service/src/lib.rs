//! analyze-service: relays health findings to a generative-AI provider and
//! returns the model's answer as JSON.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;
pub mod startup;
