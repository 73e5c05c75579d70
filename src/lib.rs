pub mod config;
pub mod domain;
pub mod error;
pub mod feedback;
pub mod middleware;
pub mod services;
pub mod state;
pub mod web;
