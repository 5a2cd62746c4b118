pub mod adapters;
pub mod appearance;
pub mod config;
pub mod error;
pub mod web;
