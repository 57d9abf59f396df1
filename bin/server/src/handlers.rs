//! HTTP request handlers

pub mod document;
pub mod error;
pub mod health;
mod pipeline;
pub mod registration;
