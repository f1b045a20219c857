//! HTTP request handlers.

pub mod catalog;
pub mod health;
pub mod media;
pub mod webhooks;
