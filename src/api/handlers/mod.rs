//! HTTP request handlers

pub mod convert;
pub mod health;
pub mod keys;
