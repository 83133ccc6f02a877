//! HTTP handlers

pub mod photosession;
