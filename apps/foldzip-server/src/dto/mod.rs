//! Request and response types exposed through the OpenAPI document

pub mod photosession;
