//! Domain Layer
//!
//! Samples, gauge records, the serializer and the ports the uploader talks
//! through. Nothing in here knows about HTTP.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
