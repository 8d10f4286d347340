//! # prox-core
//!
//! Core types, geo math, and error types for the Proxima pipeline.
//!
//! This crate provides the foundational types shared across all Proxima crates:
//! - Entity structs for queue tasks, cache values, review items, discovery candidates
//! - Status enums with state machine transitions
//! - Validated coordinates, haversine distance, bounding boxes
//! - The `EntityStore` trait the pipeline consumes from the location directory
//! - Cross-cutting error types and the pipeline failure taxonomy
//! - Response types returned to map clients and operators

pub mod entities;
pub mod enums;
pub mod errors;
pub mod geo;
pub mod responses;
pub mod store;
