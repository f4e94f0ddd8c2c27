//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs`: serde types matching the API's JSON
//! - `client.rs`: sub-client translating typed parameters into transport calls

pub mod account;
pub mod board;
pub mod external_engine;
pub mod games;
pub mod tablebase;
