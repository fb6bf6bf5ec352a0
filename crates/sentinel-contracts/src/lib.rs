//! # sentinel-contracts
//!
//! Shared types, event vocabulary, and error contracts for the Sentinel
//! access-control backend.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod error;
pub mod event;
pub mod outcome;
pub mod policy;
pub mod session;
pub mod user;
