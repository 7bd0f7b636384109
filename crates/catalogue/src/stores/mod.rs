//! The three catalogue stores.
//!
//! Each store owns its records outright and answers queries with borrowed
//! slices or freshly built `Vec`s, never with handles into its internals.

pub mod credits;
pub mod movies;
pub mod ratings;

pub use credits::{Credits, DEFAULT_STAR_BILLING_CUTOFF};
pub use movies::Movies;
pub use ratings::Ratings;
