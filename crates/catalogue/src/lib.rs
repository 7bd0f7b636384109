//! # Catalogue Crate
//!
//! An in-memory film catalogue built on the containers in `structures`.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Film, Person, credits, Rating)
//! - **stores**: The movies, credits and ratings stores
//! - **parser**: Parse the `::`-separated feed files
//! - **index**: The [`Catalogue`] façade that loads a feed and ties the stores together
//! - **error**: Error types for loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalogue::Catalogue;
//! use std::path::Path;
//!
//! let (catalogue, _report) = Catalogue::load_from_files(Path::new("data/catalogue"))?;
//!
//! let film = catalogue.movies().get(862).unwrap();
//! let cast = catalogue.credits().film_cast(862);
//! println!("{} has {} cast members", film.title, cast.len());
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod stores;
pub mod types;

pub use error::{CatalogueError, Result};
pub use index::{Catalogue, LoadReport};
pub use stores::{Credits, DEFAULT_STAR_BILLING_CUTOFF, Movies, Ratings};
pub use types::{
    // Type aliases
    CollectionId,
    MovieId,
    PersonId,
    UserId,
    // Core types
    CastCredit,
    Collection,
    Company,
    CrewCredit,
    Film,
    FilmCredits,
    Genre,
    Person,
    Rating,
    Vote,
    RATING_RANGE,
};
