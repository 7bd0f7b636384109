//! Core domain types for the film catalogue.
//!
//! Records here are plain data with public fields. The stores in
//! [`crate::stores`] own them and decide how they are indexed.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use structures::IndexList;

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up the different id spaces

/// Unique identifier for a film
pub type MovieId = u32;

/// Unique identifier for a cast or crew member
pub type PersonId = u32;

/// Unique identifier for a rating user
pub type UserId = u32;

/// Unique identifier for a film collection (franchise)
pub type CollectionId = u32;

// =============================================================================
// Film-related Types
// =============================================================================

/// A genre tag as carried by the feed (`id:name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// A production company credited on a film
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Company {
    pub id: u32,
    pub name: String,
}

/// An external (IMDb-style) average score and the number of votes behind it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub average: f64,
    pub count: u32,
}

/// A named group of films, e.g. a franchise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub poster_path: String,
    pub backdrop_path: String,
}

/// Everything the catalogue knows about a single film
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Film {
    pub id: MovieId,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    /// `None` when the feed has an empty tagline
    pub tagline: Option<String>,
    pub status: String,
    pub genres: Vec<Genre>,
    /// Release date; films without one are never date-indexed
    pub release: Option<NaiveDate>,
    /// Budget in US dollars
    pub budget: i64,
    /// Revenue in US dollars
    pub revenue: i64,
    /// ISO 639 codes of the spoken languages
    pub languages: Vec<String>,
    pub original_language: String,
    /// Runtime in minutes
    pub runtime: f64,
    pub homepage: String,
    pub adult: bool,
    /// Direct-to-video release
    pub video: bool,
    /// Unique part of the poster URL (empty if unknown)
    pub poster: String,

    // Set after the film is added
    pub vote: Option<Vote>,
    pub collection_id: Option<CollectionId>,
    pub imdb_id: Option<String>,
    pub popularity: f64,
    pub production_companies: IndexList<Company>,
    /// ISO 3166 two-letter country codes
    pub production_countries: IndexList<String>,
}

impl Film {
    /// A film with only an id and a title; every other field is empty
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id,
            original_title: title.clone(),
            title,
            overview: String::new(),
            tagline: None,
            status: String::new(),
            genres: Vec::new(),
            release: None,
            budget: 0,
            revenue: 0,
            languages: Vec::new(),
            original_language: String::new(),
            runtime: 0.0,
            homepage: String::new(),
            adult: false,
            video: false,
            poster: String::new(),
            vote: None,
            collection_id: None,
            imdb_id: None,
            popularity: 0.0,
            production_companies: IndexList::new(),
            production_countries: IndexList::new(),
        }
    }

    pub fn with_release(mut self, release: NaiveDate) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_original_title(mut self, original_title: impl Into<String>) -> Self {
        self.original_title = original_title.into();
        self
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    pub fn with_genres(mut self, genres: Vec<Genre>) -> Self {
        self.genres = genres;
        self
    }

    /// Case-insensitive substring match on title, original title or overview
    pub fn mentions(&self, needle_lowercase: &str) -> bool {
        [&self.title, &self.original_title, &self.overview]
            .iter()
            .any(|text| text.to_lowercase().contains(needle_lowercase))
    }
}

// =============================================================================
// People and Credits
// =============================================================================

/// A cast or crew member, deduplicated across films
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Unique part of the profile picture URL, if known
    pub profile_path: Option<String>,
}

/// One acting role on one film
///
/// A person playing two roles in the same film has two `CastCredit`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastCredit {
    pub person_id: PersonId,
    pub name: String,
    pub character: String,
    /// Billing position, 0 for the top-billed actor
    pub order: u32,
    pub profile_path: Option<String>,
}

/// One crew job on one film
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewCredit {
    pub person_id: PersonId,
    pub name: String,
    pub department: String,
    pub job: String,
    pub profile_path: Option<String>,
}

impl CastCredit {
    pub fn person(&self) -> Person {
        Person {
            id: self.person_id,
            name: self.name.clone(),
            profile_path: self.profile_path.clone(),
        }
    }
}

impl CrewCredit {
    pub fn person(&self) -> Person {
        Person {
            id: self.person_id,
            name: self.name.clone(),
            profile_path: self.profile_path.clone(),
        }
    }
}

/// Credits for one film, as grouped by the feed parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilmCredits {
    pub cast: Vec<CastCredit>,
    pub crew: Vec<CrewCredit>,
}

// =============================================================================
// Rating Type
// =============================================================================

/// A single rating from a user for a film
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value from 0.0 to 5.0 inclusive
    pub rating: f32,
    pub timestamp: NaiveDateTime,
}

/// Lowest and highest accepted rating values
pub const RATING_RANGE: std::ops::RangeInclusive<f32> = 0.0..=5.0;
