//! Film store: films by id, a release-date range index and collections.

use crate::types::{Collection, CollectionId, Company, Film, MovieId, Vote};
use chrono::NaiveDate;
use structures::{HashTable, IndexList, RangeTree};
use tracing::debug;

#[derive(Debug)]
struct CollectionEntry {
    collection: Collection,
    films: IndexList<MovieId>,
}

/// Films keyed by id, with release dates indexed for range queries.
///
/// The release-date tree is the only place dates are indexed; it is kept in
/// step with the film table on every add and remove.
#[derive(Debug, Default)]
pub struct Movies {
    films: HashTable<MovieId, Film>,
    released: RangeTree<NaiveDate, MovieId>,
    collections: HashTable<CollectionId, CollectionEntry>,
}

impl Movies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a film; a film with the same id already stored is left alone and
    /// `false` is returned.
    pub fn add(&mut self, film: Film) -> bool {
        let (id, release) = (film.id, film.release);
        if !self.films.add(id, film) {
            debug!(film_id = id, "rejected duplicate film");
            return false;
        }

        if let Some(date) = release {
            self.released.insert(date, id);
        }
        true
    }

    /// Removes a film along with its date index entry and collection membership
    pub fn remove(&mut self, id: MovieId) -> bool {
        let Some(film) = self.films.remove(&id) else {
            return false;
        };

        if let Some(date) = film.release {
            self.released.remove(&date, &id);
        }
        if let Some(collection_id) = film.collection_id {
            self.detach_from_collection(collection_id, id);
        }
        true
    }

    pub fn get(&self, id: MovieId) -> Option<&Film> {
        self.films.get(&id)
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.films.contains_key(&id)
    }

    pub fn title(&self, id: MovieId) -> Option<&str> {
        self.get(id).map(|film| film.title.as_str())
    }

    pub fn release(&self, id: MovieId) -> Option<NaiveDate> {
        self.get(id).and_then(|film| film.release)
    }

    /// Every stored film id, in no particular order
    pub fn all_ids(&self) -> Vec<MovieId> {
        self.films.keys()
    }

    /// Films released strictly after `start` and strictly before `end`.
    ///
    /// A film released on either boundary date is not included. Results are
    /// ordered by release date.
    pub fn released_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<MovieId> {
        let found = self.released.range_query(&start, &end);
        debug!(%start, %end, found = found.len(), "release range query");
        found
    }

    pub fn set_vote(&mut self, id: MovieId, average: f64, count: u32) -> bool {
        match self.films.get_mut(&id) {
            Some(film) => {
                film.vote = Some(Vote { average, count });
                true
            }
            None => false,
        }
    }

    pub fn vote(&self, id: MovieId) -> Option<Vote> {
        self.get(id).and_then(|film| film.vote)
    }

    pub fn set_imdb(&mut self, id: MovieId, imdb_id: impl Into<String>) -> bool {
        match self.films.get_mut(&id) {
            Some(film) => {
                film.imdb_id = Some(imdb_id.into());
                true
            }
            None => false,
        }
    }

    /// Sets (or replaces) a film's popularity
    pub fn set_popularity(&mut self, id: MovieId, popularity: f64) -> bool {
        match self.films.get_mut(&id) {
            Some(film) => {
                film.popularity = popularity;
                true
            }
            None => false,
        }
    }

    /// Credits a production company; `false` for an unknown film or a
    /// company already credited
    pub fn add_production_company(&mut self, id: MovieId, company: Company) -> bool {
        self.films
            .get_mut(&id)
            .is_some_and(|film| film.production_companies.insert(company))
    }

    /// Adds an ISO 3166 production country; duplicates are rejected
    pub fn add_production_country(&mut self, id: MovieId, country: impl Into<String>) -> bool {
        let country = country.into();
        self.films
            .get_mut(&id)
            .is_some_and(|film| film.production_countries.insert(country))
    }

    /// Puts a film into a collection, creating the collection on first use.
    ///
    /// When the collection already exists its stored metadata wins over the
    /// one passed in. A film moved to another collection leaves its old one.
    pub fn add_to_collection(&mut self, film_id: MovieId, collection: Collection) -> bool {
        let collection_id = collection.id;
        let Some(film) = self.films.get_mut(&film_id) else {
            return false;
        };
        let previous = film.collection_id.replace(collection_id);

        if let Some(previous) = previous.filter(|&previous| previous != collection_id) {
            self.detach_from_collection(previous, film_id);
        }

        let entry = self
            .collections
            .get_or_insert_with(collection_id, || CollectionEntry {
                collection,
                films: IndexList::new(),
            });
        entry.films.insert(film_id);
        true
    }

    /// Film ids in a collection, in the order they joined it
    pub fn films_in_collection(&self, collection_id: CollectionId) -> Vec<MovieId> {
        self.collections
            .get(&collection_id)
            .map(|entry| entry.films.to_vec())
            .unwrap_or_default()
    }

    pub fn collection(&self, collection_id: CollectionId) -> Option<&Collection> {
        self.collections
            .get(&collection_id)
            .map(|entry| &entry.collection)
    }

    /// The collection a film belongs to
    pub fn collection_of(&self, film_id: MovieId) -> Option<CollectionId> {
        self.get(film_id).and_then(|film| film.collection_id)
    }

    /// Films whose title, original title or overview contains `term`,
    /// ignoring case
    pub fn find_films(&self, term: &str) -> Vec<MovieId> {
        let needle = term.to_lowercase();
        self.films
            .iter()
            .filter(|(_, film)| film.mentions(&needle))
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.films.len()
    }

    pub fn is_empty(&self) -> bool {
        self.films.is_empty()
    }

    fn detach_from_collection(&mut self, collection_id: CollectionId, film_id: MovieId) {
        let Some(entry) = self.collections.get_mut(&collection_id) else {
            return;
        };
        entry.films.remove(&film_id);
        if entry.films.is_empty() {
            self.collections.remove(&collection_id);
        }
    }
}
