//! Cast and crew credits, indexed by film and by person.

use crate::types::{CastCredit, CrewCredit, FilmCredits, MovieId, Person, PersonId};
use structures::{HashTable, IndexList, Ranked, merge_sort, top_k};
use tracing::{debug, instrument};

/// Highest billing position that still counts as a starring role
pub const DEFAULT_STAR_BILLING_CUTOFF: u32 = 3;

#[derive(Debug)]
struct PersonCredits {
    person: Person,
    films: IndexList<MovieId>,
    /// One per role, so two roles in one film count twice
    credits: u32,
}

impl PersonCredits {
    fn new(person: Person) -> Self {
        Self {
            person,
            films: IndexList::new(),
            credits: 0,
        }
    }
}

/// Credits store.
///
/// Each film's cast is kept sorted by billing order and its crew by person
/// id. People are deduplicated: the first credit seen for a person id
/// supplies their name and profile picture.
#[derive(Debug)]
pub struct Credits {
    films: HashTable<MovieId, FilmCredits>,
    cast: HashTable<PersonId, PersonCredits>,
    crew: HashTable<PersonId, PersonCredits>,
    star_billing_cutoff: u32,
}

impl Default for Credits {
    fn default() -> Self {
        Self::new()
    }
}

impl Credits {
    pub fn new() -> Self {
        Self {
            films: HashTable::new(),
            cast: HashTable::new(),
            crew: HashTable::new(),
            star_billing_cutoff: DEFAULT_STAR_BILLING_CUTOFF,
        }
    }

    /// Sets the highest billing order counted by [`Credits::cast_stars_in_films`]
    pub fn with_star_billing_cutoff(mut self, cutoff: u32) -> Self {
        self.star_billing_cutoff = cutoff;
        self
    }

    /// Stores the credits of one film.
    ///
    /// Returns `false` without touching anything if the film already has
    /// credits.
    pub fn add(&mut self, film_id: MovieId, cast: Vec<CastCredit>, crew: Vec<CrewCredit>) -> bool {
        if self.films.contains_key(&film_id) {
            debug!(film_id, "rejected duplicate credits");
            return false;
        }

        let cast = merge_sort(cast, |a, b| a.order.cmp(&b.order));
        let crew = merge_sort(crew, |a, b| a.person_id.cmp(&b.person_id));

        for credit in &cast {
            record_credit(&mut self.cast, credit.person_id, film_id, || credit.person());
        }
        for credit in &crew {
            record_credit(&mut self.crew, credit.person_id, film_id, || credit.person());
        }

        self.films.add(film_id, FilmCredits { cast, crew })
    }

    /// Drops a film's credits. People left without any credit are forgotten.
    pub fn remove(&mut self, film_id: MovieId) -> bool {
        let Some(credits) = self.films.remove(&film_id) else {
            return false;
        };

        for credit in &credits.cast {
            release_credit(&mut self.cast, credit.person_id, film_id);
        }
        for credit in &credits.crew {
            release_credit(&mut self.crew, credit.person_id, film_id);
        }
        true
    }

    /// Cast of a film, top billing first; empty for an unknown film
    pub fn film_cast(&self, film_id: MovieId) -> &[CastCredit] {
        self.films
            .get(&film_id)
            .map(|credits| credits.cast.as_slice())
            .unwrap_or_default()
    }

    /// Crew of a film, ordered by person id
    pub fn film_crew(&self, film_id: MovieId) -> &[CrewCredit] {
        self.films
            .get(&film_id)
            .map(|credits| credits.crew.as_slice())
            .unwrap_or_default()
    }

    pub fn cast_size(&self, film_id: MovieId) -> Option<usize> {
        self.films.get(&film_id).map(|credits| credits.cast.len())
    }

    pub fn crew_size(&self, film_id: MovieId) -> Option<usize> {
        self.films.get(&film_id).map(|credits| credits.crew.len())
    }

    pub fn contains(&self, film_id: MovieId) -> bool {
        self.films.contains_key(&film_id)
    }

    /// Ids of every film with stored credits
    pub fn film_ids(&self) -> Vec<MovieId> {
        self.films.keys()
    }

    /// Number of films with stored credits
    pub fn len(&self) -> usize {
        self.films.len()
    }

    pub fn is_empty(&self) -> bool {
        self.films.is_empty()
    }

    /// Every distinct cast member
    pub fn unique_cast(&self) -> Vec<Person> {
        people(&self.cast)
    }

    /// Every distinct crew member
    pub fn unique_crew(&self) -> Vec<Person> {
        people(&self.crew)
    }

    /// Cast members whose name contains `term`, ignoring case
    pub fn find_cast(&self, term: &str) -> Vec<Person> {
        find_people(&self.cast, term)
    }

    /// Crew members whose name contains `term`, ignoring case
    pub fn find_crew(&self, term: &str) -> Vec<Person> {
        find_people(&self.crew, term)
    }

    pub fn cast(&self, person_id: PersonId) -> Option<&Person> {
        self.cast.get(&person_id).map(|entry| &entry.person)
    }

    pub fn crew(&self, person_id: PersonId) -> Option<&Person> {
        self.crew.get(&person_id).map(|entry| &entry.person)
    }

    /// Films a person acted in, in the order their credits were added
    pub fn cast_films(&self, person_id: PersonId) -> Vec<MovieId> {
        self.cast
            .get(&person_id)
            .map(|entry| entry.films.to_vec())
            .unwrap_or_default()
    }

    /// Films a person worked on as crew
    pub fn crew_films(&self, person_id: PersonId) -> Vec<MovieId> {
        self.crew
            .get(&person_id)
            .map(|entry| entry.films.to_vec())
            .unwrap_or_default()
    }

    /// Films where the person has a role billed at or above the star cutoff
    pub fn cast_stars_in_films(&self, person_id: PersonId) -> Vec<MovieId> {
        let Some(entry) = self.cast.get(&person_id) else {
            return Vec::new();
        };

        entry
            .films
            .iter()
            .copied()
            .filter(|film_id| {
                self.film_cast(*film_id)
                    .iter()
                    .any(|c| c.person_id == person_id && c.order <= self.star_billing_cutoff)
            })
            .collect()
    }

    /// The `n` cast members with the most credits, most credited first
    #[instrument(skip(self))]
    pub fn most_cast_credits(&self, n: usize) -> Vec<Person> {
        let records: Vec<Ranked<PersonId, u32>> = self
            .cast
            .iter()
            .map(|(&id, entry)| Ranked::new(id, entry.credits))
            .collect();
        debug!(candidates = records.len(), "ranking cast by credits");

        top_k(records, Ranked::highest_first, n)
            .into_iter()
            .filter_map(|ranked| self.cast(ranked.id()).cloned())
            .collect()
    }

    /// Number of acting credits a person holds, counting every role
    pub fn num_cast_credits(&self, person_id: PersonId) -> Option<u32> {
        self.cast.get(&person_id).map(|entry| entry.credits)
    }
}

fn record_credit(
    people: &mut HashTable<PersonId, PersonCredits>,
    person_id: PersonId,
    film_id: MovieId,
    person: impl FnOnce() -> Person,
) {
    let entry = people.get_or_insert_with(person_id, || PersonCredits::new(person()));
    entry.films.insert(film_id);
    entry.credits += 1;
}

fn release_credit(
    people: &mut HashTable<PersonId, PersonCredits>,
    person_id: PersonId,
    film_id: MovieId,
) {
    let Some(entry) = people.get_mut(&person_id) else {
        return;
    };
    entry.films.remove(&film_id);
    entry.credits = entry.credits.saturating_sub(1);
    if entry.credits == 0 {
        people.remove(&person_id);
    }
}

fn people(table: &HashTable<PersonId, PersonCredits>) -> Vec<Person> {
    table.iter().map(|(_, entry)| entry.person.clone()).collect()
}

fn find_people(table: &HashTable<PersonId, PersonCredits>, term: &str) -> Vec<Person> {
    let needle = term.to_lowercase();
    table
        .iter()
        .filter(|(_, entry)| entry.person.name.to_lowercase().contains(&needle))
        .map(|(_, entry)| entry.person.clone())
        .collect()
}
