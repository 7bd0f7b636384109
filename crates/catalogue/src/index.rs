//! The catalogue façade: loading a feed into the three stores and the
//! queries that need more than one of them.

use crate::error::{CatalogueError, Result};
use crate::parser::{self, CreditLine};
use crate::stores::{Credits, Movies, Ratings};
use crate::types::*;
use std::path::Path;
use structures::HashTable;
use tracing::{debug, info, instrument, warn};

/// Films, credits and ratings loaded from one feed
#[derive(Debug, Default)]
pub struct Catalogue {
    movies: Movies,
    credits: Credits,
    ratings: Ratings,
}

/// What happened to the records of one feed during ingestion
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub films: usize,
    pub duplicate_films: usize,
    pub credited_films: usize,
    /// Credit blocks for a film that already had one
    pub duplicate_credits: usize,
    /// Credit lines repeating a role already listed for the same film
    pub duplicate_credit_lines: usize,
    pub ratings: usize,
    pub rejected_ratings: usize,
}

impl LoadReport {
    /// Records of any kind that were not stored
    pub fn skipped(&self) -> usize {
        self.duplicate_films
            + self.duplicate_credits
            + self.duplicate_credit_lines
            + self.rejected_ratings
    }
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalogue whose credits store uses a custom star billing cutoff
    pub fn with_credits(credits: Credits) -> Self {
        Self {
            credits,
            ..Self::default()
        }
    }

    /// Load a whole feed directory.
    ///
    /// Expects `movies.dat`, `credits.dat` and `ratings.dat` in `data_dir`.
    /// The three files are parsed in parallel, then fed into the stores and
    /// validated. The report says which records were skipped on the way.
    #[instrument]
    pub fn load_from_files(data_dir: &Path) -> Result<(Self, LoadReport)> {
        let mut catalogue = Self::new();
        let report = catalogue.load_into(data_dir)?;
        Ok((catalogue, report))
    }

    /// Load a feed directory into this catalogue's existing stores
    pub fn load_into(&mut self, data_dir: &Path) -> Result<LoadReport> {
        info!(?data_dir, "loading catalogue feed");

        let movies_path = data_dir.join("movies.dat");
        let credits_path = data_dir.join("credits.dat");
        let ratings_path = data_dir.join("ratings.dat");

        let ((films, credits), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_movies(&movies_path),
                    || parser::parse_credits(&credits_path),
                )
            },
            || parser::parse_ratings(&ratings_path),
        );
        let films = films?;
        let credits = credits?;
        let ratings = ratings?;

        info!(
            films = films.len(),
            credit_lines = credits.len(),
            ratings = ratings.len(),
            "parsed feed files"
        );

        let report = self.ingest(films, credits, ratings);
        self.validate()?;

        info!(?report, "catalogue built and validated");
        Ok(report)
    }

    /// Feed parsed records into the stores.
    ///
    /// Duplicates and out-of-range ratings are skipped and counted rather
    /// than treated as errors. Credit lines must come grouped by film: a
    /// film whose lines reappear after another film's is a duplicate block.
    pub fn ingest(
        &mut self,
        films: Vec<Film>,
        credits: Vec<CreditLine>,
        ratings: Vec<Rating>,
    ) -> LoadReport {
        let mut report = LoadReport::default();

        for film in films {
            if self.movies.add(film) {
                report.films += 1;
            } else {
                report.duplicate_films += 1;
            }
        }

        let grouped = group_credits(credits);
        report.duplicate_credits = grouped.duplicate_blocks;
        report.duplicate_credit_lines = grouped.duplicate_lines;
        for (film_id, film_credits) in grouped.blocks {
            if self.credits.add(film_id, film_credits.cast, film_credits.crew) {
                report.credited_films += 1;
            } else {
                report.duplicate_credits += 1;
            }
        }

        for rating in ratings {
            if self.ratings.add(rating.user_id, rating.movie_id, rating.rating, rating.timestamp) {
                report.ratings += 1;
            } else {
                report.rejected_ratings += 1;
            }
        }

        if report.skipped() > 0 {
            warn!(
                duplicate_films = report.duplicate_films,
                duplicate_credits = report.duplicate_credits,
                duplicate_credit_lines = report.duplicate_credit_lines,
                rejected_ratings = report.rejected_ratings,
                "skipped feed records"
            );
        }
        report
    }

    /// Check the stores against each other.
    ///
    /// Out-of-range ratings and disagreeing rating counts are errors. Credits
    /// or ratings for films missing from the catalogue are only logged, since
    /// feeds routinely carry them.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<()> {
        let mut counted = 0;
        for movie_id in self.ratings.rated_movies() {
            for value in self.ratings.movie_ratings(movie_id) {
                if !RATING_RANGE.contains(&value) {
                    return Err(CatalogueError::InvalidValue {
                        field: "rating".to_string(),
                        value: value.to_string(),
                    });
                }
                counted += 1;
            }
        }
        if counted != self.ratings.len() {
            return Err(CatalogueError::ValidationError(format!(
                "{counted} ratings indexed by film but {} recorded",
                self.ratings.len()
            )));
        }

        let orphan_credits = self
            .credits
            .film_ids()
            .into_iter()
            .filter(|&id| !self.movies.contains(id))
            .count();
        let orphan_ratings = self
            .ratings
            .rated_movies()
            .into_iter()
            .filter(|&id| !self.movies.contains(id))
            .count();

        if orphan_credits > 0 {
            warn!(orphan_credits, "credits reference films missing from the catalogue");
        }
        if orphan_ratings > 0 {
            warn!(orphan_ratings, "ratings reference films missing from the catalogue");
        }
        Ok(())
    }

    pub fn movies(&self) -> &Movies {
        &self.movies
    }

    pub fn movies_mut(&mut self) -> &mut Movies {
        &mut self.movies
    }

    pub fn credits(&self) -> &Credits {
        &self.credits
    }

    pub fn credits_mut(&mut self) -> &mut Credits {
        &mut self.credits
    }

    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    pub fn ratings_mut(&mut self) -> &mut Ratings {
        &mut self.ratings
    }

    /// A film that must exist, as an error the caller can propagate
    pub fn require_film(&self, id: MovieId) -> Result<&Film> {
        self.movies.get(id).ok_or_else(|| CatalogueError::MissingReference {
            entity: "Film".to_string(),
            id,
        })
    }

    /// Average user rating of a film.
    ///
    /// `Some(0.0)` for a catalogued film nobody has rated, `None` for a film
    /// the catalogue does not know.
    pub fn movie_average_rating(&self, id: MovieId) -> Option<f32> {
        if !self.movies.contains(id) {
            return None;
        }
        Some(self.ratings.movie_average(id).unwrap_or(0.0))
    }

    /// Number of user ratings of a film, with the same convention as
    /// [`Catalogue::movie_average_rating`]
    pub fn num_ratings(&self, id: MovieId) -> Option<usize> {
        if !self.movies.contains(id) {
            return None;
        }
        Some(self.ratings.num_ratings(id).unwrap_or(0))
    }

    /// Remove a film from every store
    pub fn remove_film(&mut self, id: MovieId) -> bool {
        let removed = self.movies.remove(id);
        self.credits.remove(id);
        self.ratings.remove_movie(id);
        removed
    }

    /// (films, films with credits, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.movies.len(), self.credits.len(), self.ratings.len())
    }
}

#[derive(Default)]
struct GroupedCredits {
    blocks: Vec<(MovieId, FilmCredits)>,
    duplicate_blocks: usize,
    duplicate_lines: usize,
}

/// Group consecutive credit lines per film.
///
/// Films keep their first-seen order and credits their file order. A film
/// that comes back after another film's lines is a duplicate block and is
/// dropped whole; a role listed twice within a block keeps its first line.
fn group_credits(lines: Vec<CreditLine>) -> GroupedCredits {
    let mut grouped = GroupedCredits::default();
    let mut seen: HashTable<MovieId, ()> = HashTable::new();
    let mut current = None;
    let mut skipping = false;

    for line in lines {
        let film_id = line.film_id();
        if current != Some(film_id) {
            current = Some(film_id);
            skipping = !seen.add(film_id, ());
            if skipping {
                grouped.duplicate_blocks += 1;
            } else {
                grouped.blocks.push((film_id, FilmCredits::default()));
            }
        }
        if skipping {
            continue;
        }

        let Some((_, credits)) = grouped.blocks.last_mut() else {
            continue;
        };
        let fresh = match line {
            CreditLine::Cast(_, credit) => push_unique(&mut credits.cast, credit, |a, b| {
                a.person_id == b.person_id && a.character == b.character
            }),
            CreditLine::Crew(_, credit) => push_unique(&mut credits.crew, credit, |a, b| {
                a.person_id == b.person_id && a.job == b.job
            }),
        };
        if !fresh {
            grouped.duplicate_lines += 1;
        }
    }

    if grouped.duplicate_blocks + grouped.duplicate_lines > 0 {
        debug!(
            duplicate_blocks = grouped.duplicate_blocks,
            duplicate_lines = grouped.duplicate_lines,
            "dropped repeated credits"
        );
    }
    grouped
}

fn push_unique<T>(credits: &mut Vec<T>, credit: T, same_role: impl Fn(&T, &T) -> bool) -> bool {
    if credits.iter().any(|existing| same_role(existing, &credit)) {
        return false;
    }
    credits.push(credit);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    fn at(secs: i64) -> chrono::NaiveDateTime {
        DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
    }

    fn rating(user_id: UserId, movie_id: MovieId, value: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            timestamp: at(1_000_000_000),
        }
    }

    fn cast_line(film_id: MovieId, person_id: PersonId, order: u32) -> CreditLine {
        CreditLine::Cast(
            film_id,
            CastCredit {
                person_id,
                name: format!("Actor {person_id}"),
                character: String::new(),
                order,
                profile_path: None,
            },
        )
    }

    fn crew_line(film_id: MovieId, person_id: PersonId) -> CreditLine {
        CreditLine::Crew(
            film_id,
            CrewCredit {
                person_id,
                name: format!("Crew {person_id}"),
                department: "Writing".to_string(),
                job: "Writer".to_string(),
                profile_path: None,
            },
        )
    }

    fn sample() -> (Catalogue, LoadReport) {
        let mut catalogue = Catalogue::new();
        let films = vec![
            Film::new(1, "One").with_release(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()),
            Film::new(2, "Two"),
            Film::new(2, "Two again"),
        ];
        let credits = vec![
            cast_line(1, 10, 1),
            cast_line(1, 11, 0),
            crew_line(2, 30),
            cast_line(2, 10, 0),
        ];
        let ratings = vec![
            rating(100, 1, 4.0),
            rating(101, 1, 3.0),
            rating(100, 1, 1.0),
            rating(100, 9, 5.0),
            rating(102, 2, 9.0),
        ];
        let report = catalogue.ingest(films, credits, ratings);
        (catalogue, report)
    }

    #[test]
    fn test_ingest_report() {
        let (_, report) = sample();

        assert_eq!(
            report,
            LoadReport {
                films: 2,
                duplicate_films: 1,
                credited_films: 2,
                duplicate_credits: 0,
                duplicate_credit_lines: 0,
                ratings: 3,
                rejected_ratings: 2,
            }
        );
    }

    #[test]
    fn test_grouped_credits_keep_file_order_before_sorting() {
        let (catalogue, _) = sample();

        let cast: Vec<PersonId> = catalogue.credits().film_cast(1).iter().map(|c| c.person_id).collect();
        assert_eq!(cast, vec![11, 10]);
        assert_eq!(catalogue.credits().crew_size(2), Some(1));
        assert_eq!(catalogue.credits().cast_films(10), vec![1, 2]);
    }

    #[test]
    fn test_repeated_credits_are_skipped_and_counted() {
        let mut catalogue = Catalogue::new();
        let report = catalogue.ingest(
            vec![Film::new(1, "One"), Film::new(2, "Two")],
            vec![
                cast_line(1, 10, 0),
                cast_line(1, 10, 0),
                crew_line(1, 30),
                crew_line(1, 30),
                cast_line(2, 10, 0),
                cast_line(1, 99, 1),
                crew_line(1, 98),
            ],
            Vec::new(),
        );

        assert_eq!(report.duplicate_credit_lines, 2);
        assert_eq!(report.duplicate_credits, 1);
        assert_eq!(report.credited_films, 2);
        assert_eq!(report.skipped(), 3);

        let credits = catalogue.credits();
        assert_eq!(credits.cast_size(1), Some(1));
        assert_eq!(credits.crew_size(1), Some(1));
        assert_eq!(credits.num_cast_credits(10), Some(2));
        assert!(credits.cast(99).is_none());
        assert!(credits.crew(98).is_none());
    }

    #[test]
    fn test_same_person_in_two_roles_is_kept() {
        let mut catalogue = Catalogue::new();
        let mut second_role = cast_line(1, 10, 3);
        if let CreditLine::Cast(_, credit) = &mut second_role {
            credit.character = "Twin".to_string();
        }
        let report = catalogue.ingest(
            vec![Film::new(1, "One")],
            vec![cast_line(1, 10, 0), second_role],
            Vec::new(),
        );

        assert_eq!(report.duplicate_credit_lines, 0);
        assert_eq!(catalogue.credits().num_cast_credits(10), Some(2));
    }

    #[test]
    fn test_average_rating_convention() {
        let (catalogue, _) = sample();

        assert_eq!(catalogue.movie_average_rating(1), Some(3.5));
        assert_eq!(catalogue.movie_average_rating(2), Some(0.0));
        assert_eq!(catalogue.movie_average_rating(9), None);
        assert_eq!(catalogue.num_ratings(1), Some(2));
        assert_eq!(catalogue.num_ratings(2), Some(0));
        assert_eq!(catalogue.num_ratings(9), None);
    }

    #[test]
    fn test_validate_tolerates_orphans() {
        let (catalogue, _) = sample();
        // Film 9 is rated but not catalogued
        assert!(catalogue.validate().is_ok());
    }

    #[test]
    fn test_require_film() {
        let (catalogue, _) = sample();

        assert_eq!(catalogue.require_film(1).unwrap().title, "One");
        assert!(matches!(
            catalogue.require_film(42),
            Err(CatalogueError::MissingReference { id: 42, .. })
        ));
    }

    #[test]
    fn test_remove_film_cascades() {
        let (mut catalogue, _) = sample();

        assert!(catalogue.remove_film(1));
        assert!(!catalogue.remove_film(1));
        assert_eq!(catalogue.counts(), (1, 1, 1));
        assert!(catalogue.credits().cast(11).is_none());
        assert_eq!(catalogue.ratings().user_ratings(101), Vec::<f32>::new());
    }

    #[test]
    fn test_custom_star_cutoff() {
        let mut catalogue = Catalogue::with_credits(Credits::new().with_star_billing_cutoff(0));
        catalogue.ingest(
            vec![Film::new(1, "One")],
            vec![cast_line(1, 10, 1), cast_line(1, 11, 0)],
            Vec::new(),
        );

        assert!(catalogue.credits().cast_stars_in_films(10).is_empty());
        assert_eq!(catalogue.credits().cast_stars_in_films(11), vec![1]);
    }

    #[test]
    fn test_load_missing_directory() {
        let err = Catalogue::load_from_files(Path::new("does/not/exist")).unwrap_err();
        assert!(matches!(err, CatalogueError::FileNotFound { .. }));
    }
}
