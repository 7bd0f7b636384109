//! User ratings, indexed both by user and by film.

use crate::types::{MovieId, RATING_RANGE, Rating, UserId};
use chrono::NaiveDateTime;
use structures::{HashTable, Ranked, top_k};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy)]
struct UserRating {
    rating: f32,
    timestamp: NaiveDateTime,
}

#[derive(Debug, Default)]
struct MovieRatings {
    ratings: HashTable<UserId, f32>,
    /// Running sum so averages need no scan
    total: f64,
}

impl MovieRatings {
    fn average(&self) -> f32 {
        (self.total / self.ratings.len() as f64) as f32
    }
}

/// Ratings store.
///
/// Every rating lives in two places: under its user and under its film. Both
/// sides are updated together, so they always describe the same set of
/// `(user, film)` pairs. Users and films with no ratings left are dropped.
#[derive(Debug, Default)]
pub struct Ratings {
    by_user: HashTable<UserId, HashTable<MovieId, UserRating>>,
    by_movie: HashTable<MovieId, MovieRatings>,
    len: usize,
}

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new rating.
    ///
    /// Returns `false` if the value is outside 0.0 to 5.0 or the user has
    /// already rated this film.
    pub fn add(
        &mut self,
        user_id: UserId,
        movie_id: MovieId,
        rating: f32,
        timestamp: NaiveDateTime,
    ) -> bool {
        if !RATING_RANGE.contains(&rating) {
            debug!(user_id, movie_id, rating, "rejected out-of-range rating");
            return false;
        }

        let user_ratings = self.by_user.get_or_insert_with(user_id, HashTable::new);
        if !user_ratings.add(movie_id, UserRating { rating, timestamp }) {
            return false;
        }

        let movie_ratings = self
            .by_movie
            .get_or_insert_with(movie_id, MovieRatings::default);
        movie_ratings.ratings.add(user_id, rating);
        movie_ratings.total += f64::from(rating);
        self.len += 1;
        true
    }

    /// Records a rating, replacing any earlier one by the same user for the
    /// same film. Out-of-range values are still rejected.
    pub fn set(
        &mut self,
        user_id: UserId,
        movie_id: MovieId,
        rating: f32,
        timestamp: NaiveDateTime,
    ) -> bool {
        if !RATING_RANGE.contains(&rating) {
            debug!(user_id, movie_id, rating, "rejected out-of-range rating");
            return false;
        }
        self.remove(user_id, movie_id);
        self.add(user_id, movie_id, rating, timestamp)
    }

    pub fn remove(&mut self, user_id: UserId, movie_id: MovieId) -> bool {
        let Some(user_ratings) = self.by_user.get_mut(&user_id) else {
            return false;
        };
        if user_ratings.remove(&movie_id).is_none() {
            return false;
        }
        if user_ratings.is_empty() {
            self.by_user.remove(&user_id);
        }

        if let Some(movie_ratings) = self.by_movie.get_mut(&movie_id) {
            if let Some(rating) = movie_ratings.ratings.remove(&user_id) {
                movie_ratings.total -= f64::from(rating);
            }
            if movie_ratings.ratings.is_empty() {
                self.by_movie.remove(&movie_id);
            }
        }
        self.len -= 1;
        true
    }

    /// Drops every rating of a film
    pub fn remove_movie(&mut self, movie_id: MovieId) -> usize {
        let Some(movie_ratings) = self.by_movie.remove(&movie_id) else {
            return 0;
        };

        for (user_id, _) in &movie_ratings.ratings {
            if let Some(user_ratings) = self.by_user.get_mut(user_id) {
                user_ratings.remove(&movie_id);
                if user_ratings.is_empty() {
                    self.by_user.remove(user_id);
                }
            }
        }
        let removed = movie_ratings.ratings.len();
        self.len -= removed;
        removed
    }

    /// A single rating, if the user has rated the film
    pub fn get(&self, user_id: UserId, movie_id: MovieId) -> Option<Rating> {
        let entry = self.by_user.get(&user_id)?.get(&movie_id)?;
        Some(Rating {
            user_id,
            movie_id,
            rating: entry.rating,
            timestamp: entry.timestamp,
        })
    }

    /// Every rating value given to a film, in no particular order
    pub fn movie_ratings(&self, movie_id: MovieId) -> Vec<f32> {
        self.by_movie
            .get(&movie_id)
            .map(|entry| entry.ratings.values())
            .unwrap_or_default()
    }

    /// Every rating value a user has given, in no particular order
    pub fn user_ratings(&self, user_id: UserId) -> Vec<f32> {
        self.by_user
            .get(&user_id)
            .map(|entry| entry.iter().map(|(_, r)| r.rating).collect())
            .unwrap_or_default()
    }

    /// Films a user has rated
    pub fn user_movies(&self, user_id: UserId) -> Vec<MovieId> {
        self.by_user
            .get(&user_id)
            .map(HashTable::keys)
            .unwrap_or_default()
    }

    pub fn movie_average(&self, movie_id: MovieId) -> Option<f32> {
        self.by_movie.get(&movie_id).map(MovieRatings::average)
    }

    pub fn user_average(&self, user_id: UserId) -> Option<f32> {
        let ratings = self.by_user.get(&user_id)?;
        let total: f64 = ratings.iter().map(|(_, r)| f64::from(r.rating)).sum();
        Some((total / ratings.len() as f64) as f32)
    }

    /// Number of ratings a film has received
    pub fn num_ratings(&self, movie_id: MovieId) -> Option<usize> {
        self.by_movie.get(&movie_id).map(|entry| entry.ratings.len())
    }

    /// The `n` films with the most ratings, most rated first
    #[instrument(skip(self))]
    pub fn most_rated_movies(&self, n: usize) -> Vec<MovieId> {
        let records: Vec<Ranked<MovieId, usize>> = self
            .by_movie
            .iter()
            .map(|(&id, entry)| Ranked::new(id, entry.ratings.len()))
            .collect();
        debug!(candidates = records.len(), "ranking films by rating count");
        ranked_ids(records, n)
    }

    /// The `n` users with the most ratings, most active first
    #[instrument(skip(self))]
    pub fn most_rated_users(&self, n: usize) -> Vec<UserId> {
        let records: Vec<Ranked<UserId, usize>> = self
            .by_user
            .iter()
            .map(|(&id, entry)| Ranked::new(id, entry.len()))
            .collect();
        debug!(candidates = records.len(), "ranking users by rating count");
        ranked_ids(records, n)
    }

    /// The `n` films with the highest average rating, best first
    #[instrument(skip(self))]
    pub fn top_average_rated_movies(&self, n: usize) -> Vec<MovieId> {
        let records: Vec<Ranked<MovieId, f32>> = self
            .by_movie
            .iter()
            .map(|(&id, entry)| Ranked::new(id, entry.average()))
            .collect();
        debug!(candidates = records.len(), "ranking films by average rating");
        ranked_ids(records, n)
    }

    /// Films with at least one rating
    pub fn rated_movies(&self) -> Vec<MovieId> {
        self.by_movie.keys()
    }

    pub fn num_users(&self) -> usize {
        self.by_user.len()
    }

    /// Total number of ratings held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn ranked_ids<R: Copy + PartialOrd>(records: Vec<Ranked<u32, R>>, n: usize) -> Vec<u32> {
    top_k(records, Ranked::highest_first, n)
        .iter()
        .map(Ranked::id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn at(secs: i64) -> NaiveDateTime {
        DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
    }

    fn sample() -> Ratings {
        let mut ratings = Ratings::new();
        ratings.add(1, 31, 2.5, at(1_260_759_144));
        ratings.add(1, 1029, 3.0, at(1_260_759_179));
        ratings.add(1, 1061, 3.0, at(1_260_759_182));
        ratings.add(2, 31, 4.0, at(835_355_493));
        ratings.add(3, 31, 3.5, at(1_298_861_675));
        ratings.add(3, 1029, 5.0, at(1_298_923_242));
        ratings
    }

    #[test]
    fn test_add_rejects_out_of_range() {
        let mut ratings = Ratings::new();

        assert!(!ratings.add(1, 1, 5.5, at(0)));
        assert!(!ratings.add(1, 1, -0.5, at(0)));
        assert!(!ratings.add(1, 1, f32::NAN, at(0)));
        assert!(ratings.add(1, 1, 0.0, at(0)));
        assert!(ratings.add(1, 2, 5.0, at(0)));
        assert_eq!(ratings.len(), 2);
    }

    #[test]
    fn test_add_rejects_second_rating_for_same_pair() {
        let mut ratings = sample();

        assert!(!ratings.add(1, 31, 5.0, at(0)));
        assert_eq!(ratings.get(1, 31).map(|r| r.rating), Some(2.5));
        assert_eq!(ratings.len(), 6);
    }

    #[test]
    fn test_set_replaces_existing_rating() {
        let mut ratings = sample();

        assert!(ratings.set(1, 31, 5.0, at(1_300_000_000)));
        assert!(!ratings.set(1, 31, 7.0, at(1_300_000_000)));

        let rating = ratings.get(1, 31).unwrap();
        assert_eq!(rating.rating, 5.0);
        assert_eq!(rating.timestamp, at(1_300_000_000));
        assert_eq!(ratings.len(), 6);
        assert_eq!(ratings.num_ratings(31), Some(3));
        // (5.0 + 4.0 + 3.5) / 3
        let average = ratings.movie_average(31).unwrap();
        assert!((average - 12.5 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_averages() {
        let ratings = sample();

        assert_eq!(ratings.movie_average(1029), Some(4.0));
        assert_eq!(ratings.user_average(3), Some(4.25));
        assert_eq!(ratings.movie_average(9999), None);
        assert_eq!(ratings.user_average(9999), None);
    }

    #[test]
    fn test_both_sides_agree() {
        let ratings = sample();

        let mut by_movie = ratings.movie_ratings(31);
        by_movie.sort_by(f32::total_cmp);
        assert_eq!(by_movie, vec![2.5, 3.5, 4.0]);

        let mut by_user = ratings.user_ratings(1);
        by_user.sort_by(f32::total_cmp);
        assert_eq!(by_user, vec![2.5, 3.0, 3.0]);

        let mut movies = ratings.user_movies(3);
        movies.sort_unstable();
        assert_eq!(movies, vec![31, 1029]);
        assert_eq!(ratings.num_users(), 3);
    }

    #[test]
    fn test_remove_drops_empty_entries() {
        let mut ratings = sample();

        assert!(ratings.remove(2, 31));
        assert!(!ratings.remove(2, 31));
        assert!(ratings.user_ratings(2).is_empty());
        assert_eq!(ratings.user_average(2), None);
        assert_eq!(ratings.num_ratings(31), Some(2));

        assert!(ratings.remove(1, 1061));
        assert_eq!(ratings.num_ratings(1061), None);
        assert_eq!(ratings.movie_average(1061), None);
        assert_eq!(ratings.len(), 4);
    }

    #[test]
    fn test_remove_movie() {
        let mut ratings = sample();

        assert_eq!(ratings.remove_movie(31), 3);
        assert_eq!(ratings.remove_movie(31), 0);
        assert_eq!(ratings.len(), 3);
        assert!(ratings.user_ratings(2).is_empty());
        assert_eq!(ratings.user_ratings(1).len(), 2);
    }

    #[test]
    fn test_most_rated() {
        let ratings = sample();

        assert_eq!(ratings.most_rated_movies(1), vec![31]);
        assert_eq!(ratings.most_rated_movies(2), vec![31, 1029]);
        assert_eq!(ratings.most_rated_users(1), vec![1]);
        assert_eq!(ratings.most_rated_movies(50).len(), 3);
        assert!(ratings.most_rated_users(0).is_empty());
    }

    #[test]
    fn test_top_average_rated() {
        let ratings = sample();

        // 1029: 4.0, 31: 3.33, 1061: 3.0
        assert_eq!(ratings.top_average_rated_movies(3), vec![1029, 31, 1061]);
        assert!(Ratings::new().top_average_rated_movies(5).is_empty());
    }
}
