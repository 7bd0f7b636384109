//! Parser for the catalogue feed files.
//!
//! All three files are UTF-8 text with one record per line and fields
//! separated by `::`. Blank lines are skipped.
//!
//! - movies.dat: `id::title::original_title::overview::tagline::status::genres::release::budget::revenue::languages::original_language::runtime::homepage::adult::video::poster`
//! - credits.dat: `film_id::cast::person_id::name::character::order::profile`
//!   or `film_id::crew::person_id::name::department::job::profile`
//! - ratings.dat: `user_id::movie_id::rating::unix_timestamp`

use crate::error::{CatalogueError, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

const MOVIE_FIELDS: usize = 17;
const CREDIT_FIELDS: usize = 7;
const RATING_FIELDS: usize = 4;

/// One line of credits.dat
#[derive(Debug, Clone, PartialEq)]
pub enum CreditLine {
    Cast(MovieId, CastCredit),
    Crew(MovieId, CrewCredit),
}

impl CreditLine {
    pub fn film_id(&self) -> MovieId {
        match self {
            CreditLine::Cast(film_id, _) | CreditLine::Crew(film_id, _) => *film_id,
        }
    }
}

/// Reads a whole feed file, reporting a missing file as
/// [`CatalogueError::FileNotFound`].
///
/// Feeds are expected to be UTF-8. Invalid byte sequences are replaced with
/// U+FFFD rather than failing the load, and a warning is logged.
fn read_feed(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CatalogueError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => CatalogueError::Io(e),
    })?;

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => {
            warn!(
                path = %path.display(),
                first_bad_byte = e.utf8_error().valid_up_to(),
                "feed is not valid UTF-8, replacing invalid bytes"
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// The `::`-separated fields of one line, with enough context to report
/// where a bad field came from
struct Fields<'a> {
    file: &'static str,
    line: usize,
    values: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn split(file: &'static str, line: usize, text: &'a str, expected: usize) -> Result<Self> {
        let values: Vec<&str> = text.split("::").collect();
        if values.len() != expected {
            return Err(CatalogueError::FieldCountMismatch {
                file: file.to_string(),
                line,
                expected,
                found: values.len(),
            });
        }
        Ok(Self { file, line, values })
    }

    fn text(&self, index: usize) -> &'a str {
        self.values[index]
    }

    fn optional_text(&self, index: usize) -> Option<String> {
        Some(self.values[index])
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn number<T>(&self, index: usize, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.values[index].trim().parse().map_err(|e| CatalogueError::ParseError {
            file: self.file.to_string(),
            line: self.line,
            reason: format!("Invalid {name}: {e}"),
        })
    }

    /// Like [`Fields::number`], but an empty field reads as the default
    fn number_or_default<T>(&self, index: usize, name: &str) -> Result<T>
    where
        T: FromStr + Default,
        T::Err: std::fmt::Display,
    {
        if self.values[index].trim().is_empty() {
            return Ok(T::default());
        }
        self.number(index, name)
    }

    fn flag(&self, index: usize, name: &str) -> Result<bool> {
        match self.values[index].trim() {
            "1" | "true" | "True" => Ok(true),
            "0" | "false" | "False" | "" => Ok(false),
            other => Err(CatalogueError::InvalidValue {
                field: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn date(&self, index: usize) -> Result<Option<NaiveDate>> {
        let value = self.values[index].trim();
        if value.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| CatalogueError::ParseError {
                file: self.file.to_string(),
                line: self.line,
                reason: format!("Invalid release date {value:?}: {e}"),
            })
    }

    fn genres(&self, index: usize) -> Result<Vec<Genre>> {
        self.values[index]
            .split('|')
            .filter(|tag| !tag.is_empty())
            .map(|tag| -> Result<Genre> {
                let (id, name) = tag.split_once(':').ok_or_else(|| CatalogueError::InvalidValue {
                    field: "genre".to_string(),
                    value: tag.to_string(),
                })?;
                let id = id.parse().map_err(|_| CatalogueError::InvalidValue {
                    field: "genre id".to_string(),
                    value: id.to_string(),
                })?;
                Ok(Genre {
                    id,
                    name: name.to_string(),
                })
            })
            .collect()
    }

    fn list(&self, index: usize) -> Vec<String> {
        self.values[index]
            .split('|')
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Non-blank lines with their 1-based line numbers
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Parse one line of movies.dat
pub fn parse_movie_line(line: &str, line_no: usize) -> Result<Film> {
    let fields = Fields::split("movies.dat", line_no, line, MOVIE_FIELDS)?;

    let mut film = Film::new(fields.number(0, "film id")?, fields.text(1));
    film.original_title = fields.text(2).to_string();
    film.overview = fields.text(3).to_string();
    film.tagline = fields.optional_text(4);
    film.status = fields.text(5).to_string();
    film.genres = fields.genres(6)?;
    film.release = fields.date(7)?;
    film.budget = fields.number_or_default(8, "budget")?;
    film.revenue = fields.number_or_default(9, "revenue")?;
    film.languages = fields.list(10);
    film.original_language = fields.text(11).to_string();
    film.runtime = fields.number_or_default(12, "runtime")?;
    film.homepage = fields.text(13).to_string();
    film.adult = fields.flag(14, "adult")?;
    film.video = fields.flag(15, "video")?;
    film.poster = fields.text(16).to_string();
    Ok(film)
}

/// Parse one line of credits.dat
pub fn parse_credit_line(line: &str, line_no: usize) -> Result<CreditLine> {
    let fields = Fields::split("credits.dat", line_no, line, CREDIT_FIELDS)?;
    let film_id = fields.number(0, "film id")?;
    let person_id = fields.number(2, "person id")?;
    let name = fields.text(3).to_string();
    let profile_path = fields.optional_text(6);

    match fields.text(1) {
        "cast" => Ok(CreditLine::Cast(
            film_id,
            CastCredit {
                person_id,
                name,
                character: fields.text(4).to_string(),
                order: fields.number(5, "billing order")?,
                profile_path,
            },
        )),
        "crew" => Ok(CreditLine::Crew(
            film_id,
            CrewCredit {
                person_id,
                name,
                department: fields.text(4).to_string(),
                job: fields.text(5).to_string(),
                profile_path,
            },
        )),
        other => Err(CatalogueError::InvalidValue {
            field: "credit kind".to_string(),
            value: other.to_string(),
        }),
    }
}

/// Parse one line of ratings.dat
///
/// The value itself is not range-checked here; the ratings store rejects
/// anything outside 0.0 to 5.0.
pub fn parse_rating_line(line: &str, line_no: usize) -> Result<Rating> {
    let fields = Fields::split("ratings.dat", line_no, line, RATING_FIELDS)?;
    let seconds: i64 = fields.number(3, "timestamp")?;

    Ok(Rating {
        user_id: fields.number(0, "user id")?,
        movie_id: fields.number(1, "film id")?,
        rating: fields.number(2, "rating")?,
        timestamp: timestamp(seconds)?,
    })
}

fn timestamp(seconds: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| CatalogueError::InvalidValue {
            field: "timestamp".to_string(),
            value: seconds.to_string(),
        })
}

pub fn parse_movies_str(content: &str) -> Result<Vec<Film>> {
    records(content)
        .map(|(line_no, line)| parse_movie_line(line, line_no))
        .collect()
}

pub fn parse_credits_str(content: &str) -> Result<Vec<CreditLine>> {
    records(content)
        .map(|(line_no, line)| parse_credit_line(line, line_no))
        .collect()
}

pub fn parse_ratings_str(content: &str) -> Result<Vec<Rating>> {
    records(content)
        .map(|(line_no, line)| parse_rating_line(line, line_no))
        .collect()
}

/// Parse the movies.dat file
pub fn parse_movies(path: &Path) -> Result<Vec<Film>> {
    parse_movies_str(&read_feed(path)?)
}

/// Parse the credits.dat file, one entry per line in file order
pub fn parse_credits(path: &Path) -> Result<Vec<CreditLine>> {
    parse_credits_str(&read_feed(path)?)
}

/// Parse the ratings.dat file
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    parse_ratings_str(&read_feed(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY_STORY: &str = "862::Toy Story::Toy Story::Led by Woody, Andy's toys live happily.::::Released::16:Animation|35:Comedy|10751:Family::1995-10-30::30000000::373554033::en::en::81.0::http://toystory.disney.com/toy-story::0::0::/rhIRbceoE9lR4veEXuwCC2wARtG.jpg";

    #[test]
    fn test_parse_movie_line() {
        let film = parse_movie_line(TOY_STORY, 1).unwrap();

        assert_eq!(film.id, 862);
        assert_eq!(film.title, "Toy Story");
        assert_eq!(film.tagline, None);
        assert_eq!(film.genres.len(), 3);
        assert_eq!(film.genres[1].name, "Comedy");
        assert_eq!(film.release, NaiveDate::from_ymd_opt(1995, 10, 30));
        assert_eq!(film.budget, 30_000_000);
        assert_eq!(film.languages, vec!["en"]);
        assert_eq!(film.runtime, 81.0);
        assert!(!film.adult);
        assert!(film.production_companies.is_empty());
    }

    #[test]
    fn test_movie_line_with_empty_optional_fields() {
        let line = "5::Four Rooms::Four Rooms::::Twelve outrageous guests.::Released::::::::::::en::::::0::1::";
        let film = parse_movie_line(line, 1).unwrap();

        assert_eq!(film.tagline.as_deref(), Some("Twelve outrageous guests."));
        assert!(film.genres.is_empty());
        assert_eq!(film.release, None);
        assert_eq!(film.budget, 0);
        assert_eq!(film.runtime, 0.0);
        assert!(film.video);
        assert!(film.poster.is_empty());
    }

    #[test]
    fn test_movie_field_count_mismatch() {
        let err = parse_movie_line("862::Toy Story::1995-10-30", 7).unwrap_err();
        assert!(matches!(
            err,
            CatalogueError::FieldCountMismatch {
                expected: 17,
                found: 3,
                line: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_movie_bad_date_reports_line() {
        let line = TOY_STORY.replace("1995-10-30", "30/10/1995");
        let err = parse_movies_str(&format!("\n{line}\n")).unwrap_err();

        match err {
            CatalogueError::ParseError { file, line, .. } => {
                assert_eq!(file, "movies.dat");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_credit_lines() {
        let cast = parse_credit_line("862::cast::31::Tom Hanks::Woody (voice)::0::/pQFoyx7rp09CJTAb932F2g8Nlho.jpg", 1).unwrap();
        let crew = parse_credit_line("862::crew::7879::John Lasseter::Directing::Director::", 2).unwrap();

        assert_eq!(cast.film_id(), 862);
        match cast {
            CreditLine::Cast(_, credit) => {
                assert_eq!(credit.character, "Woody (voice)");
                assert_eq!(credit.order, 0);
                assert!(credit.profile_path.is_some());
            }
            CreditLine::Crew(..) => panic!("expected a cast credit"),
        }
        match crew {
            CreditLine::Crew(_, credit) => {
                assert_eq!(credit.job, "Director");
                assert_eq!(credit.profile_path, None);
            }
            CreditLine::Cast(..) => panic!("expected a crew credit"),
        }
    }

    #[test]
    fn test_unknown_credit_kind() {
        let err = parse_credit_line("862::extra::1::Someone::x::y::", 1).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_ratings_str() {
        let ratings = parse_ratings_str("1::31::2.5::1260759144\n\n1::1029::3.0::1260759179\n").unwrap();

        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].rating, 2.5);
        assert_eq!(
            ratings[0].timestamp.date(),
            NaiveDate::from_ymd_opt(2009, 12, 14).unwrap()
        );
    }

    #[test]
    fn test_invalid_rating_value() {
        let err = parse_rating_line("1::31::great::1260759144", 3).unwrap_err();
        assert!(matches!(err, CatalogueError::ParseError { line: 3, .. }));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("movies.dat");
        let mut bytes = TOY_STORY.replacen("Toy Story", "Toy #Story", 1).into_bytes();
        let at = bytes.iter().position(|&b| b == b'#').unwrap();
        bytes[at] = 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let films = parse_movies(&path).unwrap();
        assert_eq!(films[0].title, "Toy \u{FFFD}Story");
        assert_eq!(films[0].original_title, "Toy Story");
    }

    #[test]
    fn test_missing_file() {
        let err = parse_movies(Path::new("no/such/dir/movies.dat")).unwrap_err();
        assert!(matches!(err, CatalogueError::FileNotFound { .. }));
    }
}
