use anyhow::{Context, Result, anyhow};
use catalogue::{Catalogue, Film, MovieId, Person, PersonId};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use std::cmp::Reverse;
use std::path::PathBuf;
use std::time::Instant;
use structures::top_k;
use tracing::debug;

/// ReelCatalogue - in-memory film catalogue
#[derive(Parser)]
#[command(name = "reel-catalogue")]
#[command(about = "Query films, credits and ratings from a catalogue feed", long_about = None)]
struct Cli {
    /// Directory holding movies.dat, credits.dat and ratings.dat
    #[arg(short, long, default_value = "data/catalogue")]
    data_dir: PathBuf,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a film with its cast, crew and ratings
    Film {
        /// Film ID to display
        #[arg(long)]
        id: MovieId,
    },

    /// List films released strictly between two dates
    Range {
        /// Start date (YYYY-MM-DD), exclusive
        #[arg(long)]
        from: NaiveDate,

        /// End date (YYYY-MM-DD), exclusive
        #[arg(long)]
        to: NaiveDate,
    },

    /// Search films by title or overview
    Search {
        /// Text to search for (case-insensitive substring match)
        #[arg(long)]
        term: String,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Films with the most user ratings
    MostRated {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Films with the highest average user rating
    TopRated {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Cast members with the most credits
    MostCredited {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show a cast or crew member's filmography
    Person {
        /// Person ID to display
        #[arg(long, conflicts_with = "name")]
        id: Option<PersonId>,

        /// Look people up by name instead
        #[arg(long)]
        name: Option<String>,
    },

    /// Show catalogue totals
    Stats,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let (catalogue, report) = Catalogue::load_from_files(&cli.data_dir).with_context(|| {
        format!("Failed to load catalogue feed from {}", cli.data_dir.display())
    })?;
    debug!(elapsed = ?start.elapsed(), ?report, "catalogue ready");
    if report.skipped() > 0 {
        eprintln!(
            "{} skipped {} feed records (see RUST_LOG=warn for details)",
            "warning:".yellow().bold(),
            report.skipped()
        );
    }

    match cli.command {
        Commands::Film { id } => handle_film(&catalogue, id, cli.json)?,
        Commands::Range { from, to } => handle_range(&catalogue, from, to, cli.json)?,
        Commands::Search { term, limit } => handle_search(&catalogue, &term, limit, cli.json)?,
        Commands::MostRated { limit } => {
            let ids = catalogue.ratings().most_rated_movies(limit);
            print_films(&catalogue, "Most rated films", &ids, cli.json)?;
        }
        Commands::TopRated { limit } => {
            let ids = catalogue.ratings().top_average_rated_movies(limit);
            print_films(&catalogue, "Top rated films", &ids, cli.json)?;
        }
        Commands::MostCredited { limit } => handle_most_credited(&catalogue, limit, cli.json)?,
        Commands::Person { id, name } => handle_person(&catalogue, id, name, cli.json)?,
        Commands::Stats => handle_stats(&catalogue, cli.json)?,
    }

    Ok(())
}

/// Handle the 'film' command
fn handle_film(catalogue: &Catalogue, id: MovieId, as_json: bool) -> Result<()> {
    let film = catalogue.require_film(id)?;
    let cast = catalogue.credits().film_cast(id);
    let crew = catalogue.credits().film_crew(id);
    let average = catalogue.movie_average_rating(id);
    let num_ratings = catalogue.num_ratings(id);

    if as_json {
        let value = json!({
            "film": film,
            "cast": cast,
            "crew": crew,
            "average_rating": average,
            "num_ratings": num_ratings,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", format!("{} ({})", film.title, year(film)).bold().blue());
    if film.original_title != film.title {
        println!("{}Original title: {}", "• ".green(), film.original_title);
    }
    if let Some(tagline) = &film.tagline {
        println!("{}{}", "• ".green(), tagline.italic());
    }
    let genres = film
        .genres
        .iter()
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!("{}Genres: {}", "• ".green(), genres);
    println!("{}Runtime: {} min", "• ".green(), film.runtime);
    if let Some(vote) = film.vote {
        println!("{}Vote: {:.1} ({} votes)", "• ".green(), vote.average, vote.count);
    }
    println!(
        "{}Average rating: {:.2} ({} ratings)",
        "• ".cyan(),
        average.unwrap_or(0.0),
        num_ratings.unwrap_or(0)
    );

    if let Some(collection) = film
        .collection_id
        .and_then(|cid| catalogue.movies().collection(cid))
    {
        println!("{}Part of: {}", "• ".cyan(), collection.name);
    }

    println!("Cast:");
    for credit in cast.iter().take(10) {
        println!("  - {} as {}", credit.name, credit.character);
    }
    println!("Crew:");
    for credit in crew.iter().filter(|c| c.department == "Directing") {
        println!("  - {} ({})", credit.name, credit.job);
    }
    Ok(())
}

/// Handle the 'range' command
fn handle_range(catalogue: &Catalogue, from: NaiveDate, to: NaiveDate, as_json: bool) -> Result<()> {
    if from >= to {
        return Err(anyhow!("--from ({from}) must be earlier than --to ({to})"));
    }
    let ids = catalogue.movies().released_in_range(from, to);
    print_films(
        catalogue,
        &format!("Released between {from} and {to}"),
        &ids,
        as_json,
    )
}

/// Handle the 'search' command
fn handle_search(catalogue: &Catalogue, term: &str, limit: usize, as_json: bool) -> Result<()> {
    let term_lower = term.to_lowercase();
    let relevance = |id: MovieId| {
        let title_match = catalogue
            .movies()
            .title(id)
            .is_some_and(|title| title.to_lowercase().contains(&term_lower));
        (!title_match, Reverse(catalogue.num_ratings(id).unwrap_or(0)))
    };

    // Title matches first, then by rating count
    let ids = top_k(
        catalogue.movies().find_films(term),
        |&a, &b| relevance(a).cmp(&relevance(b)),
        limit,
    );

    print_films(catalogue, &format!("Search results for '{term}'"), &ids, as_json)
}

/// Handle the 'most-credited' command
fn handle_most_credited(catalogue: &Catalogue, limit: usize, as_json: bool) -> Result<()> {
    let people = catalogue.credits().most_cast_credits(limit);

    if as_json {
        let rows: Vec<_> = people
            .iter()
            .map(|person| {
                json!({
                    "person": person,
                    "credits": catalogue.credits().num_cast_credits(person.id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", "Most credited cast".bold().blue());
    for (rank, person) in people.iter().enumerate() {
        println!(
            "{}. {} ({} credits)",
            (rank + 1).to_string().green(),
            person.name,
            catalogue.credits().num_cast_credits(person.id).unwrap_or(0)
        );
    }
    Ok(())
}

/// Handle the 'person' command
fn handle_person(
    catalogue: &Catalogue,
    id: Option<PersonId>,
    name: Option<String>,
    as_json: bool,
) -> Result<()> {
    let credits = catalogue.credits();
    let people: Vec<Person> = match (id, name) {
        (Some(id), _) => {
            let person = credits
                .cast(id)
                .or_else(|| credits.crew(id))
                .ok_or_else(|| anyhow!("Person {} not found", id))?;
            vec![person.clone()]
        }
        (None, Some(name)) => {
            let mut found = credits.find_cast(&name);
            for person in credits.find_crew(&name) {
                if !found.iter().any(|p| p.id == person.id) {
                    found.push(person);
                }
            }
            found
        }
        (None, None) => return Err(anyhow!("Pass either --id or --name")),
    };

    if as_json {
        let rows: Vec<_> = people
            .iter()
            .map(|person| {
                json!({
                    "person": person,
                    "cast_films": credits.cast_films(person.id),
                    "starring": credits.cast_stars_in_films(person.id),
                    "crew_films": credits.crew_films(person.id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if people.is_empty() {
        println!("No matching people");
    }
    for person in &people {
        println!("{}", format!("{} (id {})", person.name, person.id).bold().blue());
        let starring = credits.cast_stars_in_films(person.id);
        for film_id in credits.cast_films(person.id) {
            let marker = if starring.contains(&film_id) { "★".yellow() } else { " ".normal() };
            println!("  {} {}", marker, film_label(catalogue, film_id));
        }
        for film_id in credits.crew_films(person.id) {
            println!("  {} {}", "crew".cyan(), film_label(catalogue, film_id));
        }
    }
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(catalogue: &Catalogue, as_json: bool) -> Result<()> {
    let (films, credited, ratings) = catalogue.counts();
    let cast = catalogue.credits().unique_cast().len();
    let crew = catalogue.credits().unique_crew().len();
    let users = catalogue.ratings().num_users();

    if as_json {
        let value = json!({
            "films": films,
            "films_with_credits": credited,
            "cast_members": cast,
            "crew_members": crew,
            "ratings": ratings,
            "users": users,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Catalogue".bold().blue());
    println!("{}Films: {}", "• ".green(), films);
    println!("{}Films with credits: {}", "• ".green(), credited);
    println!("{}Cast members: {}", "• ".green(), cast);
    println!("{}Crew members: {}", "• ".green(), crew);
    println!("{}Ratings: {} from {} users", "• ".cyan(), ratings, users);
    Ok(())
}

/// Helper function to print a ranked list of films
fn print_films(catalogue: &Catalogue, header: &str, ids: &[MovieId], as_json: bool) -> Result<()> {
    if as_json {
        let rows: Vec<_> = ids
            .iter()
            .map(|&id| {
                json!({
                    "id": id,
                    "title": catalogue.movies().title(id),
                    "release": catalogue.movies().release(id),
                    "average_rating": catalogue.movie_average_rating(id),
                    "num_ratings": catalogue.num_ratings(id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", header.bold().blue());
    for (rank, &id) in ids.iter().enumerate() {
        println!(
            "{}. {} - avg {:.2} ({} ratings)",
            (rank + 1).to_string().green(),
            film_label(catalogue, id),
            catalogue.movie_average_rating(id).unwrap_or(0.0),
            catalogue.num_ratings(id).unwrap_or(0)
        );
    }
    Ok(())
}

fn film_label(catalogue: &Catalogue, id: MovieId) -> String {
    match catalogue.movies().get(id) {
        Some(film) => format!("{} ({})", film.title, year(film)),
        None => format!("#{id} (not catalogued)"),
    }
}

fn year(film: &Film) -> String {
    film.release
        .map(|date| date.format("%Y").to_string())
        .unwrap_or_else(|| "n.d.".to_string())
}
