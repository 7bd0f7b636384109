use catalogue::Catalogue;
use std::path::Path;
use std::time::Instant;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data_dir = Path::new("data/catalogue");

    println!("Loading catalogue feed...\n");

    let start = Instant::now();
    let (catalogue, report) =
        Catalogue::load_from_files(data_dir).expect("Failed to load catalogue feed");
    let elapsed = start.elapsed();

    let (films, credited, ratings) = catalogue.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Films: {}", films);
    println!("Films with credits: {}", credited);
    println!("Ratings: {}", ratings);
    println!("Skipped records: {}", report.skipped());
    println!(
        "\nPerformance: {:.0} ratings/second",
        ratings as f64 / elapsed.as_secs_f64()
    );

    let most_rated = catalogue.ratings().most_rated_movies(5);
    println!("\nMost rated films:");
    for id in most_rated {
        let title = catalogue.movies().title(id).unwrap_or("<not catalogued>");
        println!("  {:>8} {} ({} ratings)", id, title, catalogue.ratings().num_ratings(id).unwrap_or(0));
    }
}
