use std::path::PathBuf;
use std::process;

use bucketdb_core::api::{Repository, asc, desc, where_};
use bucketdb_core::types::Field;
use clap::Parser;
use serde_json::{Value, json};
use tracing::info;

/// BucketDB Console: stores a few developers and prints a filtered listing.
#[derive(Parser, Debug)]
#[command(name = "bucketdb-console", version)]
struct Cli {
    /// Repository file to open. In-memory when absent.
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Use the default repository file (~/.local/share/bucketdb/default.db).
    #[arg(long, conflicts_with = "db")]
    local: bool,

    /// Print one compact JSON record per line instead of a pretty array.
    #[arg(short, long)]
    compact: bool,
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bucketdb")
        .join("default.db")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let path = match (&cli.db, cli.local) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_db_path()),
        (None, false) => None,
    };
    let repo = match &path {
        Some(path) => Repository::open(path)?,
        None => Repository::open_in_memory()?,
    };
    info!(db = %repo.name(), "using repository");

    let developers = repo.create_bucket(
        "developers",
        vec![
            Field::integer("id").key(),
            Field::string("name").indexed(),
            Field::string("tag"),
        ],
        true,
    )?;

    developers.save_all(&[
        json!({"id": 1, "name": "Joaquim", "tag": "scala"}),
        json!({"id": 2, "name": "Joaquim", "tag": "java"}),
        json!({"id": 3, "name": "Joaquim", "tag": "go"}),
        json!({"id": 4, "name": "Ana", "tag": "java"}),
    ])?;

    let query = where_("name").equal_to("Joaquim") & where_("tag").in_set(["java", "scala"]);
    let sort = desc("tag") & asc("name");
    info!(filter = %query, sort = %sort, "querying developers");

    let found = developers.filter(&query, Some(&sort))?;
    if cli.compact {
        for record in found {
            println!("{}", Value::Object(record));
        }
    } else {
        let records: Vec<Value> = found.into_iter().map(Value::Object).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    info!(total = developers.count()?, "done");
    repo.close()?;
    Ok(())
}
