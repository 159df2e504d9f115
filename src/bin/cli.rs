use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quiver::{Collection, CollectionConfig, InsertItem, Metadata};

/// Informational front end over a `quiver` collection file. Not part of
/// the library's contract — every command is a thin consumer of the
/// public `Collection` API.
#[derive(Parser)]
#[command(name = "quiver", about = "embedded exact nearest-neighbor vector index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert a single vector.
    Insert {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        dims: u32,
        /// Comma-separated vector components.
        #[arg(long)]
        vector: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Search for nearest neighbors.
    Search {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        dims: u32,
        #[arg(long)]
        vector: String,
        #[arg(long, default_value_t = 0.25)]
        eps: f32,
        #[arg(long, default_value_t = 0.0)]
        tau: f32,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Insert every row of a CSV file (`vector columns..., value`).
    InsertCsv {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        dims: u32,
        #[arg(long)]
        file: PathBuf,
    },
    /// Insert every record of a JSON array (`{"vector": [...], "value":
    /// "...", "metadata": {...}}`).
    InsertJson {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        dims: u32,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print dimensions and node count.
    Info {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 0)]
        dims: u32,
    },
}

fn parse_vector(s: &str) -> Result<Vec<f32>, String> {
    s.split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|e| e.to_string()))
        .collect()
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Insert { path, dims, vector, value, metadata } => {
            run_insert(path, dims, vector, value, metadata)
        }
        Command::Search { path, dims, vector, eps, tau, k } => {
            run_search(path, dims, vector, eps, tau, k)
        }
        Command::InsertCsv { path, dims, file } => run_insert_csv(path, dims, file),
        Command::InsertJson { path, dims, file } => run_insert_json(path, dims, file),
        Command::Info { path, dims } => run_info(path, dims),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_insert(
    path: PathBuf,
    dims: u32,
    vector: String,
    value: String,
    metadata: Option<String>,
) -> Result<(), String> {
    let key = parse_vector(&vector)?;
    let col = Collection::open(&path, dims, CollectionConfig::default()).map_err(|e| e.to_string())?;

    let meta: Metadata = match metadata {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| e.to_string())?,
        None => Metadata::new(),
    };

    col.insert_with_metadata(key, value.into_bytes(), meta)
        .map_err(|e| e.to_string())?;
    col.flush().map_err(|e| e.to_string())?;
    Ok(())
}

fn run_search(
    path: PathBuf,
    dims: u32,
    vector: String,
    eps: f32,
    tau: f32,
    k: usize,
) -> Result<(), String> {
    let key = parse_vector(&vector)?;
    let col = Collection::open(&path, dims, CollectionConfig::default()).map_err(|e| e.to_string())?;
    let results = col.search(&key, eps, tau, k).map_err(|e| e.to_string())?;

    for value in results {
        println!("{}", String::from_utf8_lossy(&value));
    }
    Ok(())
}

#[derive(serde::Deserialize)]
struct JsonRecord {
    vector: Vec<f32>,
    value: String,
    #[serde(default)]
    metadata: Metadata,
}

fn run_insert_csv(path: PathBuf, dims: u32, file: PathBuf) -> Result<(), String> {
    let contents = std::fs::read_to_string(&file).map_err(|e| e.to_string())?;
    let mut items = Vec::new();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields: Vec<&str> = line.split(',').collect();
        let value = fields.pop().ok_or_else(|| "empty CSV row".to_string())?.trim().to_string();
        let key: Vec<f32> = fields
            .into_iter()
            .map(|f| f.trim().parse::<f32>().map_err(|e| e.to_string()))
            .collect::<Result<_, _>>()?;
        items.push(InsertItem::new(key, value.into_bytes()));
    }

    let col = Collection::open(&path, dims, CollectionConfig::default()).map_err(|e| e.to_string())?;
    col.batch_insert(items).map_err(|e| e.to_string())?;
    col.flush().map_err(|e| e.to_string())?;
    Ok(())
}

fn run_insert_json(path: PathBuf, dims: u32, file: PathBuf) -> Result<(), String> {
    let contents = std::fs::read_to_string(&file).map_err(|e| e.to_string())?;
    let records: Vec<JsonRecord> = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
    let items = records
        .into_iter()
        .map(|r| InsertItem::with_metadata(r.vector, r.value.into_bytes(), r.metadata))
        .collect();

    let col = Collection::open(&path, dims, CollectionConfig::default()).map_err(|e| e.to_string())?;
    col.batch_insert(items).map_err(|e| e.to_string())?;
    col.flush().map_err(|e| e.to_string())?;
    Ok(())
}

fn run_info(path: PathBuf, dims: u32) -> Result<(), String> {
    let col = Collection::open(&path, dims, CollectionConfig::default()).map_err(|e| e.to_string())?;
    println!("dimensions: {}", col.dimensions());
    println!("nodes: {}", col.node_count());
    Ok(())
}
