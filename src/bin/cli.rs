//! Chainlog CLI
//!
//! Command-line interface for chain files:
//! - Inspect the committed blocks of a chain
//! - Append a block and commit it
//! - Show the chain name derived from a path
//! - Generate a default config file

use chainlog::config::{generate_default_config, Config};
use chainlog::storage::*;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chainlog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and append to chainlog chain files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the blocks committed to a chain file
    Inspect {
        /// Path to the chain file
        path: PathBuf,
        /// Only show the last N blocks
        #[arg(short, long)]
        last: Option<usize>,
        /// Only show blocks of this type
        #[arg(short = 't', long = "type")]
        block_type: Option<String>,
    },

    /// Append one block to a chain file and commit it
    Append {
        /// Path to the chain file (created if missing)
        path: PathBuf,
        /// Block type tag
        block_type: String,
        /// Datapoint fields, joined with `|`
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Print the chain name derived from a path
    Name {
        /// Path to the chain file
        path: PathBuf,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    chainlog::logging::init(&Config::load_default().logging);

    match cli.command {
        Commands::Inspect {
            path,
            last,
            block_type,
        } => {
            if !chain_path_exists(&path) {
                eprintln!("Chain file not found: {}", path.display());
                std::process::exit(1);
            }

            let mut reader = ChainReadOnly::new(&path);
            let blocks: Vec<&Block> = reader
                .refresh()
                .block_stream()
                .iter()
                .filter(|b| block_type.as_deref().map_or(true, |t| b.block_type() == t))
                .collect();

            let skip = last.map_or(0, |n| blocks.len().saturating_sub(n));
            let shown = &blocks[skip..];

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(shown)?),
                _ => print_table(&chain_name_from_path(&path), shown),
            }
        }

        Commands::Append {
            path,
            block_type,
            values,
        } => {
            let chain = Arc::new(Chain::open(&path).await?);
            let name = chain.name().to_string();

            // One-shot set: register, append, flush once without a scheduler
            let set = ChainSet::new(FlushType::Time, std::time::Duration::ZERO);
            set.register(name.clone(), chain).await;

            let block = Block::composite(block_type, &values);
            set.append(&name, block.clone()).await?;
            let committed = set.flush().await?;

            match cli.format.as_str() {
                "json" => println!("{}", block.encode()?),
                _ => println!(
                    "Appended {} block to {} ({})",
                    committed,
                    name,
                    path.display()
                ),
            }
        }

        Commands::Name { path } => {
            println!("{}", chain_name_from_path(&path));
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn print_table(name: &str, blocks: &[&Block]) {
    println!("Chain: {} ({} blocks)", name, blocks.len());
    if blocks.is_empty() {
        return;
    }

    println!();
    println!(
        "{:<21} {:<26} {:<12} {}",
        "NORMALIZED TIME", "TIMESTAMP", "TYPE", "DATAPOINT"
    );
    println!("{}", "-".repeat(80));
    for block in blocks {
        println!(
            "{:<21} {:<26} {:<12} {}",
            block.normalized_time(),
            block.timestamp(),
            block.block_type(),
            block.datapoint()
        );
    }
}
