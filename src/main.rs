use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use safenav_mutation::config::{read_skip_lines, MutationConfig};
use safenav_mutation::error::MutationError;
use safenav_mutation::mutation::{mutate_source, run_mutation};
use safenav_mutation::mutator::MutationLevel;
use safenav_mutation::report::generate_report;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safenav-mutation")]
#[command(about = "Mutation testing for null-safe access chains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create mutants for an expression or for files of chain expressions
    Mutate {
        /// Single expression to mutate, e.g. "order?.Lines[0]?.Price"
        #[arg(short, long)]
        expr: Option<String>,

        /// Files or directories (searched for *.chain) to mutate
        #[arg(short, long, num_args = 1..)]
        file: Vec<PathBuf>,

        /// Highest mutator level to apply (basic, standard, advanced, complete)
        #[arg(short, long)]
        level: Option<MutationLevel>,

        /// Create only one mutant per expression
        #[arg(long)]
        one_mutant: bool,

        /// Path for the JSON file with lines to skip when creating mutants
        #[arg(long)]
        skip_lines: Option<PathBuf>,

        /// JSON configuration file; flags given here override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory to create mutant folders in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON report (default: mutants.json)
        #[arg(long, value_name = "PATH")]
        json: Option<Option<PathBuf>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mutate {
            expr,
            file,
            level,
            one_mutant,
            skip_lines,
            config,
            output,
            json,
        } => {
            let mut config = match config {
                Some(path) => MutationConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => MutationConfig::default(),
            };
            if let Some(level) = level {
                config.level = level;
            }
            if one_mutant {
                config.one_mutant = true;
            }
            if let Some(path) = skip_lines {
                config.skip_lines = read_skip_lines(&path)
                    .with_context(|| format!("Failed to read skip lines {}", path.display()))?;
            }
            if output.is_some() {
                config.output_dir = output;
            }

            match (expr, file.is_empty()) {
                (Some(_), false) => {
                    return Err(MutationError::InvalidInput(
                        "You should only provide an expression or files".to_string(),
                    )
                    .into());
                }
                (None, true) => {
                    return Err(MutationError::InvalidInput(
                        "Provide an expression (--expr) or files (--file)".to_string(),
                    )
                    .into());
                }
                (Some(source), true) => {
                    let mutants = mutate_source(&source, &config)?;
                    for (i, mutant) in mutants.iter().enumerate() {
                        println!(
                            "[{}] {} at {}: {}",
                            i + 1,
                            mutant.mutation.display_name,
                            mutant.mutation.anchor.path,
                            mutant.mutated
                        );
                    }
                    println!("Generated {} mutants...", mutants.len());
                }
                (None, false) => {
                    let results = run_mutation(&file, &config).await?;
                    if let Some(json) = json {
                        let path = json.unwrap_or_else(|| PathBuf::from("mutants.json"));
                        generate_report(&results, &path)?;
                    }
                }
            }
        }
    }

    Ok(())
}
