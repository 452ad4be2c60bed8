// src/main.rs

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use satchel::config::Config;
use satchel::db::models::{CatalogFile, CatalogPackage};
use satchel::{db, install, recipe, remove};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about = "File-based package manager with a transactional catalog", long_about = None)]
struct Cli {
    /// Path to the catalog database
    #[arg(
        short,
        long,
        global = true,
        default_value = "/var/lib/satchel/satchel.db"
    )]
    db: PathBuf,

    /// Verbose error reporting and debug-level logs
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build recipes and install them as one batch
    Install {
        /// Recipe files to build and install together
        #[arg(required = true)]
        recipes: Vec<PathBuf>,
        /// Downgrade failed dependency checks to warnings
        #[arg(long)]
        no_deps: bool,
        /// Reserved: bypass file conflicts (not implemented)
        #[arg(long)]
        force: bool,
    },
    /// Remove installed packages
    Remove {
        /// Package names to remove
        #[arg(required = true)]
        packages: Vec<String>,
        /// Downgrade failed dependency checks to warnings
        #[arg(long)]
        no_deps: bool,
        /// Remove modified files too, after renaming them to a backup
        #[arg(long = "hard")]
        hard: bool,
    },
    /// Query installed packages
    Query {
        /// Name patterns (SQL LIKE wildcards); all packages if omitted
        patterns: Vec<String>,
        /// List the files owned by each match
        #[arg(long)]
        files: bool,
        /// Show manifest details for each match
        #[arg(long)]
        info: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let debug = cli.debug;
    if let Err(err) = run(cli) {
        if debug {
            eprintln!("error: {:?}", err);
        } else {
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Install {
            recipes,
            no_deps,
            force,
        } => {
            let config = Config {
                no_deps,
                force,
                debug: cli.debug,
                db: cli.db,
                ..Config::default()
            };

            if config.force {
                warn!("--force is reserved; file conflicts are still fatal");
            }

            let mut batch = Vec::new();
            for path in &recipes {
                info!("building recipe {}", path.display());
                batch.push(recipe::build(path)?);
            }

            let mut conn = db::open(&config.db)?;
            let root = std::env::current_dir()?;
            install::install(&mut conn, &config, &batch, &root)?;

            println!("Installed {} package(s)", batch.len());
            Ok(())
        }
        Commands::Remove {
            packages,
            no_deps,
            hard,
        } => {
            let config = Config {
                no_deps,
                hard_remove: hard,
                debug: cli.debug,
                db: cli.db,
                ..Config::default()
            };

            let mut conn = db::open(&config.db)?;
            let root = std::env::current_dir()?;
            remove::remove(&mut conn, &config, &packages, &root)?;

            println!("Removed {} package(s)", packages.len());
            Ok(())
        }
        Commands::Query {
            patterns,
            files,
            info,
        } => {
            let conn = db::open(&cli.db)?;

            let patterns = if patterns.is_empty() {
                vec!["%".to_string()]
            } else {
                patterns
            };

            let mut matches: Vec<CatalogPackage> = Vec::new();
            for pattern in &patterns {
                for package in CatalogPackage::list(&conn, pattern)? {
                    if !matches.iter().any(|p| p.name == package.name) {
                        matches.push(package);
                    }
                }
            }

            if matches.is_empty() {
                println!("No packages found.");
                return Ok(());
            }

            for package in &matches {
                println!("{} {}", package.name, package.version);
                if info {
                    println!("  Maintainer: {}", package.maintainer);
                    let deps = if package.deps.is_empty() {
                        "(none)".to_string()
                    } else {
                        package.deps.clone()
                    };
                    println!("  Dependencies: {}", deps);
                }
                if files {
                    for file in CatalogFile::find_by_owner(&conn, &package.name)? {
                        println!("  {} {}", file.kind.as_str(), file.path);
                    }
                }
            }
            println!("\nTotal: {} package(s)", matches.len());
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "satchel", &mut io::stdout());
            Ok(())
        }
    }
}
