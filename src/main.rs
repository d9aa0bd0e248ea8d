//! Builds JavaScript bundles from directive-annotated sources.
//! A group starts at one file and pulls in everything reachable through
//! `// #include` directives; each requested generation mode then gets its
//! own bundle, with conditional and mock blocks resolved for that mode and
//! the runtime engine injected by the builder stages.
use anyhow::Result;
use clap::{Parser, Subcommand};
use directive_bundler::utils;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "directive-bundler")]
#[command(about = "Bundle JavaScript groups driven by in-source directives")]
struct Cli {
    /// Path to bundler.toml (defaults to the nearest one above the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default bundler.toml
    Init,
    /// Check the configuration for problems
    Validate,
    /// Show staleness and hashes for each group
    Status {
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Print the content hash of each group
    Hash {
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Resolve includes and evaluate directives without writing bundles
    Parse {
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Write bundles for stale groups, or for every group with --force
    Generate {
        #[arg(short, long)]
        group: Option<String>,
        #[arg(short, long)]
        force: bool,
    },
    /// Write bundles only for groups whose sources changed
    Regenerate {
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Forget recorded build state
    Clean,
    /// Export the configuration in another format
    Export {
        path: PathBuf,
        #[arg(long, default_value = "json")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    match cli.command {
        Commands::Init => utils::initialize_project(cli.config),
        Commands::Validate => utils::validate(cli.config),
        Commands::Status { group } => utils::show_status(cli.config, group.as_deref()),
        Commands::Hash { group } => utils::print_hashes(cli.config, group.as_deref()),
        Commands::Parse { group } => utils::parse_groups(cli.config, group.as_deref()),
        Commands::Generate { group, force } => {
            utils::generate(cli.config, group.as_deref(), force)
        }
        Commands::Regenerate { group } => utils::regenerate(cli.config, group.as_deref()),
        Commands::Clean => utils::clean(cli.config),
        Commands::Export { path, format } => utils::export(cli.config, &path, &format),
    }
}
