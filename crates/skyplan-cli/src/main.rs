use clap::{Parser, Subcommand};

mod commands;
mod document;
mod registry;
mod report;

use registry::BuilderRegistry;

#[derive(Parser)]
#[command(
    name = "skyplan",
    about = "skyplan — validate elastic compute topology plans",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every section of a plan document and report all failures.
    ///
    /// The document is TOML unless the file extension is `.json`.
    Check {
        /// Path to the plan document
        path: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Build a single entity from a config file and print it as JSON.
    ///
    /// Run `skyplan kinds` for the list of entity kinds.
    Build {
        /// Entity kind, e.g. vmss or trafficManagerProfile
        kind: String,
        /// Path to the entity config (TOML or JSON)
        path: String,
    },
    /// List the entity kinds `build` accepts
    Kinds,
    /// Write a minimal two-region plan document
    Init {
        /// Application name, also used as the Traffic Manager DNS label
        #[arg(short, long, default_value = "app")]
        name: String,
        /// Output file
        #[arg(short, long, default_value = "skyplan.toml")]
        output: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skyplan=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = BuilderRegistry::standard();

    match cli.command {
        Commands::Check { path, format } => commands::check::check(&path, &format),
        Commands::Build { kind, path } => commands::build::build(&registry, &kind, &path),
        Commands::Kinds => commands::build::kinds(&registry),
        Commands::Init { name, output, force } => commands::init::init(&name, &output, force),
    }
}
