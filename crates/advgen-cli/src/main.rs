//! advgen CLI - adversarial goal-recognition dataset generator.
//!
//! Single binary that provides:
//! - `advgen generate` - run the perturbation pipeline over the configured grid
//! - `advgen vocab build` - scan a corpus and build the vocabulary pair
//! - `advgen init` - scaffold a project configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use advgen_core::{pipeline, ExternalGrounder, GeneratorConfig};

#[derive(Parser)]
#[command(name = "advgen")]
#[command(about = "Adversarial goal-recognition dataset generator", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the perturbation pipeline over the configured grid
    Generate {
        /// Process a single domain instead of the configured list
        #[arg(long)]
        domain: Option<String>,
    },

    /// Vocabulary management
    Vocab {
        #[command(subcommand)]
        command: VocabCommands,
    },

    /// Initialize a new project
    Init,
}

#[derive(Subcommand)]
enum VocabCommands {
    /// Build the action and goal vocabularies from the full-observability corpus
    Build {
        /// Build for a single domain instead of the configured list
        #[arg(long)]
        domain: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Find project root
    let project_root = cli.project.unwrap_or_else(|| {
        std::env::current_dir().expect("Failed to get current directory")
    });

    match cli.command {
        Commands::Generate { domain } => generate(&project_root, domain).await,
        Commands::Vocab {
            command: VocabCommands::Build { domain },
        } => build_vocab(&project_root, domain).await,
        Commands::Init => init_project(&project_root),
    }
}

fn load_config(project_root: &PathBuf, domain: Option<String>) -> Result<GeneratorConfig> {
    let mut config = GeneratorConfig::load_from_project(project_root)?;
    config.resolve_paths(project_root);
    if let Some(domain) = domain {
        config.domains = vec![domain];
    }
    Ok(config)
}

async fn generate(project_root: &PathBuf, domain: Option<String>) -> Result<()> {
    tracing::info!(project = %project_root.display(), "Starting generation run");

    let config = load_config(project_root, domain)?;
    if config.domains.is_empty() {
        anyhow::bail!("No domains configured; set `domains` in .advgen/config.yaml");
    }

    let grounder = ExternalGrounder::new(&config.grounder);
    let summary = pipeline::run(&config, &grounder).await;

    println!("Generation complete");
    println!("===================");
    println!();
    println!("Domains:       {} ok, {} failed", summary.domains_ok, summary.domains_failed);
    println!("Grid cells:    {}", summary.cells);
    println!("Items:         {} ok, {} failed", summary.items_ok, summary.items_failed);
    println!();
    println!("Records under: {}", config.output_dir.display());

    Ok(())
}

async fn build_vocab(project_root: &PathBuf, domain: Option<String>) -> Result<()> {
    let config = load_config(project_root, domain)?;
    if config.domains.is_empty() {
        anyhow::bail!("No domains configured; set `domains` in .advgen/config.yaml");
    }

    let grounder = ExternalGrounder::new(&config.grounder);
    let mut failed = 0usize;

    for domain in &config.domains {
        match pipeline::build_vocabularies(&config, &grounder, domain).await {
            Ok((actions, goals)) => {
                println!(
                    "{domain}: {} actions, {} goal predicates",
                    actions.len(),
                    goals.len()
                );
            }
            Err(error) => {
                tracing::error!(domain = %domain, %error, "Vocabulary build failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("Vocabulary build failed for {failed} domain(s)");
    }
    Ok(())
}

fn init_project(project_root: &PathBuf) -> Result<()> {
    let advgen_dir = project_root.join(".advgen");
    std::fs::create_dir_all(&advgen_dir)?;

    let config_path = advgen_dir.join("config.yaml");
    if !config_path.exists() {
        let default_config = r#"# advgen configuration

seed: 42

domains: []

# Percentage of the original plan retained in each obs file
observability_levels: [10, 30, 50, 70, 100]

# Per-position substitution probability, percent
attack_rates: [10, 20, 30]

# Goal-file delimiter convention: standard | uppercased
format: standard

data_dir: data
output_dir: data/validator_testset/noisy_masks
vocab_dir: data/dictionaries
scratch_dir: .advgen/tmp

grounder:
  command: fd-ground
  args: []
  timeout_secs: 60
"#;
        std::fs::write(&config_path, default_config)?;
    }

    println!("Initialized advgen project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .advgen/config.yaml - generator configuration");
    println!();
    println!("Next steps:");
    println!("  1. Place plan archives under data/<domain>/<level>/");
    println!("  2. Run: advgen vocab build");
    println!("  3. Run: advgen generate");

    Ok(())
}
