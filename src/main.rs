use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crev_helper::config::DEFAULT_CONFIG_PATH;
use crev_helper::deps::{filter_by_name, PROOFS_TEMPLATE_URL, REVIEW_GUIDE_URL};
use crev_helper::session::ReviewForm;
use crev_helper::{
    parse_draft, sort_newest_first, CargoCrev, Config, CrateListItem, Level, Rating, ReviewDraft,
    SetupStatus,
};

#[derive(Parser)]
#[command(name = "crev-helper")]
#[command(about = "Write and publish cargo-crev reviews without an interactive editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, env = "CREV_HELPER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Cargo executable to use instead of the configured one
    #[arg(long, env = "CREV_HELPER_CARGO")]
    cargo: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for cargo, cargo-crev and a crev identity
    Status,

    /// Install cargo-crev with cargo
    Install,

    /// Manage the crev identity
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },

    /// List the dependencies of a project
    Deps {
        /// Path to Cargo.toml (defaults to the current project)
        #[arg(long)]
        manifest_path: Option<PathBuf>,

        /// Only show crates whose name matches this glob
        #[arg(long)]
        filter: Option<String>,
    },

    /// Review a crate and publish the proof
    Review {
        /// Crate name
        name: String,

        /// Crate version
        version: String,

        #[arg(long)]
        thoroughness: Option<Level>,

        #[arg(long)]
        understanding: Option<Level>,

        #[arg(long)]
        rating: Option<Rating>,

        /// Comma-separated names of alternative crates
        #[arg(long, default_value = "")]
        alternatives: String,

        /// Review comment
        #[arg(long, conflicts_with_all = ["comment_file", "draft"])]
        comment: Option<String>,

        /// Read the review comment from a file
        #[arg(long, conflicts_with = "draft")]
        comment_file: Option<PathBuf>,

        /// Submit a complete draft YAML file instead of the options above
        #[arg(long)]
        draft: Option<PathBuf>,

        /// Record the review without publishing the proof repository
        #[arg(long)]
        no_publish: bool,
    },

    /// List reviews written by the current identity
    Reviews,

    /// Publish the proof repository
    Publish,
}

#[derive(Subcommand)]
enum IdCommands {
    /// Print the current identity
    Current,

    /// Create an identity backed by a fork of the proofs template
    New {
        /// URL of your crev-proofs fork
        #[arg(long)]
        url: String,

        /// Create the identity without publishing the proof repository
        #[arg(long)]
        no_publish: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crev_helper=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(cargo) = cli.cargo {
        config.crev.cargo = cargo;
    }
    let crev = CargoCrev::new(config.crev.clone());

    match cli.command {
        Commands::Status => show_status(&crev).await,
        Commands::Install => install(&crev).await,
        Commands::Id { command } => match command {
            IdCommands::Current => show_identity(&crev).await,
            IdCommands::New { url, no_publish } => new_identity(&crev, &url, !no_publish).await,
        },
        Commands::Deps {
            manifest_path,
            filter,
        } => list_deps(&crev, manifest_path, filter).await,
        Commands::Review {
            name,
            version,
            thoroughness,
            understanding,
            rating,
            alternatives,
            comment,
            comment_file,
            draft,
            no_publish,
        } => {
            let draft = match draft {
                Some(path) => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read draft: {}", path.display()))?;
                    parse_draft(&text)
                        .with_context(|| format!("Failed to parse draft: {}", path.display()))?
                }
                None => {
                    let mut form = ReviewForm::new(CrateListItem::new(&name, &version));
                    form.thoroughness = thoroughness.unwrap_or(config.review.thoroughness);
                    form.understanding = understanding.unwrap_or(config.review.understanding);
                    form.rating = rating.unwrap_or(config.review.rating);
                    form.alternatives = alternatives;
                    form.comment = match (comment, comment_file) {
                        (Some(text), _) => text,
                        (None, Some(path)) => fs::read_to_string(&path).with_context(|| {
                            format!("Failed to read comment: {}", path.display())
                        })?,
                        (None, None) => String::new(),
                    };
                    form.to_draft()
                }
            };
            let publish = config.review.publish && !no_publish;
            submit_review(&crev, &name, &version, &draft, publish).await
        }
        Commands::Reviews => list_reviews(&crev).await,
        Commands::Publish => {
            crev.publish_repo().await?;
            println!("Published the proof repository.");
            Ok(())
        }
    }
}

async fn show_status(crev: &CargoCrev) -> Result<()> {
    match SetupStatus::probe(crev).await {
        SetupStatus::NoToolchain => {
            println!("No Rust toolchain found!");
            println!("Please install Rust: https://rust-lang.org/tools/install");
        }
        SetupStatus::CrevMissing => {
            println!("No cargo-crev found!");
            println!("Run `crev-helper install` to install it using Cargo.");
        }
        SetupStatus::IdentityMissing => {
            println!("No Crev ID!");
            println!("Fork the template on GitHub: {}", PROOFS_TEMPLATE_URL);
            println!("...then run `crev-helper id new --url <your fork>`.");
        }
        SetupStatus::Ready { id } => {
            println!("Ready. Current Crev ID: {}", id);
        }
    }
    Ok(())
}

async fn install(crev: &CargoCrev) -> Result<()> {
    crev.install_tool(|line| eprintln!("{}", line.trim()))
        .await
        .context("Failed to install cargo-crev")?;
    println!("cargo-crev installed.");
    Ok(())
}

async fn show_identity(crev: &CargoCrev) -> Result<()> {
    match crev.current_identity().await {
        Some(id) => println!("{}", id),
        None => println!("No Crev ID."),
    }
    Ok(())
}

async fn new_identity(crev: &CargoCrev, url: &str, publish: bool) -> Result<()> {
    crev.create_identity(url)
        .await
        .context("Failed to create a Crev ID")?;
    if publish {
        crev.publish_repo()
            .await
            .context("Created the Crev ID but failed to publish the proof repository")?;
    }
    if let Some(id) = crev.current_identity().await {
        println!("Created Crev ID {}", id);
    }
    Ok(())
}

async fn list_deps(
    crev: &CargoCrev,
    manifest_path: Option<PathBuf>,
    filter: Option<String>,
) -> Result<()> {
    let mut items = crev
        .list_dependencies(manifest_path.as_deref())
        .await
        .context("Failed to list dependencies")?;
    if let Some(pattern) = filter {
        items = filter_by_name(items, &pattern);
    }

    if items.is_empty() {
        println!("No dependencies.");
        return Ok(());
    }

    for item in items {
        println!("{} {}", item.name, item.version);
        println!("    crates.io: {}", item.crates_io_url());
        println!("    deps.rs:   {}", item.deps_rs_url());
        println!("    reviews:   {}", item.crev_reviews_url());
    }

    Ok(())
}

async fn submit_review(
    crev: &CargoCrev,
    name: &str,
    version: &str,
    draft: &ReviewDraft,
    publish: bool,
) -> Result<()> {
    info!(name, version, guide = REVIEW_GUIDE_URL, "Reviewing crate");

    crev.submit_review(name, version, draft)
        .await
        .with_context(|| format!("Failed to record the review of {} {}", name, version))?;

    if publish {
        crev.publish_repo()
            .await
            .context("Failed to publish the review")?;
        println!("Pushed the review of {} {}!", name, version);
    } else {
        println!("Recorded the review of {} {}.", name, version);
    }

    Ok(())
}

async fn list_reviews(crev: &CargoCrev) -> Result<()> {
    let mut records = crev
        .query_own_reviews()
        .await
        .context("Failed to query reviews")?;

    if records.is_empty() {
        println!("No reviews.");
        return Ok(());
    }

    sort_newest_first(&mut records);

    for record in records {
        let review = &record.review;
        println!(
            "{} {}  [{}]  thoroughness: {}, understanding: {}",
            record.package.name,
            record.package.version,
            review.rating,
            review.thoroughness,
            review.understanding
        );
        println!("    date: {}", record.date);
        if let Some(comment) = record.comment.as_deref().filter(|c| !c.trim().is_empty()) {
            for line in comment.lines() {
                println!("    | {}", line);
            }
        }
        println!();
    }

    Ok(())
}
