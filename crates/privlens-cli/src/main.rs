use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use privlens_ai::taxonomy::{CategorySource, RatingSource};
use privlens_ai::{OnnxClassifier, TaxonomyMap};
use privlens_core::defaults::{ANNOTATE_FEATURE, CONFIDENCE_THRESHOLD, FREE_RUN_LIMIT, TOP_K};
use privlens_service::{ServiceContext, UsageMeter};
use privlens_store::{DuckUsageStore, UsageStore};

mod display;

#[derive(Parser)]
#[command(
    name = "privlens",
    about = "Privacy policy sentence annotation and usage metering.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate a policy text from a file or stdin
    Annotate {
        /// Input file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Category source CSV (label shapes)
        #[arg(long, env = "PRIVLENS_CATEGORY_CSV")]
        category_csv: PathBuf,

        /// Rating source CSV; ratings default to neutral when omitted
        #[arg(long, env = "PRIVLENS_RATINGS_CSV")]
        ratings_csv: Option<PathBuf>,

        /// Directory with model.onnx, tokenizer.json and config.json
        #[arg(long, env = "PRIVLENS_MODEL_DIR")]
        model_dir: PathBuf,

        /// Confidence gate; predictions under it report as Unknown
        #[arg(long, default_value_t = CONFIDENCE_THRESHOLD)]
        threshold: f32,

        /// Ranked candidates kept per sentence
        #[arg(long, default_value_t = TOP_K)]
        top_k: usize,

        /// Emit the full JSON report instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Load the label taxonomy and print its shape
    Taxonomy {
        /// Category source CSV (label shapes)
        #[arg(long, env = "PRIVLENS_CATEGORY_CSV")]
        category_csv: PathBuf,

        /// Rating source CSV; ratings default to neutral when omitted
        #[arg(long, env = "PRIVLENS_RATINGS_CSV")]
        ratings_csv: Option<PathBuf>,

        /// Resolve one label and print its merged entry
        #[arg(long)]
        lookup: Option<String>,
    },

    /// Drive the usage quota store
    Usage {
        /// DuckDB database path
        #[arg(long, env = "PRIVLENS_DB", default_value = "privlens.duckdb")]
        db: PathBuf,

        #[command(subcommand)]
        action: UsageAction,
    },
}

#[derive(Args)]
struct Target {
    /// User id; resolved from --email when omitted
    #[arg(long)]
    user: Option<String>,

    /// Email to resolve into a stable user id
    #[arg(long)]
    email: Option<String>,

    /// Metered feature name
    #[arg(long, default_value = ANNOTATE_FEATURE)]
    feature: String,
}

#[derive(Subcommand)]
enum UsageAction {
    /// Create the counter row if missing
    Ensure {
        #[command(flatten)]
        target: Target,
    },

    /// Consume one free run if the quota allows
    Consume {
        #[command(flatten)]
        target: Target,

        /// Free runs granted per user and feature
        #[arg(long, default_value_t = FREE_RUN_LIMIT)]
        limit: u32,

        /// Comma-separated user ids exempt from metering
        #[arg(long, value_delimiter = ',')]
        bypass: Vec<String>,
    },

    /// Record a paid run
    Pro {
        #[command(flatten)]
        target: Target,
    },

    /// Print the current counters
    Show {
        #[command(flatten)]
        target: Target,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("privlens v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();

    match cli.command {
        Commands::Annotate {
            file,
            category_csv,
            ratings_csv,
            model_dir,
            threshold,
            top_k,
            json,
        } => cmd_annotate(
            file.as_deref(),
            &category_csv,
            ratings_csv.as_deref(),
            &model_dir,
            threshold,
            top_k,
            json,
        ),
        Commands::Taxonomy {
            category_csv,
            ratings_csv,
            lookup,
        } => cmd_taxonomy(&category_csv, ratings_csv.as_deref(), lookup.as_deref()),
        Commands::Usage { db, action } => cmd_usage(&db, action),
    }
}

fn cmd_annotate(
    file: Option<&Path>,
    category_csv: &Path,
    ratings_csv: Option<&Path>,
    model_dir: &Path,
    threshold: f32,
    top_k: usize,
    json: bool,
) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let taxonomy =
        TaxonomyMap::load(category_csv, ratings_csv).context("loading label taxonomy")?;
    let classifier = OnnxClassifier::load(model_dir).context("loading classifier model")?;
    let mut ctx = ServiceContext::new(taxonomy, classifier);

    let report = ctx.annotate(&text, threshold, top_k)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_report(&report);
    }
    Ok(())
}

fn cmd_taxonomy(
    category_csv: &Path,
    ratings_csv: Option<&Path>,
    lookup: Option<&str>,
) -> anyhow::Result<()> {
    let categories = CategorySource::load(category_csv).context("loading category source")?;
    let ratings = match ratings_csv {
        Some(path) => RatingSource::load(path).context("loading rating source")?,
        None => RatingSource::default(),
    };

    println!("category source: {} labels", categories.entries.len());
    println!("rating source:   {} labels", ratings.entries.len());

    let map = TaxonomyMap::merge(categories, ratings);
    println!("merged:          {} labels", map.len());

    if let Some(label) = lookup {
        println!();
        display::print_entry(label, map.resolve_label(label));
    }
    Ok(())
}

fn cmd_usage(db: &Path, action: UsageAction) -> anyhow::Result<()> {
    let store = DuckUsageStore::open_persistent(db).context("opening usage store")?;

    match action {
        UsageAction::Ensure { target } => {
            let user = resolve_user(&store, &target)?;
            store.ensure_record(&user, &target.feature)?;
            let record = store.get(&user, &target.feature)?.unwrap_or_default();
            display::print_counters(&user, &target.feature, &record);
        }
        UsageAction::Consume {
            target,
            limit,
            bypass,
        } => {
            let user = resolve_user(&store, &target)?;
            let meter = UsageMeter::new(store, limit).with_bypass(bypass);
            let decision = meter.check(&user, &target.feature)?;
            display::print_decision(&user, &target.feature, &decision);
        }
        UsageAction::Pro { target } => {
            let user = resolve_user(&store, &target)?;
            let record = store.record_pro_run(&user, &target.feature)?;
            display::print_counters(&user, &target.feature, &record);
        }
        UsageAction::Show { target } => {
            let user = resolve_user(&store, &target)?;
            match store.get(&user, &target.feature)? {
                Some(record) => display::print_counters(&user, &target.feature, &record),
                None => println!("no usage recorded for {} / {}", user, target.feature),
            }
        }
    }
    Ok(())
}

fn resolve_user(store: &DuckUsageStore, target: &Target) -> anyhow::Result<String> {
    if let Some(user) = &target.user {
        return Ok(user.clone());
    }
    if let Some(email) = &target.email {
        return Ok(store.ensure_profile(email)?);
    }
    anyhow::bail!("provide --user or --email")
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
