use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use framelens::config::Config;
use framelens::corpus::{load_jsonl, PeriodScheme};
use framelens::narrative::{
    analyze_word, build_reference_anchors, AnalysisContext, NarrativeParams, Pooling,
    ReferenceAnchors, WindowStrategy,
};
use framelens::oracle::OnnxEncoder;
use framelens::output::{self, csv, terminal};
use framelens::topics::alignment::{align_topics, evolution_rows};
use framelens::topics::model::FittedTopics;

/// FrameLens: narrative framing analysis for Chinese-language corpora.
///
/// Scores whether target words are framed in personal or structural terms,
/// and tracks how topics evolve between two periods.
#[derive(Parser)]
#[command(name = "framelens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score narrative bias of target words in a JSONL corpus
    Bias {
        /// Corpus file, one JSON object per line
        #[arg(long)]
        corpus: PathBuf,

        /// Target word (repeatable; defaults to FRAMELENS_TARGET_WORDS)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Characters of context on each side of an occurrence
        #[arg(long)]
        radius: Option<usize>,

        /// Occurrences per encoder call
        #[arg(long)]
        batch_size: Option<usize>,

        /// Use the enclosing sentence as context instead of a fixed radius
        #[arg(long)]
        sentence: bool,

        /// Pool over the whole context instead of the target word's tokens
        #[arg(long)]
        context_pooling: bool,

        /// Output CSV path (default: <output_dir>/narrative_bias_<date>.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Align the topics of two periods
    Evolve {
        /// Topic model export for the earlier period
        #[arg(long)]
        period1: PathBuf,

        /// Topic model export for the later period
        #[arg(long)]
        period2: PathBuf,

        /// Minimum similarity for an aligned pair
        #[arg(long)]
        threshold: Option<f64>,

        /// Keywords listed per topic
        #[arg(long)]
        top_k: Option<usize>,

        /// Output CSV path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Build the reference anchors and show how they were formed
    Anchors,

    /// List the top keywords of each topic in a model export
    Topics {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("framelens=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Bias {
            corpus,
            targets,
            radius,
            batch_size,
            sentence,
            context_pooling,
            output,
        } => {
            if !targets.is_empty() {
                config.target_words = targets;
            }
            if let Some(r) = radius {
                config.window_radius = r;
            }
            if let Some(b) = batch_size {
                config.batch_size = b;
            }
            config.validate()?;

            let params = NarrativeParams {
                window: if sentence {
                    WindowStrategy::Sentence
                } else {
                    WindowStrategy::CharRadius(config.window_radius)
                },
                pooling: if context_pooling {
                    Pooling::Context
                } else {
                    Pooling::TargetSpan
                },
                batch_size: config.batch_size,
                show_progress: true,
            };

            run_bias(&config, &corpus, &params, output.as_deref()).await?;
        }

        Commands::Evolve {
            period1,
            period2,
            threshold,
            top_k,
            output,
        } => {
            if let Some(t) = threshold {
                config.threshold = t;
            }
            if let Some(k) = top_k {
                config.top_k = k;
            }
            config.validate()?;

            let p1 = FittedTopics::load(&period1)?;
            let p2 = FittedTopics::load(&period2)?;

            let alignment = align_topics(&p1, &p2, config.threshold)?;
            let rows = evolution_rows(&alignment, &p1, &p2, config.top_k);
            terminal::display_evolution(&rows, config.threshold);

            let path = config.report_path(
                output.as_deref(),
                &output::evolution_report_name(config.threshold, config.top_k),
            );
            csv::write_report(&path, &csv::evolution_csv(&rows))?;
            println!("\nEvolution table written to: {}", path.display());
        }

        Commands::Anchors => {
            let (_encoder, anchors) = load_encoder_and_anchors(&config).await?;
            terminal::display_anchor_summary(&anchors);
        }

        Commands::Topics { model, top_k } => {
            let name = model
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Topic model".to_string());
            let topics = FittedTopics::load(&model)?;
            topics.display_keywords(&name, top_k.unwrap_or(config.top_k));
        }
    }

    Ok(())
}

/// Score every configured target word and write one CSV for the run.
///
/// A failure on one word is logged and the run moves on to the next.
async fn run_bias(
    config: &Config,
    corpus: &Path,
    params: &NarrativeParams,
    output: Option<&Path>,
) -> Result<()> {
    let documents = load_jsonl(corpus, &PeriodScheme::default())?;
    if documents.is_empty() {
        anyhow::bail!("Corpus {} contains no usable documents", corpus.display());
    }

    let (encoder, anchors) = load_encoder_and_anchors(config).await?;
    let ctx = AnalysisContext {
        oracle: &encoder,
        anchors: &anchors,
        params,
    };

    let mut all_records = Vec::new();
    let mut failed = Vec::new();

    for word in &config.target_words {
        match analyze_word(&ctx, &documents, word).await {
            Ok(report) => {
                terminal::display_word_summary(&report.stats, &report.records);
                all_records.extend(report.records);
            }
            Err(e) => {
                warn!(word = %word, error = %e, "Analysis failed for target word, continuing");
                failed.push(word.as_str());
            }
        }
    }

    if !failed.is_empty() {
        println!(
            "\n{} Failed target words: {}",
            "!".red().bold(),
            failed.join(", ")
        );
    }

    let path = config.report_path(
        output,
        &output::bias_report_name(chrono::Local::now().date_naive()),
    );
    csv::write_report(&path, &csv::bias_csv(&all_records))?;
    info!(records = all_records.len(), "Narrative bias run complete");
    println!("\nBias records written to: {}", path.display());
    Ok(())
}

/// Load the encoder and build the reference anchors once per run.
async fn load_encoder_and_anchors(config: &Config) -> Result<(OnnxEncoder, ReferenceAnchors)> {
    config.require_model()?;
    let seeds = config.anchor_seeds()?;

    let encoder = OnnxEncoder::load(&config.model_dir, config.max_seq_len, config.batch_size)?;
    info!(model_dir = %config.model_dir.display(), "Loaded encoder model");

    let anchors = build_reference_anchors(&encoder, &seeds, config.batch_size).await?;
    Ok((encoder, anchors))
}
