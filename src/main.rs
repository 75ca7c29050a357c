use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_qa_rust::cache::{ContextCache, ConversationId};
use video_qa_rust::config::Config;
use video_qa_rust::llm::{create_llm, LLM};
use video_qa_rust::processing::{AnswerStatus, BatchProcessor};
use video_qa_rust::suggest::QuestionSuggester;
use video_qa_rust::text::{clean, extract_timestamps};
use video_qa_rust::youtube::TranscriptSource;

const DEFAULT_LOG_FILTER: &str = "video_qa_rust=info,warn";

#[derive(Parser)]
#[command(name = "video-qa")]
#[command(version, author = "TigreRoll")]
#[command(about = "Ask questions about YouTube videos using their transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to video-qa.toml lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the transcript of a video
    Transcript {
        /// YouTube URL
        url: String,
        /// Print the transcript exactly as fetched
        #[arg(long)]
        raw: bool,
        /// List timestamps found in the transcript with their text
        #[arg(long)]
        timestamps: bool,
    },
    /// Answer questions about a video
    Ask {
        /// YouTube URL
        url: String,
        /// Question to ask (repeatable)
        #[arg(short = 'q', long = "question")]
        questions: Vec<String>,
        /// File with one question per line
        #[arg(long)]
        questions_file: Option<PathBuf>,
        /// Conversation to continue (a new one is started otherwise)
        #[arg(long)]
        conversation: Option<String>,
        /// Print the batch result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest questions for a video
    Suggest {
        /// YouTube URL
        url: String,
        /// Number of questions
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Ask the model instead of using the generic list
        #[arg(long)]
        generate: bool,
    },
    /// Run the HTTP server
    #[cfg(feature = "api")]
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    let filter = if cli.verbose {
        "video_qa_rust=debug,info".to_string()
    } else if config.output.log_level == "info" {
        DEFAULT_LOG_FILTER.to_string()
    } else {
        config.output.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    config.validate()?;
    if cli.verbose {
        info!("{}", config.summary());
    }

    let transcripts = TranscriptSource::from_config(&config.transcript)?;

    match cli.command {
        Commands::Transcript {
            url,
            raw,
            timestamps,
        } => {
            let (video_id, transcript) = transcripts.get_transcript_for_url(&url).await?;
            info!("📜 Transcript for {} ({} characters)", video_id, transcript.len());

            if timestamps {
                let found = extract_timestamps(&transcript);
                if found.is_empty() {
                    warn!("No timestamps found in transcript");
                }
                for entry in found {
                    println!("[{}] {}", entry.timestamp, entry.text);
                }
            } else if raw {
                println!("{}", transcript);
            } else {
                println!("{}", clean(&transcript));
            }
        }

        Commands::Ask {
            url,
            mut questions,
            questions_file,
            conversation,
            json,
        } => {
            if let Some(path) = questions_file {
                let contents = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Cannot read questions file {}", path.display()))?;
                questions.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .map(str::to_string),
                );
            }
            if questions.is_empty() {
                bail!("Please enter at least one question (-q or --questions-file)");
            }

            let llm = build_llm(&config)?;
            let (video_id, transcript) = transcripts.get_transcript_for_url(&url).await?;
            let processor = BatchProcessor::new(llm, ContextCache::new(&config.cache), &config);

            let conversation_id = conversation
                .map(ConversationId::from)
                .unwrap_or_default();
            info!("💬 Conversation {} on video {}", conversation_id, video_id);

            let result = processor
                .process_questions(&conversation_id, &questions, &transcript)
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for item in &result.results {
                    let marker = match item.status {
                        AnswerStatus::Success => "✅",
                        AnswerStatus::Error => "❌",
                    };
                    println!("{} Q: {}\n{}\n", marker, item.question, item.answer);
                }
            }

            info!("🎉 Processing completed in {:.2}s", result.total_time.as_secs_f64());
            info!("✅ Successful: {}", result.successful);
            info!("❌ Failed: {}", result.failed);
        }

        Commands::Suggest {
            url,
            limit,
            generate,
        } => {
            let llm = if generate {
                match build_llm(&config) {
                    Ok(llm) => Some(llm),
                    Err(e) => {
                        warn!("⚠️ Cannot generate questions, using defaults: {:#}", e);
                        None
                    }
                }
            } else {
                None
            };

            let (_, transcript) = transcripts.get_transcript_for_url(&url).await?;
            let suggester = QuestionSuggester::new(llm, &config);
            let questions = suggester.suggest(&transcript, limit, generate).await;

            if questions.is_empty() {
                warn!("No questions could be generated");
            }
            for question in questions {
                println!("▶️ {}", question);
            }
        }

        #[cfg(feature = "api")]
        Commands::Serve { host, port } => {
            use video_qa_rust::api::{ApiServer, AppState};

            let llm = build_llm(&config)?;
            let state = AppState {
                processor: Arc::new(BatchProcessor::new(
                    llm.clone(),
                    ContextCache::new(&config.cache),
                    &config,
                )),
                transcripts,
                suggester: Arc::new(QuestionSuggester::new(Some(llm), &config)),
            };

            let host = host.unwrap_or_else(|| config.api.host.clone());
            let port = port.unwrap_or(config.api.port);
            ApiServer::new(state, host, port).start().await?;
        }
    }

    Ok(())
}

/// Model client for the configured provider
fn build_llm(config: &Config) -> Result<Arc<dyn LLM>> {
    config.validate_llm()?;
    let llm = create_llm(&config.llm)?;
    info!(
        "🤖 Using {:?} model {} (key {})",
        llm.provider_type(),
        config.llm.model,
        config.llm.redacted_api_key()
    );
    Ok(Arc::from(llm))
}
