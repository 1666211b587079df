//! speech-prep - Clean extracted document text and chunk it for TTS

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use speech_prep::config::PrepConfig;
use speech_prep::extract::CommandOcr;
use speech_prep::{Document, DocumentKind, Pipeline, PipelineOutput};

#[derive(Parser, Debug)]
#[command(name = "speech-prep")]
#[command(about = "Clean extracted document text and split it into TTS-ready chunks", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the input document (.pdf or plain text)
    input: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Maximum characters per chunk (overrides config)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Minimum characters of the final chunk (overrides config)
    #[arg(long)]
    min_chars: Option<usize>,

    /// OCR command reading the document on stdin (overrides config)
    #[arg(long)]
    ocr_command: Option<String>,

    /// Configuration file (default: ~/.config/cli-programs/speech-prep.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Extraction summary, chunks, stats and diagnostics as JSON
    Json,
    /// Chunk texts separated by blank lines
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write the default configuration file if none exists
    Init,
    /// Set default maximum chunk size
    SetMaxChars {
        /// Characters per chunk
        value: usize,
    },
    /// Set default minimum size of the final chunk
    SetMinChars {
        /// Characters
        value: usize,
    },
    /// Set the quality threshold below which OCR is requested
    SetThreshold {
        /// Value (0.0-1.0)
        value: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action, args.config.as_deref());
    }

    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Input file is required. Run 'speech-prep --help' for usage."))?;

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(max_chars) = args.max_chars {
        config.chunker.max_chars = max_chars;
    }
    if let Some(min_chars) = args.min_chars {
        config.chunker.min_chars = min_chars;
    }
    config.validate().context("Invalid configuration")?;

    let kind = DocumentKind::from_path(&input);
    let mut pipeline = Pipeline::from_config(&config, kind);
    if let Some(program) = &args.ocr_command {
        pipeline = pipeline.with_ocr(Arc::new(CommandOcr::new(program, &config.ocr.args)));
    }

    if args.debug {
        eprintln!("Input: {} ({:?})", input.display(), kind);
        eprintln!("Extractors: {}", pipeline.extractor_labels().join(", "));
        eprintln!(
            "Chunk limits: {}-{} chars",
            config.chunker.min_chars, config.chunker.max_chars
        );
    }

    let document = Document::read(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let output = pipeline
        .run(&document)
        .await
        .with_context(|| format!("Failed to process {}", document.name))?;

    print_summary(&output);

    let rendered = match args.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&output).context("Failed to serialize output")?
        }
        OutputFormat::Text => render_text(&output),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Output: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PrepConfig> {
    let config = match path {
        Some(path) => PrepConfig::load_from(path),
        None => PrepConfig::load(),
    };
    config.context("Failed to load configuration")
}

fn save_config(config: &PrepConfig, path: Option<&Path>) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let saved = match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    saved.context("Failed to save configuration")
}

fn print_summary(output: &PipelineOutput) {
    let extraction = &output.extraction;
    eprintln!(
        "Source: {}{} (score {:.3})",
        extraction.chosen_source_label,
        if extraction.used_ocr { " via OCR" } else { "" },
        extraction.score.value
    );
    if let Some(pages) = extraction.page_count {
        eprintln!("Pages: {}", pages);
    }
    eprintln!(
        "Words: {}, Paragraphs: {}, Estimated audio: {:.1} min",
        output.stats.words, output.stats.paragraphs, output.stats.audio_minutes
    );
    eprintln!("Chunks: {}", output.chunks.len());

    let over_length = output.chunks.iter().filter(|c| c.over_length).count();
    if over_length > 0 {
        eprintln!(
            "Warning: {} chunk(s) hold a single sentence over the size limit",
            over_length
        );
    }
}

fn render_text(output: &PipelineOutput) -> String {
    output
        .chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn handle_config_command(action: &ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(path)?;
            let location = match path {
                Some(path) => path.to_path_buf(),
                None => PrepConfig::config_path()?,
            };
            println!("Configuration file: {:?}", location);
            println!();
            println!("quality_threshold = {}", config.scoring.quality_threshold);
            println!("max_chars = {}", config.chunker.max_chars);
            println!("min_chars = {}", config.chunker.min_chars);
            let rules: Vec<_> = config
                .cleaner
                .enabled_rules
                .iter()
                .map(|r| r.as_str())
                .collect();
            println!("enabled_rules = [{}]", rules.join(", "));
            for extractor in &config.extractors {
                println!(
                    "extractor {} = {} {}",
                    extractor.label,
                    extractor.program,
                    extractor.args.join(" ")
                );
            }
            if let Some(program) = &config.ocr.program {
                println!("ocr = \"{}\" (timeout {}s)", program, config.ocr.timeout_secs);
            } else {
                println!("ocr = (disabled)");
            }
        }
        ConfigAction::Init => {
            let location = match path {
                Some(path) => path.to_path_buf(),
                None => PrepConfig::config_path()?,
            };
            if location.exists() {
                println!("Configuration already exists: {}", location.display());
            } else {
                save_config(&PrepConfig::default(), Some(location.as_path()))?;
                println!("Wrote default configuration to: {}", location.display());
            }
        }
        ConfigAction::SetMaxChars { value } => {
            let mut config = load_config(path)?;
            config.chunker.max_chars = *value;
            save_config(&config, path)?;
            println!("Default max_chars set to: {}", config.chunker.max_chars);
        }
        ConfigAction::SetMinChars { value } => {
            let mut config = load_config(path)?;
            config.chunker.min_chars = *value;
            save_config(&config, path)?;
            println!("Default min_chars set to: {}", config.chunker.min_chars);
        }
        ConfigAction::SetThreshold { value } => {
            let mut config = load_config(path)?;
            config.scoring.quality_threshold = value.clamp(0.0, 1.0);
            save_config(&config, path)?;
            println!(
                "Default quality threshold set to: {}",
                config.scoring.quality_threshold
            );
        }
    }
    Ok(())
}
