use anyhow::{Context, Result};
use banking_advisor::logging;
use banking_advisor::{
    AppConfig, GoogleTts, LlamaServerBackend, Pipeline, WhisperServerTranscriber,
};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "banking-advisor")]
#[command(about = "Personalized banking recommendations from statements, KYC data and a local LLM")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./advisor.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the input CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory the JSON results are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Base URL of the llama.cpp server
    #[arg(long)]
    llm_endpoint: Option<String>,

    /// Reference date for "current month" figures (YYYY-MM-DD, default today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Refresh interests from a new social media CSV and regenerate recommendations
    #[arg(long, value_name = "FILE", group = "mode")]
    update_social: Option<PathBuf>,

    /// Answer a recorded question and speak the answer
    #[arg(long, value_name = "FILE", group = "mode")]
    voice: Option<PathBuf>,

    /// Answer a typed question
    #[arg(long, value_name = "TEXT", group = "mode")]
    query: Option<String>,

    /// Analyze customer grievance emails
    #[arg(long, group = "mode")]
    grievances: bool,

    /// Generate financial insights and an email draft
    #[arg(long, group = "mode")]
    insights: bool,
}

fn main() {
    logging::init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.paths.output_dir = dir;
    }
    if let Some(endpoint) = cli.llm_endpoint {
        config.llm.endpoint = endpoint;
    }

    let as_of = cli.as_of.unwrap_or_else(|| Local::now().date_naive());
    info!(
        data_dir = %config.paths.data_dir.display(),
        output_dir = %config.paths.output_dir.display(),
        endpoint = %config.llm.endpoint,
        %as_of,
        "Starting banking advisor"
    );

    let backend = LlamaServerBackend::new(&config.llm).context("Failed to create model client")?;
    let pipeline = Pipeline::new(&config, as_of);

    if let Some(posts) = cli.update_social {
        pipeline.update_recommendations(&backend, &posts)?;
    } else if let Some(audio) = cli.voice {
        let voice = pipeline.voice_processor(
            &backend,
            WhisperServerTranscriber::new(&config.voice)?,
            GoogleTts::new(&config.voice)?,
        );
        match voice.process_audio_file(&audio)? {
            Some(answer) => println!("\n💬 {}", answer),
            None => println!("⚠️  No speech detected in {}", audio.display()),
        }
    } else if let Some(question) = cli.query {
        let answer = pipeline.query_processor(&backend).process_query(&question)?;
        println!("\n💬 {}", answer);
    } else if cli.grievances {
        pipeline.run_grievance_analysis(&backend)?;
    } else if cli.insights {
        let (insights, _email) = pipeline.run_insights(&backend)?;
        println!("\n{}", insights.to_text());
    } else {
        pipeline.run_full_pipeline(&backend)?;
    }

    Ok(())
}
