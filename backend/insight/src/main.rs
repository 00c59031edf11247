use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use insight::{
    gemini::GeminiClient,
    summary::{ModelPreference, TextGenerator, summarize},
};
use records::{Paging, RetryPolicy, connect_remote};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    survey_id: Uuid,

    #[arg(short, long, default_value = "en")]
    language: String,

    #[arg(long, env = "STORE_URL", default_value = "http://localhost:54321")]
    store_url: String,

    #[arg(long, env = "STORE_KEY", hide_env_values = true)]
    store_key: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let db = connect_remote(
        &args.store_url,
        &args.store_key,
        RetryPolicy::default(),
        Paging::default(),
    )
    .context("Store client misconfigured")?;

    let generator = args
        .gemini_key
        .as_deref()
        .map(GeminiClient::new)
        .transpose()
        .context("Gemini client misconfigured")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Analyzing survey {}", args.survey_id));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = summarize(
        &db,
        generator.as_ref().map(|g| g as &dyn TextGenerator),
        &ModelPreference::default(),
        args.survey_id,
        &args.language,
    )
    .await;

    pb.finish_and_clear();

    println!("{}", result.context("Analysis failed")?);
    Ok(())
}
