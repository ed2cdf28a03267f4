mod cli;

use crate::cli::{Cli, Commands};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use socialgen::core::prompt::KNOWN_PLATFORMS;
use socialgen::core::transcript::extract_video_id;
use socialgen::core::{Pipeline, Post, TranscriptService, YouTubeTranscriptProvider, save_posts};
use socialgen::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WRAP_WIDTH: usize = 80;

#[derive(Serialize)]
struct GenerationReport<'a> {
    generated_at: DateTime<Utc>,
    video_id: &'a str,
    posts: &'a [Post],
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let json = matches!(cli.command, Commands::Generate { json: true, .. });

    if let Err(e) = run(cli).await {
        if json {
            match serde_json::to_string_pretty(&e.report()) {
                Ok(report) => println!("{report}"),
                Err(_) => eprintln!("Error: {e}"),
            }
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            video_id,
            query,
            platforms,
            out_dir,
            json,
        } => {
            let config = cli.settings.config()?;
            tracing::debug!(?config, "configuration loaded");
            run_cli_generate(
                &config,
                &video_id,
                query.as_deref(),
                &platforms,
                out_dir,
                json,
            )
            .await?;
        }
        Commands::Transcript {
            video_id,
            timestamps,
        } => {
            let config = cli.settings.config()?;
            run_cli_transcript(&video_id, &config.languages, timestamps).await?;
        }
        Commands::Platforms => {
            println!("Known platforms:");
            for platform in KNOWN_PLATFORMS {
                println!("  • {platform}");
            }
            println!("Any other label is passed to the generator as-is.");
        }
    }

    Ok(())
}

async fn run_cli_generate(
    config: &socialgen::Config,
    video_input: &str,
    query: Option<&str>,
    platforms: &[String],
    out_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;

    if !json {
        eprintln!("Generating content... This may take a minute or two.");
    }
    let posts = pipeline.run(video_input, query, platforms).await?;

    if let Some(dir) = out_dir {
        let paths = save_posts(&dir, &posts).await?;
        if !json {
            for path in paths {
                eprintln!("Saved {}", path.display());
            }
        }
    }

    if json {
        let video_id = extract_video_id(video_input)?;
        let report = GenerationReport {
            generated_at: Utc::now(),
            video_id: &video_id,
            posts: &posts,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for post in &posts {
        println!("=== {} Post ===", post.platform);
        println!("{}", wrap_post(&post.content));
        println!();
    }

    Ok(())
}

async fn run_cli_transcript(
    video_input: &str,
    languages: &[String],
    timestamps: bool,
) -> Result<()> {
    let video_id = extract_video_id(video_input)?;
    let service = TranscriptService::new(Arc::new(YouTubeTranscriptProvider::new()?));

    let transcript = service.fetch(&video_id, languages).await?;
    eprintln!("Successfully retrieved transcript for {video_id}");
    eprintln!("Transcript length: {} characters", transcript.text().chars().count());

    if timestamps {
        println!("{}", transcript.timed_lines().join("\n"));
    } else {
        println!("{}", wrap_post(transcript.text()));
    }

    Ok(())
}

fn wrap_post(content: &str) -> String {
    content
        .lines()
        .map(|line| textwrap::fill(line, WRAP_WIDTH))
        .collect::<Vec<_>>()
        .join("\n")
}
