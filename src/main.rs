//! stream-harvest: collect video page links from listing pages, then visit
//! each page to capture its HLS playlist and metadata into a CSV file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stream_harvest::utils::DEFAULT_LOG_FILTER;
use stream_harvest::{
    DispatchGate, ResourceMatcher, ScrapeConfig, ScrapeSettings, SessionMode,
};

#[derive(Parser)]
#[command(name = "stream-harvest", version, about)]
struct Cli {
    /// JSON settings file; flags override its values
    #[arg(long, global = true, env = "STREAM_HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum simultaneously open pages
    #[arg(short, long, global = true, env = "STREAM_HARVEST_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// How pages map onto browser processes
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Tabs inside one shared browser
    SharedTab,
    /// A fresh browser process per page
    FreshProcess,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::SharedTab => SessionMode::SharedTab,
            ModeArg::FreshProcess => SessionMode::FreshProcess,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Scan listing pages and write the video links found
    Harvest {
        /// Listing address with a {page} placeholder
        #[arg(long)]
        url_template: String,

        #[arg(long, default_value_t = 1)]
        start_page: u32,

        #[arg(long)]
        end_page: u32,

        /// Safety cap on listing pages per run
        #[arg(long)]
        max_pages: Option<u32>,

        /// Substring every kept link must contain (defaults to the listing host)
        #[arg(long)]
        include: Option<String>,

        /// Link list output file
        #[arg(short, long, default_value = "video_links.txt")]
        output: PathBuf,
    },

    /// Visit every listed page and write one CSV row per page
    Scrape {
        /// Newline-separated page list
        #[arg(short, long, default_value = "video_links.txt")]
        input: PathBuf,

        /// CSV record output file
        #[arg(short, long, default_value = "video_m3u8_links.csv")]
        output: PathBuf,

        /// Match the resource anywhere in the URL instead of as a suffix
        #[arg(long)]
        contains: bool,

        /// Seconds to wait for the resource request on each page
        #[arg(long)]
        capture_deadline: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let gate = DispatchGate::new();
    let signal_gate = gate.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_gate.close("interrupted by Ctrl-C");
            warn!("Ctrl-C received, finishing in-flight pages before writing output");
        }
    });

    match cli.command {
        Command::Harvest {
            url_template,
            start_page,
            end_page,
            max_pages,
            include,
            output,
        } => {
            let mut listing = settings.listing.clone().unwrap_or_default();
            listing.url_template = url_template;
            listing.start_page = start_page;
            listing.end_page = end_page;
            if let Some(max_pages) = max_pages {
                listing.max_pages = max_pages;
            }
            if include.is_some() {
                listing.include_token = include;
            }

            let config = ScrapeConfig::builder()
                .settings(settings)
                .listing(listing)
                .output_path(output)
                .build()
                .context("Invalid harvest configuration")?;

            let run = stream_harvest::harvest(config, gate).await?;
            info!("Harvest finished: {} links ({})", run.links.len(), run.summary);
        }
        Command::Scrape {
            input,
            output,
            contains,
            capture_deadline,
        } => {
            let mut settings = settings;
            if contains {
                settings.matcher = ResourceMatcher::Contains(settings.matcher.pattern().to_string());
            }

            let mut builder = ScrapeConfig::builder().settings(settings);
            if let Some(secs) = capture_deadline {
                builder = builder.capture_deadline_secs(secs);
            }

            let config = builder
                .output_path(output)
                .build()
                .context("Invalid scrape configuration")?;

            let run = stream_harvest::scrape(config, &input, gate).await?;
            info!("Scrape finished: {} records ({})", run.records.len(), run.summary);
        }
    }

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<ScrapeSettings> {
    let mut settings = match &cli.config {
        Some(path) => ScrapeSettings::from_json_file(path)?,
        None => ScrapeSettings::default(),
    };

    if let Some(concurrency) = cli.concurrency {
        settings.concurrency = concurrency;
    }
    if cli.headed {
        settings.browser.headless = false;
    }
    if let Some(mode) = cli.mode {
        settings.browser.mode = mode.into();
    }
    Ok(settings)
}
