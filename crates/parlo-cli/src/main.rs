//! parlo CLI — dictation drill player.
//!
//! ```text
//! parlo run [--settings <file>] [--sheets <dir>] [--sheet basics] [--range 1:20]
//! parlo stop / status [--server http://localhost:2103]
//! parlo voices [language]
//! ```

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use parlo_core::types::{SessionState, SubtitleStyle};
use parlo_core::voices;
use parlo_lib::cache::CacheStore;
use parlo_lib::playback::{PlaybackDriver, RodioSink};
use parlo_lib::scheduler::SessionScheduler;
use parlo_lib::source::{SentenceSource, SheetDirSource};
use parlo_lib::study::StudyTimeAccumulator;
use parlo_lib::ui::UiHost;
use parlo_lib::{server, settings};

/// Cached clips kept before least-recently-used eviction kicks in.
const CACHE_CAP: usize = 512;

/// parlo — multi-language dictation drill player
#[derive(Parser)]
#[command(name = "parlo", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start a drill session
    Run {
        /// Settings file (default: config dir)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Directory of sentence sheets (default: data dir)
        #[arg(long)]
        sheets: Option<PathBuf>,
        /// Clip cache directory (default: data dir)
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Sheet to drill, overriding the settings file
        #[arg(long)]
        sheet: Option<String>,
        /// Sentence range as start:end, overriding the settings file
        #[arg(long)]
        range: Option<String>,
        /// Control API port
        #[arg(long, default_value = "2103")]
        port: u16,
        /// Control API host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Stop the running session
    Stop {
        #[arg(long, default_value = "http://localhost:2103")]
        server: String,
    },
    /// Show session status
    Status {
        #[arg(long, default_value = "http://localhost:2103")]
        server: String,
    },
    /// List available voices, optionally for one language
    Voices {
        language: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Run {
            settings,
            sheets,
            cache,
            sheet,
            range,
            port,
            host,
        } => run(settings, sheets, cache, sheet, range, port, host).await,
        Command::Stop { server } => {
            let resp = reqwest::Client::new()
                .post(format!("{server}/stop"))
                .send()
                .await?;
            println!("{}", resp.text().await.unwrap_or_default());
            Ok(())
        }
        Command::Status { server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/status"))
                .send()
                .await?;
            println!("{}", resp.text().await.unwrap_or_default());
            Ok(())
        }
        Command::Voices { language } => {
            list_voices(language.as_deref());
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    settings_path: Option<PathBuf>,
    sheets_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    sheet_override: Option<String>,
    range_override: Option<String>,
    port: u16,
    host: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings_path = settings_path.unwrap_or_else(|| config_dir().join("settings.json"));
    let sheets_dir = sheets_dir.unwrap_or_else(|| data_dir().join("sheets"));
    let cache_dir = cache_dir.unwrap_or_else(|| data_dir().join("cache"));

    let mut config = settings::load(&settings_path);
    if let Some(sheet) = sheet_override {
        config.sheet = sheet;
    }
    if let Some(range) = range_override {
        let (start, end) = parse_range(&range)?;
        config.start_row = start;
        config.end_row = end;
    }
    // Rewrite so defaults for missing keys land on disk.
    if let Err(e) = settings::save(&settings_path, &config) {
        warn!("{e}");
    }

    // Sentence load is the one session-start fatal: a drill with no
    // sentences never enters Running.
    let source = SheetDirSource::new(sheets_dir.clone());
    let sentences = match source.load(&config.sheet, config.start_row, config.end_row) {
        Ok(sentences) if !sentences.is_empty() => sentences,
        Ok(_) => {
            error!(
                "sheet '{}' has no rows in {}..{}",
                config.sheet, config.start_row, config.end_row
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e} (available sheets: {:?})", source.list_sheets());
            std::process::exit(1);
        }
    };

    let sink = match RodioSink::spawn() {
        Ok(sink) => sink,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let synth = parlo_lib::synth::HttpSynthesizer::new(&config.backend);
    let cache = Arc::new(CacheStore::new(synth, cache_dir, CACHE_CAP));
    let driver = Arc::new(PlaybackDriver::new(sink));
    let ui = Arc::new(ConsoleUi);
    let study = StudyTimeAccumulator::load(data_dir().join("study_time.json"), Local::now());

    let shared = Arc::new(RwLock::new(config));
    let scheduler = SessionScheduler::new(cache, driver, ui, shared, study);
    let handle = scheduler.handle();

    // Ctrl-c is the stop button.
    let ctrlc_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested");
            ctrlc_handle.stop();
        }
    });

    // Control API for the external settings surface.
    let app = server::router(handle.clone());
    let addr = format!("{host}:{port}");
    match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            info!("control API on {addr}");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    warn!("control API stopped: {e}");
                }
            });
        }
        Err(e) => warn!("control API unavailable on {addr}: {e}"),
    }

    let state = scheduler.run(sentences).await;
    let status = handle.status();
    match state {
        SessionState::Completed => {
            println!("done — {} minutes studied today", status.study_minutes);
        }
        SessionState::Cancelled => {
            println!(
                "stopped at sentence {} — {} minutes studied today",
                status.sentence_index, status.study_minutes
            );
        }
        _ => {}
    }
    Ok(())
}

fn parse_range(range: &str) -> Result<(usize, usize), String> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| format!("range must be start:end, got '{range}'"))?;
    let start: usize = start.parse().map_err(|_| format!("bad start row '{start}'"))?;
    let end: usize = end.parse().map_err(|_| format!("bad end row '{end}'"))?;
    if start == 0 || end < start {
        return Err(format!("invalid range {start}:{end}"));
    }
    Ok((start, end))
}

fn list_voices(language: Option<&str>) {
    let languages: Vec<&str> = match language {
        Some(lang) => vec![lang],
        None => voices::LANGUAGES.iter().copied().filter(|l| *l != "none").collect(),
    };
    for lang in languages {
        let catalog = voices::voices_for(lang);
        if catalog.is_empty() {
            println!("{lang}: (subtitle only)");
            continue;
        }
        println!("{lang}:");
        for (i, v) in catalog.iter().enumerate() {
            let marker = if i == 0 { " (default)" } else { "" };
            println!("  {} — {}{marker}", v.display, v.id);
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlo")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlo")
}

/// Terminal UI host: subtitle slots as indented lines, status as a rule.
struct ConsoleUi;

impl UiHost for ConsoleUi {
    fn render_subtitle(&self, _slot: usize, text: &str, _style: &SubtitleStyle) {
        // Style (color/font size) is for graphical hosts; the terminal
        // keeps the stacking order only.
        if !text.is_empty() {
            println!("    {text}");
        }
    }

    fn render_status(&self, sentence_no: usize, total: usize, speeds: &str) {
        println!("── {sentence_no}/{total}  {speeds} ──");
    }

    fn notice(&self, message: &str) {
        eprintln!("! {message}");
    }
}
