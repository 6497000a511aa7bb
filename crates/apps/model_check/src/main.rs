use std::env;
use std::time::{Duration, Instant};

use clap::Parser;
use foundation::time::Time;
use reqwest::Client;
use scene::MaterialNormalizer;
use streaming::{LoaderConfig, ModelResourceLoader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod fetch;
mod report;

use fetch::{Completion, HttpFetcher};
use report::{CheckReport, SceneSummary};

#[derive(Parser, Debug)]
#[command(author, version, about = "Loads one 3D model URL the way the viewer does and reports the outcome")]
struct Args {
    /// Model URL (binary glTF)
    url: String,

    /// Skip the HEAD existence check
    #[arg(long)]
    no_verify: bool,

    /// Existence check timeout in seconds (env: MODEL_CHECK_VERIFY_TIMEOUT_S)
    #[arg(long)]
    verify_timeout_s: Option<f64>,

    /// Transfer timeout in seconds (env: MODEL_CHECK_DOWNLOAD_TIMEOUT_S)
    #[arg(long)]
    download_timeout_s: Option<f64>,

    /// Overall load watchdog in seconds (env: MODEL_CHECK_WATCHDOG_TIMEOUT_S)
    #[arg(long)]
    watchdog_timeout_s: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn loader_config(&self) -> LoaderConfig {
        let defaults = LoaderConfig::default();
        LoaderConfig {
            verify: !self.no_verify && env_bool("MODEL_CHECK_VERIFY").unwrap_or(defaults.verify),
            verify_timeout_s: self
                .verify_timeout_s
                .or_else(|| env_f64("MODEL_CHECK_VERIFY_TIMEOUT_S"))
                .unwrap_or(defaults.verify_timeout_s),
            download_timeout_s: self
                .download_timeout_s
                .or_else(|| env_f64("MODEL_CHECK_DOWNLOAD_TIMEOUT_S"))
                .unwrap_or(defaults.download_timeout_s),
            watchdog_timeout_s: self
                .watchdog_timeout_s
                .or_else(|| env_f64("MODEL_CHECK_WATCHDOG_TIMEOUT_S"))
                .unwrap_or(defaults.watchdog_timeout_s),
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key).ok()?.trim().parse().ok()
}

fn env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.trim() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = real_main().await {
        eprintln!("model_check: {err}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let args = Args::parse();
    let config = args.loader_config();
    let report = check_model(&args.url, config).await;

    if args.json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        print!("{report}");
    }

    if report.is_ready() {
        Ok(())
    } else {
        Err(format!("load ended in state {}", report.state))
    }
}

/// Runs one load to a terminal state, feeding network completions and
/// timer deadlines into the loader as they happen.
async fn check_model(url: &str, config: LoaderConfig) -> CheckReport {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut loader = ModelResourceLoader::new(config, HttpFetcher::new(Client::new(), tx));
    let clock = Instant::now();
    let now = || Time(clock.elapsed().as_secs_f64());

    let request = loader.load(url, now());
    while !loader.state().is_terminal() {
        let wait = loader
            .next_deadline()
            .map(|d| Duration::from_secs_f64(d.since(now()).max(0.0)))
            .unwrap_or(Duration::from_secs(1));

        tokio::select! {
            completion = rx.recv() => match completion {
                Some(Completion::Verify(r, result)) => loader.on_verify_result(r, result, now()),
                Some(Completion::Download(r, result)) => loader.on_download_result(r, result, now()),
                None => {
                    warn!("completion channel closed");
                    loader.advance(now());
                }
            },
            _ = tokio::time::sleep(wait) => loader.advance(now()),
        }

        for event in loader.events_mut().drain() {
            info!(
                at = event.at.0,
                request = %event.payload.request,
                state = %event.payload.state,
                "load transition"
            );
        }
    }

    let status = loader.status();
    let summary = loader.take_scene(request).map(|mut scene| {
        let normalized = MaterialNormalizer::default().normalize(&mut scene);
        SceneSummary::new(&scene, normalized)
    });
    CheckReport::new(&status, now().0, summary)
}
