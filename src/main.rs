use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use imgpipe::application::{ImageLoader, Outcome};
use imgpipe::domain::entities::{ImageData, ImageResult};
use imgpipe::domain::ports::Transformation;
use imgpipe::infrastructure::transform::parse_transformation;
use imgpipe::infrastructure::{AppConfig, CliArgs, StorageManager};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    // Without a platform config dir, only an explicit --config can be read.
    let storage =
        StorageManager::new().unwrap_or_else(|_| StorageManager::with_dir(PathBuf::from(".")));
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

/// Bare paths load from disk; anything with a scheme goes through the
/// mappers and fetchers as a URL.
fn image_data(source: &str) -> ImageData {
    if source.contains("://") {
        ImageData::Url(source.to_string())
    } else {
        ImageData::Path(PathBuf::from(source))
    }
}

#[derive(Debug, Serialize)]
struct Report {
    round: u32,
    source: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
}

impl Report {
    fn new(round: u32, source: &str, outcome: &Outcome) -> Self {
        let mut report = Self {
            round,
            source: source.to_string(),
            status: "cancelled",
            data_source: None,
            width: None,
            height: None,
            sampled: None,
            cache_key: None,
            error: None,
            output: None,
        };
        match outcome {
            Ok(ImageResult::Success(success)) => {
                let (width, height) = success.artifact.dimensions();
                report.status = "success";
                report.data_source = Some(success.data_source.to_string());
                report.width = Some(width);
                report.height = Some(height);
                report.sampled = Some(success.is_sampled);
                report.cache_key = success.memory_cache_key.as_ref().map(ToString::to_string);
            }
            Ok(ImageResult::Error(failure)) => {
                report.status = "error";
                report.error = Some(failure.error.to_string());
            }
            Err(_) => {}
        }
        report
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string(self)?);
            return Ok(());
        }
        match self.status {
            "success" => println!(
                "[{}] {} -> {}x{} from {}{}",
                self.round,
                self.source,
                self.width.unwrap_or_default(),
                self.height.unwrap_or_default(),
                self.data_source.as_deref().unwrap_or("?"),
                if self.sampled == Some(true) { " (sampled)" } else { "" },
            ),
            "error" => println!(
                "[{}] {} failed: {}",
                self.round,
                self.source,
                self.error.as_deref().unwrap_or("unknown error")
            ),
            _ => println!("[{}] {} cancelled", self.round, self.source),
        }
        Ok(())
    }
}

async fn save_output(outcome: &Outcome, dir: &Path, index: usize) -> Result<Option<PathBuf>> {
    let Ok(ImageResult::Success(success)) = outcome else {
        return Ok(None);
    };
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{index}.png"));
    let pixels = success.artifact.to_static();
    let target = path.clone();
    tokio::task::spawn_blocking(move || pixels.save_with_format(&target, image::ImageFormat::Png))
        .await?
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    Ok(Some(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = imgpipe::VERSION, "Starting {}", imgpipe::NAME);

    let transformations = args
        .transforms
        .iter()
        .map(|spec| parse_transformation(spec).map_err(|e| eyre!(e)))
        .collect::<Result<Vec<Arc<dyn Transformation>>>>()?;

    let loader = ImageLoader::from_config(&config, None).await?;

    tokio::spawn({
        let loader = loader.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling requests");
                loader.shutdown();
            }
        }
    });

    let mut failures = 0usize;
    for round in 1..=args.repeat.max(1) {
        let requests = args.sources.iter().map(|source| {
            let request = loader
                .request(image_data(source))
                .size(args.size)
                .transformations(transformations.clone())
                .build();
            loader.execute(request)
        });
        let outcomes = join_all(requests).await;

        for (index, (source, outcome)) in args.sources.iter().zip(outcomes).enumerate() {
            let mut report = Report::new(round, source, &outcome);
            if report.status != "success" {
                failures += 1;
            }
            if round == args.repeat.max(1)
                && let Some(dir) = &args.output
            {
                match save_output(&outcome, dir, index).await {
                    Ok(path) => report.output = path,
                    Err(e) => warn!(error = %e, "Failed to save output"),
                }
            }
            report.print(args.json)?;
        }
    }

    info!(stats = %loader.stats(), "Done");

    if failures > 0 {
        return Err(eyre!("{failures} request(s) did not succeed"));
    }
    Ok(())
}
