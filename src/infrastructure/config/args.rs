use super::app_config::LogLevel;
use crate::domain::entities::{CachePolicy, PixelFormat, Precision, Scale, Size};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "imgpipe",
    version,
    about = "Load, resize and transform images through a cached request pipeline",
    long_about = None
)]
pub struct CliArgs {
    /// Images to load: URLs, file paths or `file://` URLs.
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Target size as `WIDTHxHEIGHT` or `original`.
    #[arg(short, long, default_value = "original")]
    pub size: Size,

    /// Scale policy.
    #[arg(long, value_enum)]
    pub scale: Option<Scale>,

    /// Size matching precision.
    #[arg(long, value_enum)]
    pub precision: Option<Precision>,

    /// Transformation to apply, in order (`grayscale`, `circle`, `blur:SIGMA`,
    /// `rounded:RADIUS`). Repeatable.
    #[arg(short, long = "transform", value_name = "SPEC")]
    pub transforms: Vec<String>,

    /// Acceptable pixel formats. Repeatable.
    #[arg(long = "format", value_enum)]
    pub allowed_formats: Vec<PixelFormat>,

    /// Memory cache policy.
    #[arg(long, value_enum)]
    pub memory_cache_policy: Option<CachePolicy>,

    /// Disk cache policy.
    #[arg(long, value_enum)]
    pub disk_cache_policy: Option<CachePolicy>,

    /// Memory cache budget in bytes.
    #[arg(long, value_name = "BYTES")]
    pub memory_cache_bytes: Option<usize>,

    /// Disable the disk cache entirely.
    #[arg(long)]
    pub no_disk_cache: bool,

    /// Disk cache directory.
    #[arg(long, value_name = "PATH")]
    pub disk_cache_dir: Option<PathBuf>,

    /// Load every source this many times, to exercise the memory cache.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Directory to write loaded images to, as PNG.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Print results as JSON lines.
    #[arg(long)]
    pub json: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log every pipeline stage boundary.
    #[arg(long)]
    pub log_events: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_invocation() {
        let args = CliArgs::parse_from([
            "imgpipe",
            "-s",
            "200x100",
            "--scale",
            "fill",
            "--precision",
            "inexact",
            "-t",
            "grayscale",
            "-t",
            "blur:2",
            "--format",
            "rgba8",
            "--disk-cache-policy",
            "read-only",
            "--json",
            "a.png",
            "https://example.com/b.png",
        ]);

        assert_eq!(args.sources, vec!["a.png", "https://example.com/b.png"]);
        assert_eq!(args.size, Size::pixels(200, 100).unwrap());
        assert_eq!(args.scale, Some(Scale::Fill));
        assert_eq!(args.precision, Some(Precision::Inexact));
        assert_eq!(args.transforms, vec!["grayscale", "blur:2"]);
        assert_eq!(args.allowed_formats, vec![PixelFormat::Rgba8]);
        assert_eq!(args.disk_cache_policy, Some(CachePolicy::ReadOnly));
        assert!(args.json);
        assert_eq!(args.repeat, 1);
    }

    #[test]
    fn test_sources_required() {
        assert!(CliArgs::try_parse_from(["imgpipe"]).is_err());
    }

    #[test]
    fn test_invalid_size_rejected() {
        assert!(CliArgs::try_parse_from(["imgpipe", "-s", "0x10", "a.png"]).is_err());
    }
}
