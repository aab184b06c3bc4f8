//! parse-paper CLI - Markdown text, images, and metadata from PDF papers

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use parse_paper::render::{self, to_json};
use parse_paper::{
    CleanupPreset, ImageFormat, ImageRequest, JsonFormat, PageSelection, PaperConfig, PaperParser,
    ParseRequest, Quality, TextRequest, ToolError,
};

#[derive(Parser)]
#[command(name = "parse-paper")]
#[command(version)]
#[command(about = "Extract Markdown text, images, and metadata from PDF papers", long_about = None)]
struct Cli {
    /// Print results as JSON instead of a Markdown report
    #[arg(long, global = true)]
    json: bool,

    /// Text cleanup preset
    #[arg(long, value_enum, global = true)]
    cleanup: Option<CleanupLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata, text, and images in one pass
    Parse {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Image output directory
        #[arg(short, long, value_name = "DIR", env = "PARSE_PAPER_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Image quality tier
        #[arg(short, long, value_enum, default_value = "medium")]
        quality: QualityLevel,

        /// Image file format
        #[arg(short, long, value_enum, default_value = "jpg")]
        format: FormatArg,

        /// Skip image extraction
        #[arg(long)]
        no_images: bool,

        /// Include each image as base64 in the result
        #[arg(long)]
        base64: bool,

        /// Zero-based pages (e.g., "0-2,5")
        #[arg(long)]
        pages: Option<String>,

        /// Maximum characters of text to return
        #[arg(long, value_name = "N")]
        max_chars: Option<usize>,

        /// Save the full text to this file and show a preview
        #[arg(long, value_name = "FILE")]
        save_text: Option<PathBuf>,
    },

    /// Extract Markdown text only
    Text {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Zero-based pages (e.g., "0-2,5")
        #[arg(long)]
        pages: Option<String>,

        /// Maximum characters of text to return
        #[arg(long, value_name = "N")]
        max_chars: Option<usize>,

        /// Save the full text to this file and show a preview
        #[arg(long, value_name = "FILE")]
        save_to: Option<PathBuf>,
    },

    /// Extract and compress images only
    Images {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Image output directory
        #[arg(short, long, value_name = "DIR", env = "PARSE_PAPER_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Image quality tier
        #[arg(short, long, value_enum, default_value = "medium")]
        quality: QualityLevel,

        /// Image file format
        #[arg(short, long, value_enum, default_value = "jpg")]
        format: FormatArg,

        /// Zero-based pages (e.g., "0-2,5")
        #[arg(long)]
        pages: Option<String>,

        /// Include each image as base64 in the result
        #[arg(long)]
        base64: bool,
    },

    /// Show document metadata
    #[command(alias = "info")]
    Metadata {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CleanupLevel {
    /// Unicode normalization and whitespace only
    Minimal,
    /// Ligatures, stray characters, page numbers, blank lines (default)
    Standard,
}

impl From<CleanupLevel> for CleanupPreset {
    fn from(level: CleanupLevel) -> Self {
        match level {
            CleanupLevel::Minimal => CleanupPreset::Minimal,
            CleanupLevel::Standard => CleanupPreset::Standard,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum QualityLevel {
    /// 1500 px, JPEG quality 90
    High,
    /// 1024 px, JPEG quality 85
    Medium,
    /// 768 px, JPEG quality 75
    Low,
}

impl From<QualityLevel> for Quality {
    fn from(level: QualityLevel) -> Self {
        match level {
            QualityLevel::High => Quality::High,
            QualityLevel::Medium => Quality::Medium,
            QualityLevel::Low => Quality::Low,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// JPEG at the tier's quality
    #[value(alias = "jpeg")]
    Jpg,
    /// Lossless PNG
    Png,
}

impl From<FormatArg> for ImageFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Jpg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let json = cli.json;

    let mut config = PaperConfig::new();
    if let Some(level) = cli.cleanup {
        config = config.with_cleanup_preset(level.into());
    }
    log::debug!("Cleanup preset: {:?}", config.cleanup);
    let parser = PaperParser::new(config);

    let result = match cli.command {
        Commands::Parse {
            input,
            output_dir,
            quality,
            format,
            no_images,
            base64,
            pages,
            max_chars,
            save_text,
        } => pages_arg(pages.as_deref()).and_then(|pages| {
            let request = ParseRequest {
                output_dir,
                quality: Some(quality.into()),
                image_format: Some(format.into()),
                extract_images: !no_images,
                pages,
                max_chars,
                save_text_to: save_text,
                return_base64: base64,
            };
            let spinner = spinner(json, "Parsing paper...");
            let result = parser.parse_paper(&input, &request);
            spinner.finish_and_clear();
            result.and_then(|r| emit(json, &r, render::paper_report))
        }),
        Commands::Text {
            input,
            pages,
            max_chars,
            save_to,
        } => pages_arg(pages.as_deref()).and_then(|pages| {
            let request = TextRequest {
                pages,
                max_chars,
                save_to,
            };
            parser
                .extract_text_only(&input, &request)
                .and_then(|r| emit(json, &r, render::text_report))
        }),
        Commands::Images {
            input,
            output_dir,
            quality,
            format,
            pages,
            base64,
        } => pages_arg(pages.as_deref()).and_then(|pages| {
            let request = ImageRequest {
                output_dir,
                quality: Some(quality.into()),
                image_format: Some(format.into()),
                pages,
                return_base64: base64,
            };
            let spinner = spinner(json, "Extracting images...");
            let result = parser.extract_images_only(&input, &request);
            spinner.finish_and_clear();
            result.and_then(|r| emit(json, &r, render::image_report))
        }),
        Commands::Metadata { input } => parser
            .get_paper_metadata(&input)
            .and_then(|m| emit(json, &m, render::metadata_report)),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        let error = ToolError::from(&e);
        if json {
            match to_json(&error, JsonFormat::Pretty) {
                Ok(out) => println!("{}", out),
                Err(_) => eprintln!("{}: {}", "Error".red().bold(), e),
            }
        } else {
            eprintln!("{}: {}", "Error".red().bold(), e);
        }
        std::process::exit(1);
    }
}

fn pages_arg(pages: Option<&str>) -> parse_paper::Result<PageSelection> {
    match pages {
        Some(spec) => PageSelection::parse(spec),
        None => Ok(PageSelection::All),
    }
}

/// Print a result as JSON or as its Markdown report.
fn emit<T: Serialize>(json: bool, value: &T, report: fn(&T) -> String) -> parse_paper::Result<()> {
    if json {
        println!("{}", to_json(value, JsonFormat::Pretty)?);
    } else {
        println!("{}", report(value));
    }
    Ok(())
}

fn spinner(hidden: bool, message: &'static str) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn cmd_version() {
    println!(
        "{} {}",
        "parse-paper".cyan().bold(),
        parse_paper::version()
    );
    println!("Markdown text, image, and metadata extraction for PDF papers");
    println!();
    println!("License: MIT");
}
