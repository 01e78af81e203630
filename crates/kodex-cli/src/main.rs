use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use kodex_core::config::{ConfigLoader, KodexConfig, LoggingConfig};
use kodex_core::intent::Intent;
use kodex_core::wizard::{CutSubType, FontStyle, ThreeDSubType, WorkType};
use kodex_core::{KodexFactory, VectorizationSettings};
use log::LevelFilter;
use std::io::Write;
use std::path::{Path, PathBuf};

mod commands;
mod repl;

const REPL_LOG_FILE: &str = "kodex.log";
const DEFAULT_CONFIG_FILE: &str = "kodex.yaml";

#[derive(Parser, Debug)]
#[clap(
    name = "kodex",
    author,
    version = "0.1.0",
    about = "OBN Kodex laser design assistant"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(
        long,
        short,
        default_value = DEFAULT_CONFIG_FILE,
        help = "Configuration file; built-in defaults are used when kodex.yaml does not exist"
    )]
    config: PathBuf,

    #[clap(long, short, help = "Log level (overrides logging.level from the config)")]
    log_level: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    #[clap(long, help = "Detail to keep, 0-100")]
    detail: Option<u8>,

    #[clap(long, help = "Curve smoothing, 0-100")]
    smoothness: Option<u8>,

    #[clap(long, help = "Keep the background instead of removing it")]
    keep_background: bool,

    #[clap(long, help = "Allow several paths instead of one compound path")]
    multi_path: bool,
}

impl SettingsArgs {
    pub fn apply(&self, defaults: VectorizationSettings) -> Result<VectorizationSettings> {
        let settings = VectorizationSettings {
            detail_level: self.detail.unwrap_or(defaults.detail_level),
            smoothness: self.smoothness.unwrap_or(defaults.smoothness),
            remove_background: defaults.remove_background && !self.keep_background,
            single_path: defaults.single_path && !self.multi_path,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a laser-ready SVG from a description
    Design {
        prompt: String,

        #[clap(long, help = "Render the prompt as literal text in this font style")]
        font: Option<FontStyle>,

        #[clap(long, short, default_value = kodex_core::session::SVG_FILE_NAME)]
        output: PathBuf,

        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Run the setup wizard non-interactively and generate the result
    Wizard {
        #[clap(long)]
        work_type: WorkType,

        #[clap(long, help = "Cut sub-type: name, figure, outline or shape")]
        cut: Option<CutSubType>,

        #[clap(long = "three-d", help = "3D sub-type: new or existing")]
        three_d: Option<ThreeDSubType>,

        #[clap(long)]
        font: Option<FontStyle>,

        #[clap(long)]
        text: Option<String>,

        #[clap(long, help = "Image to attach")]
        image: Option<PathBuf>,

        #[clap(long, short, default_value = kodex_core::session::SVG_FILE_NAME)]
        output: PathBuf,

        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Vectorize an existing image
    Vectorize {
        image: PathBuf,

        #[clap(long, short, default_value = kodex_core::session::SVG_FILE_NAME)]
        output: PathBuf,

        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Interactive design assistant
    Chat {
        #[clap(long, help = "Treat every message as this intent (design or chat)")]
        intent: Option<Intent>,

        #[clap(flatten)]
        settings: SettingsArgs,
    },
    /// Interactive knowledge-grounded business chatbot
    Bot {
        #[clap(long, help = "Knowledge file to use instead of the configured knowledge")]
        knowledge: Option<PathBuf>,
    },
    /// Turn raw notes or an image into a structured knowledge base entry
    Refine {
        #[clap(long, conflicts_with_all = ["file", "image"])]
        text: Option<String>,

        #[clap(long, conflicts_with = "image")]
        file: Option<PathBuf>,

        #[clap(long, help = "Extract the text from an image first")]
        image: Option<PathBuf>,
    },
    /// Dominant colours of a logo
    Palette { image: PathBuf },
    /// Event-booking demo
    Booking {
        #[clap(subcommand)]
        action: BookingCommands,
    },
}

#[derive(Subcommand, Debug)]
enum BookingCommands {
    /// List beverage packages
    Packages,
    /// Check whether a date (YYYY-MM-DD) is available
    Check { date: String },
    /// Create a pre-booking
    Book {
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        phone: String,
        #[clap(long)]
        event_type: String,
        #[clap(long)]
        date: String,
        #[clap(long)]
        guests: u32,
        #[clap(long)]
        package: String,
    },
    /// Talk to the booking assistant
    Assistant,
}

impl Commands {
    fn is_interactive(&self) -> bool {
        matches!(
            self,
            Commands::Chat { .. }
                | Commands::Bot { .. }
                | Commands::Booking {
                    action: BookingCommands::Assistant
                }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).await?;
    init_logging(
        &config.logging,
        cli.log_level.as_deref(),
        cli.command.is_interactive(),
    )?;
    log::info!("Using configuration from {}", cli.config.display());

    // Local commands work without a Gateway key.
    if let Commands::Booking { action } = &cli.command {
        if !matches!(action, BookingCommands::Assistant) {
            let events = kodex_core::booking::EventService::from_config(&config.booking)?;
            return commands::booking(&events, action).await;
        }
    }

    let kodex = KodexFactory::create_from_config(config).context("Failed to initialise Kodex")?;

    match cli.command {
        Commands::Design {
            prompt,
            font,
            output,
            settings,
        } => {
            let settings = settings.apply(kodex.config().design.defaults)?;
            commands::design(&kodex, &prompt, font, settings, &output).await
        }
        Commands::Wizard {
            work_type,
            cut,
            three_d,
            font,
            text,
            image,
            output,
            settings,
        } => {
            let settings = settings.apply(kodex.config().design.defaults)?;
            let selection = commands::WizardArgs {
                work_type,
                cut,
                three_d,
                font,
                text,
                image,
            };
            commands::wizard(&kodex, selection, settings, &output).await
        }
        Commands::Vectorize {
            image,
            output,
            settings,
        } => {
            let settings = settings.apply(kodex.config().design.defaults)?;
            commands::vectorize(&kodex, &image, settings, &output).await
        }
        Commands::Chat { intent, settings } => {
            let settings = settings.apply(kodex.config().design.defaults)?;
            repl::chat(&kodex, intent, settings).await
        }
        Commands::Bot { knowledge } => repl::bot(&kodex, knowledge.as_deref()).await,
        Commands::Refine { text, file, image } => {
            commands::refine(&kodex, text, file.as_deref(), image.as_deref()).await
        }
        Commands::Palette { image } => commands::palette(&kodex, &image).await,
        Commands::Booking { .. } => repl::booking_assistant(&kodex).await,
    }
}

async fn load_config(path: &Path) -> Result<KodexConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        ConfigLoader::from_file(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))
    } else if path == Path::new(DEFAULT_CONFIG_FILE) {
        ConfigLoader::from_env()
            .await
            .context("Failed to build the default configuration")
    } else {
        bail!("Configuration file {} does not exist", path.display())
    }
}

/// Console logging for one-shot commands; interactive modes log to a file so
/// the conversation stays readable.
fn init_logging(config: &LoggingConfig, cli_level: Option<&str>, interactive: bool) -> Result<()> {
    let level: LevelFilter = cli_level
        .unwrap_or(&config.level)
        .parse()
        .unwrap_or(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    let file = match &config.file {
        Some(file) => Some(file.clone()),
        None if interactive => Some(PathBuf::from(REPL_LOG_FILE)),
        None => None,
    };
    if let Some(file) = file {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
            .with_context(|| format!("Failed to open log file {}", file.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    if config.format.eq_ignore_ascii_case("json") {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }

    builder.init();
    Ok(())
}
