//! Lectern CLI - command line interface for the Lectern admin tooling

mod watch;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use lectern_core::{CsrfToken, LecternConfig, TokenSource};
use lectern_gallery::{validate_image, HttpImageCatalog, ImageCatalog, ImageFile};
use std::path::PathBuf;
use tracing::{info, Level};

use crate::watch::WatchOptions;

fn config_args() -> [Arg; 4] {
    [
        Arg::new("config")
            .short('c')
            .long("config")
            .global(true)
            .help("Path to configuration file (JSON format)")
            .long_help(
                "Path to a JSON configuration file. Without it the file in the user \
                configuration directory is used when present, otherwise defaults apply. \
                LECTERN_* environment variables and CLI flags override file values.",
            )
            .value_parser(clap::value_parser!(PathBuf)),
        Arg::new("override")
            .long("override")
            .global(true)
            .help("Configuration override file, applied section by section")
            .action(clap::ArgAction::Append)
            .value_parser(clap::value_parser!(PathBuf)),
        Arg::new("base-url")
            .long("base-url")
            .global(true)
            .help("Base URL of the admin backend")
            .value_parser(clap::value_parser!(String)),
        Arg::new("dev-mode")
            .long("dev-mode")
            .global(true)
            .help("Enable development mode with debug logging")
            .action(clap::ArgAction::SetTrue),
    ]
}

fn token_arg() -> Arg {
    Arg::new("token")
        .short('t')
        .long("token")
        .help("Anti-forgery token to send with requests")
        .env("LECTERN_CSRF_TOKEN")
        .value_parser(clap::value_parser!(String))
}

pub fn build_cli() -> Command {
    Command::new("lectern")
        .version("0.1.0")
        .about("Live preview, image gallery and content styling for the admin editor")
        .args(config_args())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("watch")
                .about("Render a Markdown file to HTML on every change")
                .arg(
                    Arg::new("file")
                        .help("Markdown file to watch")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("HTML file to write the preview to")
                        .default_value("preview.html")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("offline")
                        .long("offline")
                        .help("Render locally instead of calling the preview endpoint")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("enhance")
                        .long("enhance")
                        .help("Apply image and table styling to the preview")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("cookie")
                        .long("cookie")
                        .help("Cookie header copied from a browser session")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(token_arg()),
        )
        .subcommand(
            Command::new("images")
                .about("Manage uploaded images")
                .subcommand_required(true)
                .arg(token_arg())
                .subcommand(
                    Command::new("list").about("List uploaded images").arg(
                        Arg::new("json")
                            .long("json")
                            .help("Print the listing as JSON")
                            .action(clap::ArgAction::SetTrue),
                    ),
                )
                .subcommand(
                    Command::new("upload").about("Upload an image").arg(
                        Arg::new("file")
                            .required(true)
                            .value_parser(clap::value_parser!(PathBuf)),
                    ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete an uploaded image")
                        .arg(Arg::new("filename").required(true)),
                ),
        )
        .subcommand(
            Command::new("enhance")
                .about("Style images and tables in an HTML fragment")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("Write to a file instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(Command::new("validate-config").about("Validate the configuration and exit"))
        .after_help(
            "EXAMPLES:\n    \
            lectern watch post.md -o preview.html --token <csrftoken>\n    \
            lectern watch post.md --offline --enhance\n    \
            lectern images upload diagram.png\n    \
            lectern enhance article.html -o article.styled.html\n    \
            lectern --config lectern.json validate-config",
        )
}

/// Load configuration: file, override files, environment, then flags
fn load_config(matches: &ArgMatches) -> Result<LecternConfig> {
    let explicit = matches.get_one::<PathBuf>("config").cloned();
    let path = explicit
        .clone()
        .or_else(|| LecternConfig::default_path().filter(|p| p.exists()));
    let overrides: Vec<PathBuf> = matches
        .get_many::<PathBuf>("override")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut config = match &path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            if explicit.is_some() && !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            LecternConfig::load_with_overrides(path, &overrides).with_context(|| {
                format!(
                    "Failed to load configuration file: {}\n\
                    You can validate your config with: lectern --config {} validate-config",
                    path.display(),
                    path.display()
                )
            })?
        }
        None => {
            info!("Using default configuration");
            LecternConfig::new()
        }
    };

    config.apply_environment_overrides(&LecternConfig::environment_overrides())?;

    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.endpoints.base_url = base_url.clone();
    }

    config.validate()?;
    Ok(config)
}

fn csrf_token(config: &LecternConfig, matches: &ArgMatches) -> Result<Option<CsrfToken>> {
    match matches.get_one::<String>("token") {
        Some(value) => Ok(Some(CsrfToken {
            header: config.csrf.header_name.clone(),
            value: value.clone(),
            source: TokenSource::Cookie,
        })),
        None if config.csrf.required => bail!(
            "An anti-forgery token is required. Pass --token or set LECTERN_CSRF_TOKEN."
        ),
        None => Ok(None),
    }
}

async fn images(config: &LecternConfig, matches: &ArgMatches) -> Result<()> {
    let catalog = HttpImageCatalog::from_config(config);
    let token = csrf_token(config, matches)?;

    match matches.subcommand() {
        Some(("list", sub)) => {
            let listing = catalog.list(token.as_ref()).await?;
            if !listing.success {
                bail!(
                    "Failed to list images: {}",
                    listing.error.unwrap_or_else(|| "Unknown error".to_string())
                );
            }
            if sub.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else if listing.images.is_empty() {
                println!("No uploaded images");
            } else {
                println!("🖼  {} images\n", listing.count);
                for image in &listing.images {
                    println!("  {}  {}  {}", image.filename, image.size, image.created);
                    println!("    {}", image.markdown);
                }
            }
        }
        Some(("upload", sub)) => {
            let path = sub
                .get_one::<PathBuf>("file")
                .context("No file selected")?;
            let file = ImageFile::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            validate_image(&file, &config.gallery)?;

            let result = catalog.upload(&file, token.as_ref()).await?;
            if !result.success {
                bail!(
                    "Upload failed: {}",
                    result.error.unwrap_or_else(|| "Unknown server error".to_string())
                );
            }
            println!("✅ Uploaded {}", file.filename);
            if let Some(markdown) = result.markdown {
                println!("{}", markdown);
            }
        }
        Some(("delete", sub)) => {
            let filename = sub
                .get_one::<String>("filename")
                .context("No file name given")?;
            let result = catalog.delete(filename, token.as_ref()).await?;
            if !result.success {
                bail!(
                    "Delete failed: {}",
                    result.error.unwrap_or_else(|| "Unknown error".to_string())
                );
            }
            println!("🗑  Deleted {}", filename);
        }
        _ => unreachable!("subcommand_required is set"),
    }
    Ok(())
}

async fn enhance(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<PathBuf>("file")
        .context("No input file given")?;
    let html = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let enhanced = lectern_enhance::enhance_html(&html);

    match matches.get_one::<PathBuf>("out") {
        Some(out) => {
            tokio::fs::write(out, enhanced)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("Enhanced content written to {}", out.display());
        }
        None => println!("{}", enhanced),
    }
    Ok(())
}

fn print_config_summary(config: &LecternConfig) {
    println!("✅ Configuration is valid\n");

    println!("Endpoints:");
    println!("  Base URL: {}", config.endpoints.base_url);
    println!("  Preview: {}", config.endpoints.preview);
    println!("  Images: {}", config.endpoints.list_images);
    println!("  Upload: {}", config.endpoints.upload_image);
    println!("  Delete: {}", config.endpoints.delete_image);

    println!("\nPreview:");
    println!("  Field: {}", config.preview.field_selector);
    println!("  Panel: {}", config.preview.panel_selector);
    println!("  Debounce: {} ms", config.preview.debounce_ms);

    println!("\nTypesetting:");
    println!(
        "  Wait: {} attempts every {} ms",
        config.typeset.max_attempts, config.typeset.retry_interval_ms
    );
    println!("  Follow-up passes: {:?} ms", config.typeset.follow_up_delays_ms);

    println!("\nAnti-forgery token:");
    println!("  Required: {}", config.csrf.required);
    println!("  Header: {}", config.csrf.header_name);

    println!("\nGallery:");
    println!(
        "  Max upload: {} MB",
        config.gallery.max_upload_bytes / (1024 * 1024)
    );
    println!("  Types: {}", config.gallery.allowed_types.join(", "));
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let dev_mode = matches.get_flag("dev-mode");

    let log_level = if dev_mode { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(dev_mode)
        .with_line_number(dev_mode)
        .with_file(dev_mode);
    if dev_mode {
        subscriber.with_ansi(true).pretty().init();
        info!("🔧 Development mode enabled");
    } else {
        subscriber.with_ansi(true).init();
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error:\n{:#}", e);
            std::process::exit(1);
        }
    };

    let outcome = match matches.subcommand() {
        Some(("watch", sub)) => {
            let options = WatchOptions {
                input: sub
                    .get_one::<PathBuf>("file")
                    .cloned()
                    .context("No file given")?,
                output: sub
                    .get_one::<PathBuf>("out")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from("preview.html")),
                offline: sub.get_flag("offline"),
                enhance: sub.get_flag("enhance"),
                token: sub.get_one::<String>("token").cloned(),
                cookies: sub.get_one::<String>("cookie").cloned(),
            };
            watch::run(config, options).await
        }
        Some(("images", sub)) => images(&config, sub).await,
        Some(("enhance", sub)) => enhance(sub).await,
        Some(("validate-config", _)) => {
            print_config_summary(&config);
            Ok(())
        }
        _ => unreachable!("subcommand_required is set"),
    };

    if let Err(e) = outcome {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
