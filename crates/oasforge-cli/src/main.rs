//! oasforge CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.

// Internal imports (std, crate)
use std::path::PathBuf;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use oasforge_core::config::Config;

#[derive(Parser)]
#[command(name = "oasforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the operations configured in an oasforge config file
    Generate {
        /// Path to the configuration file (YAML, JSON or TOML)
        ///
        /// The file carries the scalar options; hooks can only be attached
        /// through the library API.
        #[arg(long, default_value = "oasforge.yaml")]
        config: PathBuf,
        /// Override the project name stamped into `info.title`
        #[arg(long)]
        name: Option<String>,
        /// Override the project version stamped into `info.version`
        #[arg(long)]
        version: Option<String>,
        /// Mode tag forwarded to user hooks (e.g. "production")
        #[arg(long)]
        mode: Option<String>,
        /// Run every operation but skip writing the transformed document
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Generate {
            config,
            name,
            version,
            mode,
            dry_run,
        } => {
            let mut config = Config::from_file(config).await.with_context(|| {
                format!("Failed to load configuration from {}", config.display())
            })?;

            if let Some(name) = name {
                config.name = name.clone();
            }
            if let Some(version) = version {
                config.version = version.clone();
            }
            if let Some(mode) = mode {
                config.mode = Some(mode.clone());
            }
            if *dry_run {
                if let Some(openapi) = config.operations.openapi.as_mut() {
                    openapi.dry_run = true;
                }
            }

            // Configuration files cannot carry closures. The gateway stage
            // requires its `route_integration` hook, so file-driven runs get
            // a pass-through one.
            if let Some(gateway) = config
                .operations
                .openapi
                .as_mut()
                .and_then(|openapi| openapi.transformation.as_mut())
                .and_then(|transformation| transformation.api_gateway_integration.as_mut())
            {
                if gateway.route_integration.is_none() {
                    gateway.route_integration = Some(Box::new(|_, _, default| Ok(default)));
                }
            }

            // An input can be a local file path or an HTTP/HTTPS URL. URLs
            // are fetched to a temporary file since the core loader reads
            // from the file system.
            let input = config.input.to_string_lossy().to_string();
            let _temp_dir = if input.starts_with("http://") || input.starts_with("https://") {
                println!("Fetching OpenAPI document from: {input}");
                let response = reqwest::get(&input)
                    .await
                    .with_context(|| format!("Failed to fetch OpenAPI document from {input}"))?;
                if !response.status().is_success() {
                    anyhow::bail!(
                        "Failed to fetch OpenAPI document from {input}: HTTP {}",
                        response.status()
                    );
                }
                let content = response
                    .text()
                    .await
                    .with_context(|| format!("Failed to read response from {input}"))?;

                let temp_dir = tempfile::tempdir()?;
                let temp_file = temp_dir.path().join("openapi_document.json");
                tokio::fs::write(&temp_file, &content).await?;
                config.input = temp_file;
                Some(temp_dir)
            } else {
                None
            };

            println!("Generating {} from: {input}", config.name);
            let document = oasforge_core::generate(&config)
                .await
                .context("Generation failed")?;

            let paths = document
                .document()
                .get("paths")
                .and_then(|paths| paths.as_object())
                .map(|paths| paths.len())
                .unwrap_or(0);
            println!(
                "✅ Successfully processed {} ({paths} paths)",
                config.name
            );
        }
    }
    Ok(())
}
