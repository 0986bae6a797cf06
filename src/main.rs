mod cli;

use alembic::{
    config,
    registry::CapabilityRegistry,
    resolver,
    retention::{spawn_sweeper, RetentionSweeper},
    scheduler::Scheduler,
    server,
    storage::ArtifactStorage,
    store::MemoryJobStore,
};
use alembic_backends::{probe_backends, ConvertTask, ToolRegistry};
use alembic_common::{ConvertOptions, FormatToken};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_server(
    host: String,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting Alembic server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    // Discover external tools and probe backend capabilities
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    let registry = Arc::new(CapabilityRegistry::from_backends(probe_backends(&tools)));
    for backend in registry.backends() {
        let caps = backend.capabilities();
        tracing::info!(
            family = %backend.family(),
            inputs = caps.inputs.len(),
            outputs = caps.outputs.len(),
            "Registered backend"
        );
    }

    // Artifact storage and job store
    let storage = Arc::new(ArtifactStorage::new(
        config.storage.upload_dir.clone(),
        config.storage.converted_dir.clone(),
    )?);
    let store = Arc::new(MemoryJobStore::new());

    let scheduler = Scheduler::new(registry.clone(), store.clone(), storage.clone());

    // Start retention sweeper
    let sweeper = Arc::new(RetentionSweeper::new(
        store,
        storage.clone(),
        std::time::Duration::from_secs(config.retention.window_secs),
    ));
    let sweeper_handle = spawn_sweeper(sweeper, config.retention.sweep_interval_secs);

    // Start HTTP server
    let ctx = server::AppContext {
        scheduler,
        registry,
        storage,
        tools,
        config: Arc::new(config),
    };
    let server_result = server::start_server(ctx).await;

    // Cleanup
    tracing::info!("Shutting down...");
    sweeper_handle.abort();

    server_result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "alembic=trace,alembic_backends=debug,tower_http=debug".to_string()
        } else {
            "alembic=info,alembic_backends=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert {
            input,
            output,
            to,
            quality,
            dpi,
        } => convert_file(
            &input,
            &output,
            to.as_deref(),
            quality,
            dpi,
            cli.config.as_deref(),
        ),
        Commands::Formats => list_formats(cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("alembic {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn convert_file(
    input: &std::path::Path,
    output: &std::path::Path,
    to: Option<&str>,
    quality: Option<u32>,
    dpi: Option<u32>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let registry = CapabilityRegistry::from_backends(probe_backends(&tools));

    let source_format =
        FormatToken::from_path(input).context("input file has no extension")?;
    let target_format = match to {
        Some(format) => FormatToken::new(format),
        None => FormatToken::from_path(output)
            .context("output file has no extension; pass --to")?,
    };

    let resolution = resolver::resolve(&registry, &source_format, &target_format)?;
    let backend = registry
        .backend(resolution.family)
        .context("resolved backend is not registered")?;

    tracing::info!(
        "Converting {:?} -> {:?} via the {} backend",
        input,
        output,
        resolution.family
    );

    let options = ConvertOptions {
        quality,
        dpi,
        ..Default::default()
    };
    backend
        .convert(&ConvertTask {
            input,
            output,
            source_format: &source_format,
            target_format: &target_format,
            shape: resolution.shape,
            options: &options,
        })
        .map_err(|e| anyhow::anyhow!("conversion failed: {e}"))?;

    println!("Converted {} -> {}", input.display(), output.display());
    Ok(())
}

fn list_formats(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let registry = CapabilityRegistry::from_backends(probe_backends(&tools));

    println!("Supported formats by backend family:");
    for (family, caps) in registry.list() {
        let inputs: Vec<&str> = caps.inputs.iter().map(|t| t.as_str()).collect();
        let outputs: Vec<&str> = caps.outputs.iter().map(|t| t.as_str()).collect();

        println!("\n{}:", family);
        if caps.is_empty() {
            println!("  (degraded: underlying tool not available)");
            continue;
        }
        println!("  Input:  {}", inputs.join(", "));
        println!("  Output: {}", outputs.join(", "));
    }

    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All external tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all conversions.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Uploads: {:?}", config.storage.upload_dir);
            println!("  Converted: {:?}", config.storage.converted_dir);
            println!("  Retention window: {}s", config.retention.window_secs);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Retention window: {}s", config.retention.window_secs);
        }
    }

    Ok(())
}
