use std::{net::SocketAddr, path::Path};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use tollgate::{
    app,
    config::{GatewayConfig, GatewayConfigValidator, StoreBackend, load_config},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, global = true, default_value = "config.yaml")]
    config: String,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    log_json: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
    /// Start the gateway server (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Validate => validate_config_command(&args.config).await,
        Commands::Init => init_config_command(&args.config).await,
        Commands::Serve => serve(&args.config, args.log_json).await,
    }
}

async fn serve(config_path: &str, log_json: bool) -> Result<()> {
    tracing_setup::init_tracing(log_json).map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Loading configuration from {config_path}");
    let config = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    GatewayConfigValidator::validate(&config).context("Invalid configuration")?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let store = app::counter_store(&config)?;
    let client = app::http_client(&config)?;
    let router = app::build_router(&config, store, client);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Tollgate listening on {} ({} routes, rate limiting: {}, limit {} per {}s)",
        addr,
        config.routes.len(),
        config.rate_limit.enabled,
        config.rate_limit.default_limit,
        config.rate_limit.window_secs
    );

    let graceful_shutdown = GracefulShutdown::new();
    let signal_handler = {
        let shutdown = graceful_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.run_signal_handler().await {
                tracing::error!("Signal handler failed: {:?}", e);
            }
        })
    };

    let wait_for = graceful_shutdown.clone();
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let signal = wait_for.wait().await;
        tracing::info!("Shutdown signal received: {:?}, draining connections", signal);
    })
    .await
    .context("Server error")?;

    signal_handler.abort();
    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            print_summary(&config);
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure route uris start with http:// or https:// and have no trailing '/'");
            println!("   • Ensure route paths start with '/' and end with '/**'");
            println!("   • Order more specific route paths before more general ones");
            println!("   • Verify listen address format (e.g., '127.0.0.1:8080')");
            std::process::exit(1);
        }
    }
}

fn print_summary(config: &GatewayConfig) {
    println!("✅ Configuration validation: OK");
    println!();
    println!("📋 Configuration Summary:");
    println!("   • Listen Address: {}", config.listen_addr);
    for route in &config.routes {
        println!(
            "   • Route {}: {} -> {} (strip {})",
            route.id, route.path, route.uri, route.strip_prefix
        );
    }
    let store = match config.rate_limit.store {
        StoreBackend::Redis => format!("redis ({})", config.rate_limit.redis_url),
        StoreBackend::Memory => "memory".to_string(),
    };
    println!(
        "   • Rate Limit: {} ({} per {}s, store: {})",
        if config.rate_limit.enabled { "enabled" } else { "disabled" },
        config.rate_limit.default_limit,
        config.rate_limit.window_secs,
        store
    );
    println!("   • Admin Endpoints: {}", config.admin_enabled);
    println!("   • Max Body Size: {} bytes", config.max_body_bytes);
    println!();
}

const STARTER_CONFIG: &str = r#"# Tollgate gateway configuration

# The address to listen on
listen_addr: "127.0.0.1:8080"

# Routes are matched in order; the first matching path prefix wins.
routes:
  - id: user-service
    path: /api/users/**
    uri: http://localhost:8081
    strip_prefix: 2
  - id: order-service
    path: /api/orders/**
    uri: http://localhost:8082
    strip_prefix: 2

rate_limit:
  enabled: true
  default_limit: 100
  window_secs: 60
  key_prefix: "gateway:ratelimit:"
  store: redis
  redis_url: "redis://127.0.0.1:6379"
  store_timeout_ms: 250
  exempt_prefixes:
    - /health

upstream:
  connect_timeout_secs: 5
  read_timeout_secs: 5

health_path: /health
admin_enabled: true
max_body_bytes: 10485760
"#;

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    tokio::fs::write(path, STARTER_CONFIG)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'tollgate serve --config {config_path}' to start the server");
    Ok(())
}
