// # netpold - netpol daemon
//
// Thin integration layer for the netpol controller. All reconciliation
// logic lives in netpol-core; this binary only:
//
// 1. Reads configuration from environment variables
// 2. Initializes tracing and the runtime
// 3. Wires a watch source and backend into the controller
// 4. Translates OS signals into controller shutdown
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `NETPOL_WATCH_FILE`: Path to a newline-delimited JSON watch stream
//   (file or FIFO); `-` or unset reads from stdin
// - `NETPOL_WORKERS`: Worker task count (default 2)
// - `NETPOL_MAX_RETRIES`: Retry bound per failing key (default 5)
// - `NETPOL_BASE_DELAY_MS`: Backoff base delay in milliseconds (default 5)
// - `NETPOL_MAX_DELAY_SECS`: Backoff cap in seconds (default 1000)
// - `NETPOL_LOG_LEVEL`: trace | debug | info | warn | error (default info)
//
// ## Example
//
// ```bash
// mkfifo /tmp/pods.watch
// export NETPOL_WATCH_FILE=/tmp/pods.watch
// export NETPOL_WORKERS=4
//
// netpold
// ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use netpol_core::{Controller, ControllerConfig, MemoryBackend, TracingErrorSink, WatchSource};
use netpol_watch_json::JsonWatchSource;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum NetpolExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NetpolExitCode> for ExitCode {
    fn from(code: NetpolExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    watch_file: String,
    controller: ControllerConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut controller = ControllerConfig::default();

        if let Ok(workers) = env::var("NETPOL_WORKERS") {
            controller.workers = workers
                .parse()
                .context("NETPOL_WORKERS must be a positive integer")?;
        }
        if let Ok(max_retries) = env::var("NETPOL_MAX_RETRIES") {
            controller.max_retries = max_retries
                .parse()
                .context("NETPOL_MAX_RETRIES must be an integer")?;
        }
        if let Ok(base_delay) = env::var("NETPOL_BASE_DELAY_MS") {
            controller.base_delay_ms = base_delay
                .parse()
                .context("NETPOL_BASE_DELAY_MS must be an integer")?;
        }
        if let Ok(max_delay) = env::var("NETPOL_MAX_DELAY_SECS") {
            controller.max_delay_secs = max_delay
                .parse()
                .context("NETPOL_MAX_DELAY_SECS must be an integer")?;
        }

        Ok(Self {
            watch_file: env::var("NETPOL_WATCH_FILE").unwrap_or_else(|_| "-".to_string()),
            controller,
            log_level: env::var("NETPOL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.controller
            .validate()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "NETPOL_LOG_LEVEL '{other}' is not valid. \
                Valid levels: trace, debug, info, warn, error"
            ),
        }

        if self.watch_file != "-" && !std::path::Path::new(&self.watch_file).exists() {
            anyhow::bail!(
                "NETPOL_WATCH_FILE does not exist: {}. \
                Point it at a file or FIFO of watch events, or unset it to read stdin.",
                self.watch_file
            );
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return NetpolExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e}");
        return NetpolExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return NetpolExitCode::ConfigError.into();
    }

    info!("Starting netpold daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return NetpolExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {e}");
            NetpolExitCode::RuntimeError
        } else {
            NetpolExitCode::CleanShutdown
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let sink = Arc::new(TracingErrorSink);

    let watch_source: Box<dyn WatchSource> = if config.watch_file == "-" {
        info!("Reading watch events from stdin");
        Box::new(JsonWatchSource::new(tokio::io::stdin()))
    } else {
        info!(path = %config.watch_file, "Reading watch events from file");
        let file = tokio::fs::File::open(&config.watch_file)
            .await
            .with_context(|| format!("opening watch file {}", config.watch_file))?;
        Box::new(JsonWatchSource::new(file))
    };

    let (controller, mut events) = Controller::new(backend, sink, config.controller.clone())?;

    // Surface controller events in the logs; the channel is bounded, so a
    // wedged consumer only costs dropped events, never worker stalls.
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(?event, "controller event");
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => info!(signal = name, "shutdown signal received"),
            Err(e) => error!("signal handler error: {e}"),
        }
        let _ = shutdown_tx.send(());
    });

    controller
        .run_with_shutdown(watch_source, shutdown_rx)
        .await?;

    event_logger.abort();
    info!("netpold stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("installing SIGINT handler")?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for CTRL-C (non-Unix fallback)
#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("waiting for CTRL-C")?;
    Ok("SIGINT")
}
