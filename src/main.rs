use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use screen_recorder::{
    create_router, AppState, Config, SessionFactory, SessionState, SyntheticBackend, Transition,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "screen-recorder")]
#[command(about = "Capture the screen with system and microphone audio")]
struct Cli {
    /// Config file, without extension
    #[arg(short, long, default_value = "config/screen-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve,

    /// Record one session headlessly and write its artifacts
    Record {
        /// Recording length in seconds; Ctrl+C stops early
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Directory the artifacts are written to
        #[arg(short, long, default_value = "recordings")]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Screen Recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let backend = Arc::new(SyntheticBackend::new(cfg.synthetic.clone()));
    let factory = SessionFactory::with_backend(backend, cfg.session_config());

    match cli.command {
        Command::Serve => serve(&cfg, factory).await,
        Command::Record { seconds, output } => record(factory, seconds, output).await,
    }
}

async fn serve(cfg: &Config, factory: SessionFactory) -> Result<()> {
    let state = AppState::new(factory);
    let app = create_router(state, cfg.service.http.static_dir.as_deref());

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}

async fn record(factory: SessionFactory, seconds: u64, output: PathBuf) -> Result<()> {
    if !factory.is_supported() {
        bail!("Recording is not supported on this platform");
    }

    let session = factory.create();

    session
        .acquire_display()
        .await
        .context("Failed to acquire display")?;
    info!("{}", session.view().status);

    if session.begin_recording().await.context("Failed to begin recording")? != Transition::Applied {
        bail!("Session {} could not start recording", session.id());
    }
    info!("Recording for {} seconds, press Ctrl+C to stop early", seconds);

    let mut view = session.subscribe();
    let mut last_elapsed = String::new();

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(deadline, interrupted);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut interrupted => {
                info!("Interrupted");
                break;
            }
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                if current.state != SessionState::Recording {
                    warn!("Recording ended: {}", current.status);
                    break;
                }
                if current.elapsed != last_elapsed {
                    info!("Elapsed {}", current.elapsed);
                    last_elapsed = current.elapsed;
                }
            }
        }
    }

    session.request_stop().await;
    info!("{}", session.view().status);

    tokio::fs::create_dir_all(&output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let artifacts = session.artifacts().await;
    for artifact in &artifacts {
        artifact
            .save(&output)
            .await
            .with_context(|| format!("Failed to write {}", artifact.filename))?;
    }

    let stats = session.stats().await;
    info!(
        "Recording complete: {:.1}s, {} chunks, {} files in {}",
        stats.duration_secs,
        stats.chunks_count,
        artifacts.len(),
        output.display()
    );

    Ok(())
}
