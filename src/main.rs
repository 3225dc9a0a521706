use bs_calculator::models::black_scholes::BlackScholesMerton;
use bs_calculator::models::OptionPricer;
use bs_calculator::state::AppState;
use bs_calculator::{config, db, seed, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Black-Scholes calculator: prices European options and keeps a history.
#[derive(Parser, Debug)]
#[command(name = "bs_calculator")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Host address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Insert random sample calculations
    Seed {
        /// Number of calculations to generate
        #[arg(short, long, default_value_t = 100)]
        count: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.database {
        cfg.database_path = path;
    }

    let db_pool = match db::init_db(&cfg.database_path) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(h) = host {
                cfg.server_host = h;
            }
            if let Some(p) = port {
                cfg.server_port = p;
            }
            run_server(cfg, db_pool).await;
        }
        Command::Seed { count } => {
            run_seed(&db_pool, count);
            if let Err(e) = db::close_db(db_pool) {
                tracing::warn!("database close error: {e}");
            }
        }
    }
}

async fn run_server(cfg: config::AppConfig, db_pool: db::DbPool) {
    let addr = cfg.bind_addr();
    let state = AppState::new(cfg, db_pool);
    tracing::info!(model = state.pricer.name(), "bs_calculator starting");

    let app = server::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });
    tracing::info!("server listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }

    tracing::info!("server stopped");

    // `serve` owned the router and has dropped it by now.
    if let Err(e) = state.close() {
        tracing::warn!("database close error: {e}");
    }
}

fn run_seed(db_pool: &db::DbPool, count: usize) {
    tracing::info!(count = count, "generating sample calculations");
    let pricer = BlackScholesMerton::new();
    let mut rng = rand::thread_rng();
    match seed::seed_database(db_pool, &pricer, &mut rng, count) {
        Ok(report) => tracing::info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "sample data added"
        ),
        Err(e) => {
            tracing::error!("seed error: {e}");
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("ctrl-c handler error: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("SIGTERM handler error: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
