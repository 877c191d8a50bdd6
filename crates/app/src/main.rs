use app::{AppConfig, AppState, print_usage, router};
use services::AppServices;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|arg| matches!(arg.as_str(), "--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let config = AppConfig::parse(argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let AppConfig { bind, settings } = config;
    let (batch_size, max_generations) = (settings.batch_size, settings.max_generations);
    let features: Vec<&str> = settings.features.iter().map(|f| f.as_str()).collect();
    let session_ttl_secs = settings.session_ttl.as_secs();
    info!(?features, session_ttl_secs, "service settings");
    let services = AppServices::from_env(settings)?;
    let app = router(AppState::new(&services));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(
        addr = %bind,
        batch_size,
        max_generations,
        "quiz server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
