mod config;
mod db;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let settings = config::Settings::from_env().expect("invalid configuration");

    let pool = db::init_pool(&settings)
        .await
        .expect("database init failed");
    let state = state::AppState::new(pool);

    let app = routes::app(state, &settings);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port))
        .await
        .expect("failed to bind");

    tracing::info!(
        port = settings.port,
        prefix = %settings.api_prefix,
        environment = %settings.environment,
        "placelists listening"
    );
    axum::serve(listener, app).await.expect("server failed");
}
