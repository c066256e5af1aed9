use paligemma_serve::{
    config::{Args, ServeConfig},
    logging, router,
    upload::UploadStore,
    AppState,
};
use paligemma_vlm::{ImageFetcher, Paligemma};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // secrets such as HF_TOKEN and API_KEY may live in a .env file
    dotenvy::dotenv().ok();

    let args: Args = argh::from_env();
    let config = ServeConfig::from_env(args)?;

    logging::init(&config.log_dir, &config.log_level)?;

    log::info!("🚀 Starting the server");
    if config.api_key.is_some() {
        log::info!("🔒 API key authentication enabled");
    }

    let model_config = config.model.clone();
    let model = tokio::task::spawn_blocking(move || Paligemma::new(model_config)).await??;
    log::info!("🔥 Model {} loaded", config.model.model_id);

    let state = AppState::new(
        model,
        ImageFetcher::new(config.fetch_timeout),
        UploadStore::new(&config.upload_dir),
        config.api_key.clone(),
    );
    let app = router(state, config.body_limit);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("🔥 Listening on: http://{}", config.addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
