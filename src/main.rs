use actix_web::{web, App, HttpServer};
use clap::Parser;
use osint_terminal::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use osint_terminal::config::AppConfig;
use osint_terminal::state::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        if let Err(e) = run_cli(cli.command, &cli.config).await {
            error!("{}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = web::Data::from(AppState::new(config));

    info!("OSINT Lab Terminal running on port {}", port);
    state.log_environment();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(osint_terminal::api::routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
