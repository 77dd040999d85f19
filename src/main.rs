use clap::Parser;
use lectern::cli::{
    Args, build_config, handle_issue_token, init_logging, load_jwt_secret, media_storage,
    open_database, validate_public_url,
};
use lectern::publisher::{PUBLISH_INTERVAL, spawn_publisher};
use lectern::run_server;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(user_id) = args.issue_token {
        handle_issue_token(&db, &jwt_secret, user_id).await;
        return;
    }

    let Some(public_url) = validate_public_url(&args.public_url) else {
        std::process::exit(1);
    };

    let Some(media) = media_storage(args.media_dir, args.media_store_url.as_deref()) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let config = build_config(db, public_url, media, jwt_secret);

    let shutdown = CancellationToken::new();
    let publisher = spawn_publisher(
        config.db.clone(),
        config.clock.clone(),
        PUBLISH_INTERVAL,
        shutdown.clone(),
    );

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let signal = shutdown.clone();
    let result = run_server(config, listener, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutting down");
        signal.cancel();
    })
    .await;

    shutdown.cancel();
    if let Err(e) = publisher.await {
        error!(error = %e, "Publisher task failed");
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
