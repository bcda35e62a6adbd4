use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use redis::Client;
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::configuration::get_configuration;
use crate::routes::link::{check_link, create_link, respond};
use crate::services::link::LinkService;
use crate::services::notification::ResendMailer;
use crate::store::RedisLinkStore;

#[derive(Clone)]
pub struct AppState {
    pub link_service: LinkService,
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/create-link", post(create_link))
        .route("/api/check-link", get(check_link))
        .route("/api/respond", post(respond))
        .layer(cors)
        .with_state(state)
}

pub async fn run() {
    let cfg = get_configuration().expect("could not get config");

    let client =
        Client::open(cfg.redis.url.clone()).expect("could not open a client connection to redis");
    let redis = client
        .get_connection_manager()
        .await
        .expect("could not connect to redis");
    {
        // ping redis before starting
        let mut conn = redis.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .expect("redis did not answer PING");
        assert_eq!(pong, "PONG");
    }

    let store = RedisLinkStore::new(redis);
    let mailer = ResendMailer::new(cfg.email.api_key, cfg.email.from);
    let link_service = LinkService::new(
        Arc::new(store),
        Arc::new(mailer),
        cfg.application.base_url.clone(),
        cfg.dev_mode,
    );
    let app_state = AppState { link_service };

    let router = app(app_state);

    let address = format!("{}:{}", cfg.application.host, cfg.application.port);
    let listener = TcpListener::bind(&address)
        .await
        .expect("could not bind listener");
    info!("Listening on {address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("could not start server");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
