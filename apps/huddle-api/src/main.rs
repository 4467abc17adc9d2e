use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huddle_api::auth::identity::{IdentityResolver, TrustedIdentity};
use huddle_api::config::Config;
use huddle_api::db::memory::MemoryChatStore;
use huddle_api::db::pg::PgChatStore;
use huddle_api::db::store::ChatStore;
use huddle_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing, env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let (store, identity): (Arc<dyn ChatStore>, Arc<dyn IdentityResolver>) =
        match &config.database_url {
            Some(url) => {
                let pool = huddle_api::db::pool::connect(url, config.db_pool_size)
                    .expect("failed to build connection pool");
                let pg = Arc::new(PgChatStore::new(pool));
                let identity: Arc<dyn IdentityResolver> = if config.verify_users {
                    pg.clone() as Arc<dyn IdentityResolver>
                } else {
                    Arc::new(TrustedIdentity)
                };
                (pg as Arc<dyn ChatStore>, identity)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, messages are kept in memory only");
                if config.verify_users {
                    tracing::warn!("VERIFY_USERS ignored without a database");
                }
                let store: Arc<dyn ChatStore> = Arc::new(MemoryChatStore::new());
                let identity: Arc<dyn IdentityResolver> = Arc::new(TrustedIdentity);
                (store, identity)
            }
        };

    let cors = match &config.cors_origin {
        Some(origin) => {
            let origin: HeaderValue = origin.parse().expect("CORS_ORIGIN is not a valid header value");
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    tracing::info!(
        worker_id = config.worker_id,
        error_acks = config.error_acks,
        verify_users = config.verify_users,
        "huddle-api configured"
    );

    let state = AppState::build(config, store, identity).expect("invalid configuration");

    let app = Router::new()
        .merge(huddle_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "huddle-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
