use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use study_blossom::{config::Config, db, handlers, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "study_blossom=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::load().expect("Failed to load configuration");
  let pool = db::init_db(&config.database.path).expect("Failed to initialize database");
  let bind_addr = config.server.bind_addr();
  let app_name = config.server.app_name.clone();

  let state = AppState::from_config(pool, config);
  let app = handlers::router(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("{} running on http://{}", app_name, bind_addr);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
