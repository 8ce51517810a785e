use actix_files::Files;
use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use dotenvy::dotenv;

use attend::config::Config;
use attend::db::{ConnectionState, ConnectionSupervisor};
use attend::docs::ApiDoc;
use attend::routes;
use attend::storage::{ImageStore, UPLOAD_URL_PREFIX};

use std::time::Instant;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

struct StartedAt(Instant);

#[get("/health")]
async fn health(state: Data<ConnectionState>, started: Data<StartedAt>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "database": if state.is_connected() { "connected" } else { "disconnected" },
        "uptimeSecs": started.0.elapsed().as_secs(),
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    std::fs::create_dir_all(&config.upload_dir)?;

    // The HTTP layer does not come up until the first successful probe.
    let supervisor = ConnectionSupervisor::start(&config)
        .await
        .map_err(std::io::Error::other)?;
    let pool = supervisor.pool();
    let conn_state = supervisor.state();

    let server_addr = config.server_addr.clone();
    let upload_dir = config.upload_dir.clone();
    let config_data = config.clone();
    let store = ImageStore::local(&config);
    let started = Data::new(StartedAt(Instant::now()));

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .service(Files::new(UPLOAD_URL_PREFIX, upload_dir.clone()))
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(store.clone()))
            .app_data(Data::from(conn_state.clone()))
            .app_data(started.clone())
            .service(health)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    // Exit 0 on a clean close, 1 if the pool would not drain in time.
    supervisor.shutdown().await
}
