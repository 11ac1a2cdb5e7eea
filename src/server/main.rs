// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use actix_cors::Cors;
use actix_web::middleware::{self, DefaultHeaders};
use actix_web::{App, HttpServer, web};
use citybike::api::{self, SharedRepository};
use citybike::config::Settings;
use citybike::postgres_tools::{CitybikePostgresPool, make_async_pool};
use citybike::repository::PostgresRepository;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    // one pool for the lifetime of the server, shared by every worker
    let pool: CitybikePostgresPool = make_async_pool(&settings.database_url, settings.pool_size)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let repository: SharedRepository = Arc::new(PostgresRepository::new(Arc::new(pool)));

    tracing::info!(
        "Starting citybike server on {}:{}",
        settings.host,
        settings.port
    );

    let mut builder = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(DefaultHeaders::new().add(("Server", "Citybike")))
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(Arc::clone(&repository)))
            .configure(api::configure)
    });

    if let Some(workers) = settings.workers {
        builder = builder.workers(workers);
    }

    builder
        .bind((settings.host.as_str(), settings.port))?
        .run()
        .await?;

    tracing::info!("Citybike server stopped");

    Ok(())
}
