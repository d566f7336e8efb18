use std::io;

use dotenvy::dotenv;
use sales_service::{build_server, create_pool, postgres_services, run_migrations, ServiceConfig};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ServiceConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let pool = create_pool(&config.database_url, config.db_pool_size).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    log::info!(
        "Starting server at http://{}:{} (pool size {})",
        config.host,
        config.port,
        config.db_pool_size
    );

    build_server(postgres_services(pool), &config.host, config.port)?.await
}
