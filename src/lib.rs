pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{OrderService, PaymentService, SummaryService};
use domain::ports::{CatalogLookup, Clock, IdGenerator, SalesStore};
use errors::AppError;
use infrastructure::diesel_store::{DieselCatalog, DieselStore};
use infrastructure::system::{RandomIds, SystemClock};

pub use config::{ConfigError, ServiceConfig};
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::close_order,
        handlers::payments::create_payment,
        handlers::payments::list_payments,
        handlers::payments::get_payment,
        handlers::sales::sales_history,
        handlers::sales::sales_summary,
        handlers::cashier::cashier_orders,
        handlers::cashier::process_payment,
    ),
    tags(
        (name = "orders", description = "Order lifecycle"),
        (name = "payments", description = "Payment recording"),
        (name = "sales", description = "Sales history and rollups"),
        (name = "cashier", description = "Cashier settlement console"),
    )
)]
pub struct ApiDoc;

/// The application services shared by every worker.
pub struct SalesServices<S, C> {
    orders: web::Data<OrderService<S, C>>,
    payments: web::Data<PaymentService<S>>,
    summary: web::Data<SummaryService<S>>,
}

impl<S, C> Clone for SalesServices<S, C> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            payments: self.payments.clone(),
            summary: self.summary.clone(),
        }
    }
}

impl<S: SalesStore + Clone, C: CatalogLookup> SalesServices<S, C> {
    pub fn new(store: S, catalog: C, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            orders: web::Data::new(OrderService::new(
                store.clone(),
                catalog,
                clock.clone(),
                ids.clone(),
            )),
            payments: web::Data::new(PaymentService::new(store.clone(), clock, ids)),
            summary: web::Data::new(SummaryService::new(store)),
        }
    }
}

impl<S: SalesStore, C: CatalogLookup> SalesServices<S, C> {
    /// Registers the services, extractor error handling and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        use handlers::{cashier, orders, payments, sales};

        cfg.app_data(self.orders.clone())
            .app_data(self.payments.clone())
            .app_data(self.summary.clone())
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
            )
            .app_data(
                web::QueryConfig::default()
                    .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
            )
            .app_data(
                web::PathConfig::default()
                    .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
            )
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/orders")
                    .service(
                        web::resource("")
                            .route(web::post().to(orders::create_order::<S, C>))
                            .route(web::get().to(orders::list_orders::<S, C>)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(orders::get_order::<S, C>))
                            .route(web::put().to(orders::update_order::<S, C>)),
                    )
                    .route("/{id}/close", web::post().to(orders::close_order::<S, C>)),
            )
            .service(
                web::scope("/payments")
                    .service(
                        web::resource("")
                            .route(web::post().to(payments::create_payment::<S>))
                            .route(web::get().to(payments::list_payments::<S>)),
                    )
                    .route("/{id}", web::get().to(payments::get_payment::<S>)),
            )
            .service(
                web::scope("/sales")
                    .route("/history", web::get().to(sales::sales_history::<S>))
                    .route("/summary", web::get().to(sales::sales_summary::<S>)),
            )
            .service(
                web::scope("/cashier")
                    .route("/orders", web::get().to(cashier::cashier_orders::<S, C>))
                    .route(
                        "/orders/{id}/payments",
                        web::post().to(cashier::process_payment::<S>),
                    ),
            );
    }
}

/// Services backed by Postgres, the wall clock and random identifiers.
pub fn postgres_services(pool: DbPool) -> SalesServices<DieselStore, DieselCatalog> {
    SalesServices::new(
        DieselStore::new(pool.clone()),
        DieselCatalog::new(pool),
        Arc::new(SystemClock),
        Arc::new(RandomIds),
    )
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server<S: SalesStore, C: CatalogLookup>(
    services: SalesServices<S, C>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| services.configure(cfg))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
