mod config;
mod db;
mod errors;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use std::sync::Arc;

use actix_web::{App, HttpServer, web};

use crate::config::GatewayConfig;
use crate::services::payment_gateway::{HttpPaymentGateway, PaymentGateway};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    println!("🔌 Connecting to database...");
    let db = db::establish_connection()
        .await
        .expect("Failed to connect to database");
    println!("✅ Database connected!");

    let gateway_config = GatewayConfig::from_env();
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(HttpPaymentGateway::new(gateway_config.clone()));
    let gateway_data: web::Data<dyn PaymentGateway> = web::Data::from(gateway);
    println!("💳 Payment gateway: {}", gateway_config.base_url);

    println!("🚀 Starting server on http://127.0.0.1:8080");

    let db_data = web::Data::new(db);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(web::Data::new(gateway_config.clone()))
            .app_data(gateway_data.clone())
            .configure(routes::configure_routes)
    })
        .bind(("127.0.0.1", 8080))?
        .run()
        .await
}
