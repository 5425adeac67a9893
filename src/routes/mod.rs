pub mod health;
pub mod purchases;
pub mod webhooks;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(purchases::purchase_routes)
            .configure(webhooks::webhook_routes)
    );
}
