use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::errors::PurchaseError;
use crate::middleware::AuthUser;
use crate::models::dto::{CreatePurchaseRequest, PixPurchaseRequest};
use crate::services::payment_gateway::PaymentGateway;
use crate::services::pix_service::PixService;
use crate::services::purchase_service::PurchaseService;

/// POST /api/events/{slug}/purchase - achat carte (règlement synchrone)
pub async fn create_purchase(
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<dyn PaymentGateway>,
    auth_user: AuthUser,
    path: web::Path<String>,
    request: web::Json<CreatePurchaseRequest>,
) -> Result<HttpResponse, PurchaseError> {
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let event_slug = path.into_inner();
    let receipt = PurchaseService::purchase(
        db.get_ref(),
        gateway.get_ref(),
        auth_user.user_id,
        &event_slug,
        request.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Created().json(receipt))
}

/// POST /api/events/{slug}/purchase/pix - demande Pix: retourne le QR,
/// le fulfillment attendra le webhook de confirmation
pub async fn request_pix_purchase(
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<dyn PaymentGateway>,
    auth_user: AuthUser,
    path: web::Path<String>,
    request: web::Json<PixPurchaseRequest>,
) -> Result<HttpResponse, PurchaseError> {
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let event_slug = path.into_inner();
    let checkout = PixService::request(
        db.get_ref(),
        gateway.get_ref(),
        auth_user.user_id,
        &event_slug,
        request.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Created().json(checkout))
}

pub fn purchase_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events/{slug}/purchase")
            .route("", web::post().to(create_purchase))
            .route("/pix", web::post().to(request_pix_purchase)),
    );
}
