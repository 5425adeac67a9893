use actix_web::{web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::services::payment_gateway::PaymentGateway;
use crate::services::pix_service::PixService;
use crate::utils::signature;

// La passerelle notifie en query string (?data.id=...&type=payment),
// certains fournisseurs dupliquent l'id dans le corps { data: { id } }
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub id: serde_json::Value, // numérique ou string selon le fournisseur
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// POST /api/webhooks/payment - callback de la passerelle (PUBLIC).
///
/// Accepté seulement si le HMAC calculé localement correspond octet par
/// octet à x-signature; toute divergence est rejetée SANS effet de bord.
/// Idempotent: un callback dupliqué pour un paiement déjà finalisé est un
/// no-op silencieux (200), jamais une erreur.
pub async fn payment_webhook(
    req: HttpRequest,
    query: web::Query<WebhookQuery>,
    body: Option<web::Json<WebhookBody>>,
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<dyn PaymentGateway>,
    config: web::Data<GatewayConfig>,
) -> HttpResponse {
    // 1. Id de paiement: query data.id, sinon corps { data: { id } }
    let data_id = query.data_id.clone().or_else(|| {
        body.as_ref()
            .and_then(|b| b.data.as_ref())
            .map(|d| match &d.id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    });

    let data_id = match data_id {
        Some(id) if !id.is_empty() => id,
        _ => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Missing data.id"
            }));
        }
    };

    // 2. Headers de signature
    let x_signature = match header_value(&req, "x-signature") {
        Some(sig) => sig,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Missing x-signature header"
            }));
        }
    };
    let x_request_id = header_value(&req, "x-request-id").unwrap_or_default();

    // 3. Vérification HMAC - rejet sans aucune mutation en cas d'échec
    if let Err(reason) =
        signature::verify_webhook_signature(&config.webhook_secret, &data_id, &x_request_id, &x_signature)
    {
        eprintln!(
            "⚠️  Rejected payment webhook for {} (possible tampering): {}",
            data_id, reason
        );
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Invalid signature"
        }));
    }

    // 4. Relire le statut auprès de la passerelle (le corps ne porte que l'id)
    let payment = match gateway.get_payment(&data_id).await {
        Ok(payment) => payment,
        Err(e) => {
            eprintln!("⚠️  Failed to fetch payment {} from gateway: {}", data_id, e);
            return HttpResponse::BadGateway().json(serde_json::json!({
                "error": "Unable to verify payment status"
            }));
        }
    };

    if payment.status != "approved" {
        println!(
            "ℹ️  Payment webhook for {} ignored (status: {})",
            data_id, payment.status
        );
        return HttpResponse::Ok().json(serde_json::json!({
            "status": "ignored"
        }));
    }

    // 5. Finaliser (idempotent: no-op si déjà traité)
    match PixService::finalize(db.get_ref(), &data_id).await {
        Ok(Some(receipt)) => HttpResponse::Ok().json(serde_json::json!({
            "status": "fulfilled",
            "purchase_id": receipt.purchase_id
        })),
        Ok(None) => HttpResponse::Ok().json(serde_json::json!({
            "status": "already_processed"
        })),
        Err(e) => {
            // La transaction a été annulée, la ligne d'attente reste en
            // place: la passerelle re-livrera le callback
            eprintln!("⚠️  Failed to finalize Pix payment {}: {}", data_id, e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Finalization failed, will retry"
            }))
        }
    }
}

pub fn webhook_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").route("/payment", web::post().to(payment_webhook)));
}
