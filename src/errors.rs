// ============================================================================
// ERREURS DU MOTEUR D'ACHAT
// ============================================================================
//
// Taxonomie (voir services/purchase_service.rs pour la machine à états):
//   - Erreurs de validation : aucune mutation n'a eu lieu, récupérable
//   - Gateway : l'appel externe a échoué AVANT que l'argent bouge -> rollback
//   - RolledBackWithRefund : l'argent a bougé, le commit local a échoué,
//     le remboursement a réussi
//   - ManualInterventionRequired : idem mais le remboursement a échoué aussi
//   - WebhookSignature : callback rejeté sans aucun effet de bord
//
// Politique de propagation: les erreurs de validation et de passerelle sont
// renvoyées telles quelles au client. Les échecs de commit/remboursement ne
// sont JAMAIS exposés en détail (le client voit déjà un débit) - réponse
// générique "processing", l'incident est escaladé en interne.
// ============================================================================

use actix_web::{HttpResponse, http::StatusCode};
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PurchaseError {
    // --- Validation (aucune mutation) ---
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Product does not belong to this event")]
    ProductNotInEvent,

    #[error("User is not registered to this event")]
    NotRegisteredToEvent,

    #[error("Product is out of stock")]
    OutOfStock,

    #[error("Product sales period has expired")]
    ProductExpired,

    #[error("Product is blocked for purchase")]
    ProductBlocked,

    #[error("Ownership limit reached: owns {owned}, requested {requested}, max {max}")]
    OwnershipCapExceeded { owned: i64, requested: i32, max: i32 },

    #[error("Gift recipient email is required")]
    MissingGiftRecipient,

    #[error("Gift recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Cannot gift a product to yourself")]
    SelfGiftNotAllowed,

    #[error("Invalid payment data: {0}")]
    InvalidPayment(String),

    // --- Passerelle (échec avant mouvement de fonds -> rollback) ---
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    // --- Compensation ---
    #[error("local commit failed after capture; charge refunded")]
    RolledBackWithRefund,

    #[error("local commit failed after capture; refund also failed")]
    ManualInterventionRequired,

    // --- Webhook ---
    #[error("Invalid webhook signature")]
    WebhookSignature,

    // --- Stockage ---
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

impl actix_web::ResponseError for PurchaseError {
    fn status_code(&self) -> StatusCode {
        match self {
            PurchaseError::EventNotFound(_)
            | PurchaseError::ProductNotFound(_)
            | PurchaseError::RecipientNotFound(_) => StatusCode::NOT_FOUND,

            PurchaseError::ProductNotInEvent
            | PurchaseError::NotRegisteredToEvent
            | PurchaseError::ProductExpired
            | PurchaseError::ProductBlocked
            | PurchaseError::MissingGiftRecipient
            | PurchaseError::SelfGiftNotAllowed
            | PurchaseError::InvalidPayment(_)
            | PurchaseError::WebhookSignature => StatusCode::BAD_REQUEST,

            PurchaseError::OutOfStock
            | PurchaseError::OwnershipCapExceeded { .. } => StatusCode::CONFLICT,

            PurchaseError::Gateway(_) => StatusCode::BAD_GATEWAY,

            PurchaseError::RolledBackWithRefund
            | PurchaseError::ManualInterventionRequired
            | PurchaseError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // Le client a vu un débit: réponse générique, détails en interne
            PurchaseError::RolledBackWithRefund | PurchaseError::ManualInterventionRequired => {
                HttpResponse::build(self.status_code()).json(serde_json::json!({
                    "error": "Your payment is being processed. If you were charged, \
                              our team has been notified and will follow up."
                }))
            }
            PurchaseError::Db(_) => {
                HttpResponse::build(self.status_code()).json(serde_json::json!({
                    "error": "Internal server error"
                }))
            }
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": self.to_string()
            })),
        }
    }
}
