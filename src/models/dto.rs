// DTOs du moteur d'achat (requêtes validées + réponses structurées)
use serde::{Serialize, Deserialize};
use validator::Validate;

// ---------------------------------------------------------------------------
// Requêtes
// ---------------------------------------------------------------------------

fn default_quantity() -> i32 {
    1
}

// Données carte transmises telles quelles à la passerelle (jamais le PAN:
// le client tokenise la carte côté front, on ne voit que le token)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CardPaymentData {
    #[validate(length(min = 1, message = "Card token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "Payment method id is required"))]
    pub payment_method_id: String,
    #[validate(range(min = 1, message = "Installments must be at least 1"))]
    pub installments: i32,
    #[validate(email)]
    pub payer_email: Option<String>,
}

/// POST /api/events/{slug}/purchase - achat carte (règlement synchrone)
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub is_gift: bool,
    #[validate(email)]
    pub gift_recipient_email: Option<String>,
    #[validate(nested)]
    pub payment: CardPaymentData,
}

/// POST /api/events/{slug}/purchase/pix - demande Pix (règlement différé)
#[derive(Debug, Deserialize, Validate)]
pub struct PixPurchaseRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub is_gift: bool,
    #[validate(email)]
    pub gift_recipient_email: Option<String>,
}

// ---------------------------------------------------------------------------
// Réponses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PurchaseReceiptResponse {
    pub purchase_id: i32,
    pub product_id: i32,
    pub beneficiary_id: i32,
    pub quantity: i32,
    pub total_cents: i64,
    pub payment_id: String,
    pub tokens_minted: usize,
    pub activities_registered: usize,
}

#[derive(Debug, Serialize)]
pub struct PixCheckoutResponse {
    pub payment_id: String,
    pub qr_code: String,                 // Payload "copia e cola"
    pub qr_code_base64: Option<String>,  // Image QR encodée si fournie
    pub ticket_url: Option<String>,
}
