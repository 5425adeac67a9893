// ============================================================================
// ADAPTATEUR DE PASSERELLE DE PAIEMENT
// ============================================================================
//
// Enveloppe mince autour de l'API de paiement externe (création d'ordre
// carte, remboursement, paiement Pix, relecture de statut). Sans état du
// point de vue de ce système: toute la logique transactionnelle vit dans
// purchase_service / pix_service.
//
// Le trait permet d'injecter un faux dans les tests (ordre de compensation,
// comptage des remboursements) sans toucher au réseau.
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::errors::PurchaseError;
use crate::models::dto::CardPaymentData;

#[derive(Debug, Clone)]
pub struct Payer {
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct OrderResult {
    pub id: String,
    pub status: String,
    pub total_amount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct RefundResult {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct PixResult {
    pub payment_id: String,
    pub qr_code: String,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentInfo {
    pub id: String,
    pub status: String, // 'approved', 'pending', 'rejected', ...
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Crée et capture un ordre carte pour `amount_cents`.
    /// Une capture non approuvée est une erreur: aucun fonds n'a bougé.
    async fn create_order(
        &self,
        amount_cents: i64,
        external_reference: &str,
        payment: &CardPaymentData,
        payer: &Payer,
    ) -> Result<OrderResult, PurchaseError>;

    /// Rembourse intégralement un paiement capturé.
    async fn create_refund(&self, payment_id: &str) -> Result<RefundResult, PurchaseError>;

    /// Crée un paiement Pix à régler hors bande (QR code).
    async fn create_pix_payment(
        &self,
        amount_cents: i64,
        payer: &Payer,
        external_reference: &str,
    ) -> Result<PixResult, PurchaseError>;

    /// Relit le statut d'un paiement (le corps du webhook ne porte que l'id).
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo, PurchaseError>;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        // Timeout borné: un appel qui traîne est traité comme un échec
        // (la transaction ouverte côté appelant sera annulée)
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build payment gateway HTTP client");

        HttpPaymentGateway { client, config }
    }

    // L'API parle en unités décimales, on stocke en centimes
    fn amount_to_units(amount_cents: i64) -> f64 {
        amount_cents as f64 / 100.0
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, PurchaseError> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| PurchaseError::Gateway(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PurchaseError::Gateway(format!("Invalid response body: {}", e)))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(PurchaseError::Gateway(format!(
                "Gateway returned {}: {}",
                status, message
            )));
        }

        Ok(body)
    }
}

// L'id de paiement est numérique chez certains fournisseurs, string chez
// d'autres - on normalise en String
fn id_string(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        amount_cents: i64,
        external_reference: &str,
        payment: &CardPaymentData,
        payer: &Payer,
    ) -> Result<OrderResult, PurchaseError> {
        let body = serde_json::json!({
            "transaction_amount": Self::amount_to_units(amount_cents),
            "token": payment.token,
            "installments": payment.installments,
            "payment_method_id": payment.payment_method_id,
            "external_reference": external_reference,
            "payer": { "email": payer.email },
        });

        let response = self
            .send(
                self.client
                    .post(format!("{}/v1/payments", self.config.base_url))
                    .header("X-Idempotency-Key", Uuid::new_v4().to_string())
                    .json(&body),
            )
            .await?;

        let id = id_string(response.get("id"));
        if id.is_empty() {
            return Err(PurchaseError::Gateway(
                "Gateway response missing payment id".to_string(),
            ));
        }

        let status = response
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("")
            .to_string();

        // Capture refusée = échec avant mouvement de fonds (rollback simple)
        if status != "approved" {
            let detail = response
                .get("status_detail")
                .and_then(|s| s.as_str())
                .unwrap_or("no detail");
            return Err(PurchaseError::Gateway(format!(
                "Payment not approved: {} ({})",
                status, detail
            )));
        }

        let total_amount_cents = response
            .get("transaction_amount")
            .and_then(|v| v.as_f64())
            .map(|v| (v * 100.0).round() as i64)
            .unwrap_or(amount_cents);

        Ok(OrderResult {
            id,
            status,
            total_amount_cents,
        })
    }

    async fn create_refund(&self, payment_id: &str) -> Result<RefundResult, PurchaseError> {
        let response = self
            .send(
                self.client
                    .post(format!(
                        "{}/v1/payments/{}/refunds",
                        self.config.base_url, payment_id
                    ))
                    .header("X-Idempotency-Key", Uuid::new_v4().to_string())
                    .json(&serde_json::json!({})),
            )
            .await?;

        Ok(RefundResult {
            id: id_string(response.get("id")),
        })
    }

    async fn create_pix_payment(
        &self,
        amount_cents: i64,
        payer: &Payer,
        external_reference: &str,
    ) -> Result<PixResult, PurchaseError> {
        let body = serde_json::json!({
            "transaction_amount": Self::amount_to_units(amount_cents),
            "payment_method_id": "pix",
            "external_reference": external_reference,
            "payer": { "email": payer.email },
        });

        let response = self
            .send(
                self.client
                    .post(format!("{}/v1/payments", self.config.base_url))
                    .header("X-Idempotency-Key", Uuid::new_v4().to_string())
                    .json(&body),
            )
            .await?;

        let payment_id = id_string(response.get("id"));
        if payment_id.is_empty() {
            return Err(PurchaseError::Gateway(
                "Gateway response missing payment id".to_string(),
            ));
        }

        let transaction_data = response
            .get("point_of_interaction")
            .and_then(|p| p.get("transaction_data"));

        let qr_code = transaction_data
            .and_then(|t| t.get("qr_code"))
            .and_then(|q| q.as_str())
            .map(|q| q.to_string())
            .ok_or_else(|| {
                PurchaseError::Gateway("Gateway response missing Pix QR code".to_string())
            })?;

        let qr_code_base64 = transaction_data
            .and_then(|t| t.get("qr_code_base64"))
            .and_then(|q| q.as_str())
            .map(|q| q.to_string());

        let ticket_url = transaction_data
            .and_then(|t| t.get("ticket_url"))
            .and_then(|q| q.as_str())
            .map(|q| q.to_string());

        Ok(PixResult {
            payment_id,
            qr_code,
            qr_code_base64,
            ticket_url,
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo, PurchaseError> {
        let response = self
            .send(
                self.client
                    .get(format!("{}/v1/payments/{}", self.config.base_url, payment_id)),
            )
            .await?;

        Ok(PaymentInfo {
            id: id_string(response.get("id")),
            status: response
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("")
                .to_string(),
        })
    }
}
