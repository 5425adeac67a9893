// Configuration de la passerelle de paiement.
// Construite une fois au démarrage puis injectée via web::Data - jamais
// relue depuis l'environnement en cours de requête.

use std::env;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub access_token: String,
    pub webhook_secret: String, // Clé HMAC partagée pour x-signature
    pub timeout_secs: u64,      // Borne dure sur chaque appel sortant
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("PAYMENT_API_URL")
            .unwrap_or_else(|_| "https://api.mercadopago.com".to_string());

        let access_token = env::var("PAYMENT_ACCESS_TOKEN").unwrap_or_else(|_| {
            eprintln!("⚠️  WARNING: PAYMENT_ACCESS_TOKEN not found in .env, gateway calls will fail");
            String::new()
        });

        let webhook_secret = env::var("PAYMENT_WEBHOOK_SECRET").unwrap_or_else(|_| {
            eprintln!("⚠️  WARNING: PAYMENT_WEBHOOK_SECRET not found in .env, webhooks will be rejected");
            String::new()
        });

        let timeout_secs = env::var("PAYMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        GatewayConfig {
            base_url,
            access_token,
            webhook_secret,
            timeout_secs,
        }
    }
}
