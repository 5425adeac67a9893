// Vérification de la signature des webhooks de paiement.
//
// La passerelle signe chaque callback avec HMAC-SHA256 sur le manifeste:
//   id:{data.id};request-id:{x-request-id};ts:{ts};
// et envoie le header: x-signature: ts=<unix>,v1=<hex>
// Toute divergence octet par octet => rejet, sans aucun effet de bord.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Vérifie le header x-signature d'un callback de paiement.
/// Retourne Err(raison) si le header est malformé ou la signature invalide.
pub fn verify_webhook_signature(
    secret: &str,
    data_id: &str,
    request_id: &str,
    x_signature: &str,
) -> Result<(), String> {
    let (ts, provided) = parse_signature_header(x_signature)?;

    // hex::decode accepte majuscules et minuscules
    let provided_bytes =
        hex::decode(provided).map_err(|_| "Signature is not valid hex".to_string())?;

    let manifest = format!("id:{};request-id:{};ts:{};", data_id, request_id, ts);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("Invalid HMAC key: {}", e))?;
    mac.update(manifest.as_bytes());

    // Comparaison à temps constant, jamais un == sur les chaînes hex
    mac.verify_slice(&provided_bytes)
        .map_err(|_| "Signature mismatch".to_string())?;

    Ok(())
}

/// Parse "ts=<unix>,v1=<hex>" (ordre libre, champs inconnus ignorés)
fn parse_signature_header(header: &str) -> Result<(String, String), String> {
    let mut ts: Option<String> = None;
    let mut v1: Option<String> = None;

    for part in header.split(',') {
        let mut kv = part.splitn(2, '=');
        let key = kv.next().unwrap_or("").trim();
        let value = kv.next().unwrap_or("").trim();

        match key {
            "ts" => ts = Some(value.to_string()),
            "v1" => v1 = Some(value.to_string()),
            _ => {}
        }
    }

    match (ts, v1) {
        (Some(ts), Some(v1)) if !ts.is_empty() && !v1.is_empty() => Ok((ts, v1)),
        _ => Err("Malformed x-signature header (expected ts=...,v1=...)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(secret: &str, data_id: &str, request_id: &str, ts: &str) -> String {
        let manifest = format!("id:{};request-id:{};ts:{};", data_id, request_id, ts);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(manifest.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let sig = sign(SECRET, "12345", "req-1", "1700000000");
        let header = format!("ts=1700000000,v1={}", sig);

        assert!(verify_webhook_signature(SECRET, "12345", "req-1", &header).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = sign("wrong_secret", "12345", "req-1", "1700000000");
        let header = format!("ts=1700000000,v1={}", sig);

        assert!(verify_webhook_signature(SECRET, "12345", "req-1", &header).is_err());
    }

    #[test]
    fn test_tampered_payment_id_rejected() {
        // Signé pour le paiement 12345, présenté pour le 99999
        let sig = sign(SECRET, "12345", "req-1", "1700000000");
        let header = format!("ts=1700000000,v1={}", sig);

        assert!(verify_webhook_signature(SECRET, "99999", "req-1", &header).is_err());
    }

    #[test]
    fn test_tampered_timestamp_rejected() {
        let sig = sign(SECRET, "12345", "req-1", "1700000000");
        let header = format!("ts=1700009999,v1={}", sig);

        assert!(verify_webhook_signature(SECRET, "12345", "req-1", &header).is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_webhook_signature(SECRET, "12345", "req-1", "garbage").is_err());
        assert!(verify_webhook_signature(SECRET, "12345", "req-1", "").is_err());
        assert!(verify_webhook_signature(SECRET, "12345", "req-1", "ts=123").is_err());
        assert!(verify_webhook_signature(SECRET, "12345", "req-1", "v1=abcdef").is_err());
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let header = "ts=1700000000,v1=zznothexzz";
        assert!(verify_webhook_signature(SECRET, "12345", "req-1", header).is_err());
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        // Certains clients renvoient l'hex en majuscules
        let sig = sign(SECRET, "12345", "req-1", "1700000000").to_uppercase();
        let header = format!("ts=1700000000,v1={}", sig);

        assert!(verify_webhook_signature(SECRET, "12345", "req-1", &header).is_ok());
    }
}
