// ============================================================================
// FLUX PIX (règlement asynchrone en deux phases)
// ============================================================================
//
// Pix règle hors bande: le fulfillment ne peut pas avoir lieu au moment de
// la requête.
//
//   Phase requête : validation identique à l'achat carte, création du
//                   paiement Pix côté passerelle, ligne d'attente
//                   pending_pix_purchase, QR retourné au client.
//   Phase webhook : signature vérifiée, statut relu auprès de la
//                   passerelle; si 'approved', MÊME séquence de fulfillment
//                   que l'achat carte dans une transaction, puis
//                   suppression de la ligne d'attente.
//
// Pas de remboursement ici: la charge externe est définitive quoi qu'il
// arrive; un échec de fulfillment annule tout et laisse la ligne d'attente
// en place pour retry/inspection.
// ============================================================================

use sea_orm::*;
use chrono::Utc;

use crate::errors::PurchaseError;
use crate::models::dto::{PixCheckoutResponse, PixPurchaseRequest, PurchaseReceiptResponse};
use crate::models::{event, pending_pix_purchase, product, users};
use crate::services::entitlement_service::EntitlementService;
use crate::services::payment_gateway::{Payer, PaymentGateway};
use crate::services::purchase_service::{PurchaseService, ValidatedPurchase};

pub struct PixService;

impl PixService {
    /// Phase requête: valide comme un achat carte, mais au lieu de capturer,
    /// crée le paiement Pix et une ligne d'attente. Le stock n'est PAS
    /// engagé tant que le webhook n'a pas confirmé les fonds.
    pub async fn request(
        db: &DatabaseConnection,
        gateway: &dyn PaymentGateway,
        buyer_id: i32,
        event_slug: &str,
        request: PixPurchaseRequest,
    ) -> Result<PixCheckoutResponse, PurchaseError> {
        let validated = PurchaseService::validate(
            db,
            buyer_id,
            event_slug,
            request.product_id,
            request.quantity,
            request.is_gift,
            request.gift_recipient_email.as_deref(),
        )
        .await?;

        let external_reference = format!("{}:{}", validated.event.slug, validated.buyer.id);
        let payer = Payer {
            email: validated.buyer.email.clone(),
        };

        let pix = gateway
            .create_pix_payment(validated.total_cents, &payer, &external_reference)
            .await?;

        let pending = pending_pix_purchase::ActiveModel {
            payment_id: Set(pix.payment_id.clone()),
            user_id: Set(validated.buyer.id),
            product_id: Set(validated.product.id),
            quantity: Set(validated.quantity),
            is_gift: Set(validated.is_gift),
            gift_recipient_email: Set(validated.gift_recipient_email.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Err(e) = pending.insert(db).await {
            // Le QR existe déjà côté passerelle mais les fonds ne bougent
            // que si le client le paie: on trace l'id et on échoue
            eprintln!(
                "⚠️  Failed to stage pending Pix purchase for payment {}: {}",
                pix.payment_id, e
            );
            return Err(e.into());
        }

        println!(
            "📄 Pix payment {} staged: user {} product {} x{}",
            pix.payment_id, validated.buyer.id, validated.product.id, validated.quantity
        );

        Ok(PixCheckoutResponse {
            payment_id: pix.payment_id,
            qr_code: pix.qr_code,
            qr_code_base64: pix.qr_code_base64,
            ticket_url: pix.ticket_url,
        })
    }

    /// Phase webhook: finalise un paiement Pix confirmé.
    ///
    /// Idempotent: si aucune ligne d'attente ne correspond (callback
    /// dupliqué, achat déjà finalisé), no-op silencieux -> Ok(None).
    /// La suppression transactionnelle de la ligne d'attente porte aussi
    /// l'idempotence sous concurrence: un second callback pour le même
    /// payment_id ne trouve plus rien à finaliser.
    pub async fn finalize(
        db: &DatabaseConnection,
        payment_id: &str,
    ) -> Result<Option<PurchaseReceiptResponse>, PurchaseError> {
        let pending = match pending_pix_purchase::Entity::find()
            .filter(pending_pix_purchase::Column::PaymentId.eq(payment_id))
            .one(db)
            .await?
        {
            Some(pending) => pending,
            None => return Ok(None),
        };

        // Re-résoudre produit/événement/bénéficiaire au moment du
        // fulfillment (le fan-out événement aussi est recalculé plus bas)
        let product = product::Entity::find_by_id(pending.product_id)
            .one(db)
            .await?
            .ok_or(PurchaseError::ProductNotFound(pending.product_id))?;

        let event = event::Entity::find_by_id(product.event_id)
            .one(db)
            .await?
            .ok_or_else(|| PurchaseError::EventNotFound(product.event_id.to_string()))?;

        let buyer = users::Entity::find_by_id(pending.user_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                PurchaseError::Db(DbErr::RecordNotFound(format!("user {}", pending.user_id)))
            })?;

        let beneficiary = EntitlementService::resolve_beneficiary(
            db,
            &buyer,
            pending.is_gift,
            pending.gift_recipient_email.as_deref(),
        )
        .await?;

        let total_cents = product.price_cents as i64 * pending.quantity as i64;
        let validated = ValidatedPurchase {
            event,
            product: product.clone(),
            buyer,
            beneficiary,
            quantity: pending.quantity,
            total_cents,
            is_gift: pending.is_gift,
            gift_recipient_email: pending.gift_recipient_email.clone(),
        };

        // Même séquence de fulfillment que l'achat carte, une seule
        // transaction; en cas d'échec tout est annulé et la ligne
        // d'attente reste intacte
        let txn = db.begin().await?;

        let outcome = match PurchaseService::fulfill(&txn, &validated, Some(payment_id.to_string()))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                txn.rollback().await.ok();
                return Err(e);
            }
        };

        if let Err(e) = pending_pix_purchase::Entity::delete_by_id(pending.id)
            .exec(&txn)
            .await
        {
            txn.rollback().await.ok();
            return Err(e.into());
        }

        txn.commit().await?;

        println!(
            "✅ Pix purchase {} finalized: user {} product {} x{} (payment {})",
            outcome.purchase.id,
            validated.buyer.id,
            validated.product.id,
            validated.quantity,
            payment_id
        );

        Ok(Some(PurchaseReceiptResponse {
            purchase_id: outcome.purchase.id,
            product_id: validated.product.id,
            beneficiary_id: validated.beneficiary.id,
            quantity: validated.quantity,
            total_cents: validated.total_cents,
            payment_id: payment_id.to_string(),
            tokens_minted: outcome.entitlements.tokens.len(),
            activities_registered: outcome.entitlements.registrations.len(),
        }))
    }
}
