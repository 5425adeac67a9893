// ============================================================================
// COORDINATEUR DE TRANSACTION D'ACHAT (règlement carte synchrone)
// ============================================================================
//
// Machine à états par tentative d'achat:
//
//   Validating -> LocalMutating -> ExternalCapturing -> Committing
//       -> Fulfilled
//       -> Compensating -> { Refunded | ManualInterventionRequired }
//
// Les mutations locales précèdent l'appel externe: on échoue vite sur les
// problèmes d'intégrité sans jamais toucher la passerelle. Le prix de ce
// choix: un échec de commit APRÈS une capture réussie exige le filet de
// sécurité remboursement (phase Compensating). Le remboursement n'est
// tenté qu'UNE SEULE fois par commit échoué, jamais spéculativement.
// ============================================================================

use sea_orm::*;
use chrono::Utc;

use crate::errors::PurchaseError;
use crate::models::dto::{CreatePurchaseRequest, PurchaseReceiptResponse};
use crate::models::{event, event_registration, payment_incident, product, purchase, users};
use crate::services::entitlement_service::EntitlementService;
use crate::services::inventory_service::InventoryService;
use crate::services::payment_gateway::{OrderResult, Payer, PaymentGateway};

pub struct PurchaseService;

/// Résultat de la phase Validating - tout ce qu'il faut pour muter,
/// aucune mutation encore effectuée
pub struct ValidatedPurchase {
    pub event: event::Model,
    pub product: product::Model,
    pub buyer: users::Model,
    pub beneficiary: users::Model,
    pub quantity: i32,
    pub total_cents: i64,
    pub is_gift: bool,
    pub gift_recipient_email: Option<String>,
}

/// Lignes créées par la séquence de fulfillment (transaction encore ouverte)
pub struct FulfillmentOutcome {
    pub purchase: purchase::Model,
    pub entitlements: crate::services::entitlement_service::GrantedEntitlements,
}

/// Issue de la phase Compensating (voir run_compensation)
#[derive(Debug)]
pub enum CompensationOutcome {
    Refunded,
    RefundFailed { refund_error: String },
}

impl PurchaseService {
    /// Phase Validating: résolution + contrôles, sans aucune mutation.
    /// Tout échec ici aborte avant que quoi que ce soit n'ait bougé.
    pub async fn validate(
        db: &DatabaseConnection,
        buyer_id: i32,
        event_slug: &str,
        product_id: i32,
        quantity: i32,
        is_gift: bool,
        recipient_email: Option<&str>,
    ) -> Result<ValidatedPurchase, PurchaseError> {
        // 1. Résoudre l'événement et le produit
        let event = event::Entity::find()
            .filter(event::Column::Slug.eq(event_slug))
            .one(db)
            .await?
            .ok_or_else(|| PurchaseError::EventNotFound(event_slug.to_string()))?;

        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or(PurchaseError::ProductNotFound(product_id))?;

        if product.event_id != event.id {
            return Err(PurchaseError::ProductNotInEvent);
        }

        let buyer = users::Entity::find_by_id(buyer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                PurchaseError::Db(DbErr::RecordNotFound(format!("user {}", buyer_id)))
            })?;

        // 2. L'acheteur doit être inscrit à l'événement
        let registered = event_registration::Entity::find()
            .filter(event_registration::Column::EventId.eq(event.id))
            .filter(event_registration::Column::UserId.eq(buyer_id))
            .one(db)
            .await?
            .is_some();

        if !registered {
            return Err(PurchaseError::NotRegisteredToEvent);
        }

        // 3. Contrôles d'inventaire (bloqué / expiré / stock)
        InventoryService::reserve(&product, quantity)?;

        // 4. Bénéficiaire, puis plafond de possession DU BÉNÉFICIAIRE
        let beneficiary =
            EntitlementService::resolve_beneficiary(db, &buyer, is_gift, recipient_email).await?;

        let owned = InventoryService::owned_quantity(db, beneficiary.id, product.id).await?;
        InventoryService::check_ownership_cap(&product, owned, quantity)?;

        let total_cents = product.price_cents as i64 * quantity as i64;

        Ok(ValidatedPurchase {
            event,
            product,
            buyer,
            beneficiary,
            quantity,
            total_cents,
            is_gift,
            gift_recipient_email: recipient_email.map(|e| e.trim().to_lowercase()),
        })
    }

    /// Séquence de fulfillment partagée (carte et Pix): ligne d'achat,
    /// décrément du stock, droits - dans la transaction ouverte `txn`.
    pub async fn fulfill<C: ConnectionTrait>(
        txn: &C,
        validated: &ValidatedPurchase,
        payment_id: Option<String>,
    ) -> Result<FulfillmentOutcome, PurchaseError> {
        let purchase = purchase::ActiveModel {
            user_id: Set(validated.buyer.id),
            product_id: Set(validated.product.id),
            quantity: Set(validated.quantity),
            total_cents: Set(validated.total_cents),
            is_gift: Set(validated.is_gift),
            gift_recipient_email: Set(validated.gift_recipient_email.clone()),
            payment_id: Set(payment_id),
            purchased_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        InventoryService::commit(txn, &validated.product, validated.quantity).await?;

        let entitlements =
            EntitlementService::grant(txn, &purchase, &validated.product, validated.beneficiary.id)
                .await?;

        Ok(FulfillmentOutcome {
            purchase,
            entitlements,
        })
    }

    /// Achat carte complet, de Validating à Fulfilled (ou échec typé).
    pub async fn purchase(
        db: &DatabaseConnection,
        gateway: &dyn PaymentGateway,
        buyer_id: i32,
        event_slug: &str,
        request: CreatePurchaseRequest,
    ) -> Result<PurchaseReceiptResponse, PurchaseError> {
        // --- Validating ---
        if request.payment.installments < 1 {
            return Err(PurchaseError::InvalidPayment(
                "Installments must be at least 1".to_string(),
            ));
        }
        if request.payment.token.trim().is_empty() {
            return Err(PurchaseError::InvalidPayment(
                "Card token is required".to_string(),
            ));
        }

        let validated = Self::validate(
            db,
            buyer_id,
            event_slug,
            request.product_id,
            request.quantity,
            request.is_gift,
            request.gift_recipient_email.as_deref(),
        )
        .await?;

        // --- LocalMutating: transaction ouverte, rien de commité ---
        let txn = db.begin().await?;

        let outcome = match Self::fulfill(&txn, &validated, None).await {
            Ok(outcome) => outcome,
            Err(e) => {
                txn.rollback().await.ok();
                return Err(e);
            }
        };

        // --- ExternalCapturing ---
        // Référence externe encodant événement + acheteur pour la
        // réconciliation côté passerelle
        let external_reference = format!("{}:{}", validated.event.slug, validated.buyer.id);
        let payer = Payer {
            email: request
                .payment
                .payer_email
                .clone()
                .unwrap_or_else(|| validated.buyer.email.clone()),
        };

        let order = match gateway
            .create_order(
                validated.total_cents,
                &external_reference,
                &request.payment,
                &payer,
            )
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // Aucun fonds déplacé: rollback simple, pas de compensation
                txn.rollback().await.ok();
                return Err(e);
            }
        };

        // Lier l'id de paiement à la ligne d'achat avant le commit
        let mut active: purchase::ActiveModel = outcome.purchase.clone().into();
        active.payment_id = Set(Some(order.id.clone()));
        let purchase_row = match active.update(&txn).await {
            Ok(row) => row,
            Err(e) => {
                txn.rollback().await.ok();
                return Err(Self::compensate(db, gateway, &order, &validated, &e.to_string()).await);
            }
        };

        // --- Committing ---
        if let Err(e) = txn.commit().await {
            return Err(Self::compensate(db, gateway, &order, &validated, &e.to_string()).await);
        }

        // --- Fulfilled ---
        println!(
            "✅ Purchase {} fulfilled: user {} product {} x{} (payment {})",
            purchase_row.id, validated.buyer.id, validated.product.id, validated.quantity, order.id
        );

        Ok(PurchaseReceiptResponse {
            purchase_id: purchase_row.id,
            product_id: validated.product.id,
            beneficiary_id: validated.beneficiary.id,
            quantity: validated.quantity,
            total_cents: validated.total_cents,
            payment_id: order.id,
            tokens_minted: outcome.entitlements.tokens.len(),
            activities_registered: outcome.entitlements.registrations.len(),
        })
    }

    /// Phase Compensating: la capture a réussi mais le commit local a
    /// échoué. Tente le remboursement (une seule fois) et traduit l'issue
    /// en erreur typée; persiste l'incident si le remboursement échoue.
    async fn compensate(
        db: &DatabaseConnection,
        gateway: &dyn PaymentGateway,
        order: &OrderResult,
        validated: &ValidatedPurchase,
        commit_error: &str,
    ) -> PurchaseError {
        eprintln!(
            "⚠️  Commit failed after capture (payment {}): {}",
            order.id, commit_error
        );

        match Self::run_compensation(gateway, &order.id).await {
            CompensationOutcome::Refunded => {
                eprintln!(
                    "✅ Refund issued for payment {} ({} cents)",
                    order.id, order.total_amount_cents
                );
                PurchaseError::RolledBackWithRefund
            }
            CompensationOutcome::RefundFailed { refund_error } => {
                eprintln!(
                    "🚨 MANUAL INTERVENTION REQUIRED: payment {} user {} amount {} cents / commit: {} / refund: {}",
                    order.id, validated.buyer.id, order.total_amount_cents, commit_error, refund_error
                );

                // Trace persistée pour le suivi opérateur; un échec ici ne
                // doit pas masquer l'erreur d'origine
                let incident = payment_incident::ActiveModel {
                    payment_id: Set(order.id.clone()),
                    user_id: Set(validated.buyer.id),
                    amount_cents: Set(order.total_amount_cents),
                    commit_error: Set(commit_error.to_string()),
                    refund_error: Set(refund_error),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                if let Err(e) = incident.insert(db).await {
                    eprintln!("⚠️  Failed to persist payment incident: {}", e);
                }

                PurchaseError::ManualInterventionRequired
            }
        }
    }

    /// Décision de compensation pure vis-à-vis du stockage: exactement une
    /// tentative de remboursement, issue traduite en CompensationOutcome.
    pub async fn run_compensation(
        gateway: &dyn PaymentGateway,
        payment_id: &str,
    ) -> CompensationOutcome {
        match gateway.create_refund(payment_id).await {
            Ok(_) => CompensationOutcome::Refunded,
            Err(e) => CompensationOutcome::RefundFailed {
                refund_error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::dto::CardPaymentData;
    use crate::services::payment_gateway::{PaymentInfo, PixResult, RefundResult};

    /// Passerelle factice: compte les appels, remboursement paramétrable
    struct MockGateway {
        refund_calls: AtomicUsize,
        fail_refund: bool,
    }

    impl MockGateway {
        fn new(fail_refund: bool) -> Self {
            MockGateway {
                refund_calls: AtomicUsize::new(0),
                fail_refund,
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_order(
            &self,
            amount_cents: i64,
            _external_reference: &str,
            _payment: &CardPaymentData,
            _payer: &Payer,
        ) -> Result<OrderResult, PurchaseError> {
            Ok(OrderResult {
                id: "pay_123".to_string(),
                status: "approved".to_string(),
                total_amount_cents: amount_cents,
            })
        }

        async fn create_refund(&self, payment_id: &str) -> Result<RefundResult, PurchaseError> {
            self.refund_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_refund {
                Err(PurchaseError::Gateway("refund rejected".to_string()))
            } else {
                Ok(RefundResult {
                    id: format!("refund_{}", payment_id),
                })
            }
        }

        async fn create_pix_payment(
            &self,
            _amount_cents: i64,
            _payer: &Payer,
            _external_reference: &str,
        ) -> Result<PixResult, PurchaseError> {
            unimplemented!("not used in these tests")
        }

        async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo, PurchaseError> {
            Ok(PaymentInfo {
                id: payment_id.to_string(),
                status: "approved".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_compensation_refund_success() {
        let gateway = MockGateway::new(false);

        let outcome = PurchaseService::run_compensation(&gateway, "pay_123").await;

        assert!(matches!(outcome, CompensationOutcome::Refunded));
        // Exactement une tentative de remboursement
        assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compensation_refund_failure_requires_manual_intervention() {
        let gateway = MockGateway::new(true);

        let outcome = PurchaseService::run_compensation(&gateway, "pay_123").await;

        match outcome {
            CompensationOutcome::RefundFailed { refund_error } => {
                assert!(refund_error.contains("refund rejected"));
            }
            other => panic!("Expected RefundFailed, got {:?}", other),
        }
        // Toujours une seule tentative, même en échec (pas de retry aveugle)
        assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compensation_is_never_invoked_speculatively() {
        // Un achat qui échoue en validation ne doit émettre AUCUN appel
        // de remboursement
        let gateway = MockGateway::new(false);

        // Simule le chemin d'échec de validation: la passerelle n'est
        // jamais sollicitée avant ExternalCapturing
        let product = crate::models::product::Model {
            id: 1,
            event_id: 1,
            name: "Ingresso".to_string(),
            price_cents: 10000,
            quantity: 0,
            has_unlimited_quantity: false,
            max_ownable_quantity: 1,
            is_event_access: true,
            is_activity_access: false,
            is_activity_token: false,
            is_physical_item: false,
            is_ticket_type: true,
            token_quantity: 0,
            expires_at: None,
            is_hidden: false,
            is_blocked: false,
        };

        assert!(InventoryService::reserve(&product, 1).is_err());
        assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 0);
    }
}
