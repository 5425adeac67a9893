use sea_orm::*;
use chrono::Utc;

use crate::errors::PurchaseError;
use crate::models::{access_target, activity, activity_registration, product, purchase, user_product, user_token, users};

pub struct EntitlementService;

/// Tout ce qu'un achat accompli a créé (pour la réponse et les logs)
pub struct GrantedEntitlements {
    pub user_product: user_product::Model,
    pub tokens: Vec<user_token::Model>,
    pub registrations: Vec<activity_registration::Model>,
}

impl EntitlementService {
    /// Résout le bénéficiaire d'un achat.
    /// Sans cadeau: l'acheteur lui-même. Avec cadeau: le destinataire par
    /// email - RecipientNotFound s'il n'existe pas, SelfGiftNotAllowed si
    /// c'est l'email de l'acheteur.
    pub async fn resolve_beneficiary<C: ConnectionTrait>(
        conn: &C,
        buyer: &users::Model,
        is_gift: bool,
        recipient_email: Option<&str>,
    ) -> Result<users::Model, PurchaseError> {
        if !is_gift {
            return Ok(buyer.clone());
        }

        let email = match recipient_email {
            Some(e) if !e.trim().is_empty() => e.trim().to_lowercase(),
            _ => return Err(PurchaseError::MissingGiftRecipient),
        };

        if email == buyer.email.trim().to_lowercase() {
            return Err(PurchaseError::SelfGiftNotAllowed);
        }

        users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(conn)
            .await?
            .ok_or(PurchaseError::RecipientNotFound(email))
    }

    /// Jetons à frapper pour un achat: token_quantity par unité achetée,
    /// zéro si le produit n'est pas porteur de jetons
    pub fn tokens_to_mint(product: &product::Model, quantity: i32) -> i32 {
        if product.is_activity_token {
            product.token_quantity * quantity
        } else {
            0
        }
    }

    /// Activités d'un événement couvertes par un accès événement:
    /// obligatoires OU gratuites. Les activités payantes non obligatoires
    /// sont exclues - elles exigent leur propre jeton ou achat.
    pub fn eligible_event_activities(activities: Vec<activity::Model>) -> Vec<activity::Model> {
        activities
            .into_iter()
            .filter(|a| a.is_mandatory || !a.has_fee)
            .collect()
    }

    /// Crée les droits issus d'un achat accompli, dans la transaction
    /// ouverte: ligne de possession, jetons, accès aux activités.
    pub async fn grant<C: ConnectionTrait>(
        txn: &C,
        purchase: &purchase::Model,
        product: &product::Model,
        beneficiary_id: i32,
    ) -> Result<GrantedEntitlements, PurchaseError> {
        // 1. Créditer le bénéficiaire
        let owned = user_product::ActiveModel {
            user_id: Set(beneficiary_id),
            product_id: Set(product.id),
            purchase_id: Set(purchase.id),
            quantity: Set(purchase.quantity),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        // 2. Frapper les jetons (une ligne par jeton, tous inutilisés)
        let mut tokens = Vec::new();
        for _ in 0..Self::tokens_to_mint(product, purchase.quantity) {
            let token = user_token::ActiveModel {
                user_id: Set(beneficiary_id),
                event_id: Set(product.event_id),
                user_product_id: Set(owned.id),
                is_used: Set(false),
                used_at: Set(None),
                used_for_id: Set(None),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            tokens.push(token);
        }

        // 3. Dérouler les cibles d'accès du produit
        let targets = access_target::Entity::find()
            .filter(access_target::Column::ProductId.eq(product.id))
            .all(txn)
            .await?;

        let mut registrations = Vec::new();
        for target in targets {
            if !target.is_event {
                // Cible directe: une seule activité
                if let Some(reg) =
                    Self::register_for_activity(txn, target.target_id, beneficiary_id, "product")
                        .await?
                {
                    registrations.push(reg);
                }
            } else {
                // Cible événement: fan-out sur la liste d'activités COURANTE,
                // recalculée à chaque fulfillment (pas mémoïsée sur le
                // produit) - les activités ajoutées après la création du
                // produit sont donc couvertes aussi
                let activities = activity::Entity::find()
                    .filter(activity::Column::EventId.eq(target.target_id))
                    .all(txn)
                    .await?;

                for act in Self::eligible_event_activities(activities) {
                    if let Some(reg) =
                        Self::register_for_activity(txn, act.id, beneficiary_id, "event").await?
                    {
                        registrations.push(reg);
                    }
                }
            }
        }

        Ok(GrantedEntitlements {
            user_product: owned,
            tokens,
            registrations,
        })
    }

    /// Inscrit un utilisateur à une activité. Idempotent: si la paire
    /// (activity, user) existe déjà, no-op (None) - jamais une erreur.
    pub async fn register_for_activity<C: ConnectionTrait>(
        txn: &C,
        activity_id: i32,
        user_id: i32,
        access_method: &str,
    ) -> Result<Option<activity_registration::Model>, PurchaseError> {
        let existing = activity_registration::Entity::find()
            .filter(activity_registration::Column::ActivityId.eq(activity_id))
            .filter(activity_registration::Column::UserId.eq(user_id))
            .one(txn)
            .await?;

        if existing.is_some() {
            return Ok(None);
        }

        let registration = activity_registration::ActiveModel {
            activity_id: Set(activity_id),
            user_id: Set(user_id),
            access_method: Set(access_method.to_string()),
            registered_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Ok(Some(registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn activity(id: i32, is_mandatory: bool, has_fee: bool) -> activity::Model {
        activity::Model {
            id,
            event_id: 1,
            name: format!("Activity {}", id),
            is_mandatory,
            has_fee,
        }
    }

    fn token_product(token_quantity: i32) -> product::Model {
        product::Model {
            id: 1,
            event_id: 1,
            name: "Token pack".to_string(),
            price_cents: 1500,
            quantity: 100,
            has_unlimited_quantity: false,
            max_ownable_quantity: 10,
            is_event_access: false,
            is_activity_access: false,
            is_activity_token: true,
            is_physical_item: false,
            is_ticket_type: false,
            token_quantity,
            expires_at: None,
            is_hidden: false,
            is_blocked: false,
        }
    }

    #[test]
    fn test_event_fan_out_selection() {
        // Couvertes: obligatoires (même payantes) et gratuites.
        // Exclues: payantes non obligatoires.
        let activities = vec![
            activity(1, true, false),  // obligatoire gratuite -> oui
            activity(2, true, true),   // obligatoire payante  -> oui
            activity(3, false, false), // libre gratuite       -> oui
            activity(4, false, true),  // libre payante        -> NON
        ];

        let eligible = EntitlementService::eligible_event_activities(activities);
        let ids: Vec<i32> = eligible.iter().map(|a| a.id).collect();

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_event_fan_out_empty_event() {
        let eligible = EntitlementService::eligible_event_activities(vec![]);
        assert!(eligible.is_empty());
    }

    #[test]
    fn test_tokens_to_mint_multiplies_by_quantity() {
        let product = token_product(2);
        assert_eq!(EntitlementService::tokens_to_mint(&product, 3), 6);
    }

    #[test]
    fn test_tokens_to_mint_zero_for_non_token_product() {
        let mut product = token_product(2);
        product.is_activity_token = false;
        assert_eq!(EntitlementService::tokens_to_mint(&product, 3), 0);
    }

    fn buyer() -> users::Model {
        users::Model {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_beneficiary_defaults_to_buyer() {
        // Sans cadeau, aucune requête BD: le mock sans résultats le prouve
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = EntitlementService::resolve_beneficiary(&db, &buyer(), false, None)
            .await
            .unwrap();

        assert_eq!(result.id, buyer().id);
    }

    #[tokio::test]
    async fn test_gift_requires_recipient_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let missing = EntitlementService::resolve_beneficiary(&db, &buyer(), true, None).await;
        assert!(matches!(missing, Err(PurchaseError::MissingGiftRecipient)));

        let blank =
            EntitlementService::resolve_beneficiary(&db, &buyer(), true, Some("   ")).await;
        assert!(matches!(blank, Err(PurchaseError::MissingGiftRecipient)));
    }

    #[tokio::test]
    async fn test_self_gift_rejected_case_insensitively() {
        // " Ana@Example.COM " est l'email de l'acheteur modulo casse/espaces
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result =
            EntitlementService::resolve_beneficiary(&db, &buyer(), true, Some(" Ana@Example.COM "))
                .await;

        assert!(matches!(result, Err(PurchaseError::SelfGiftNotAllowed)));
    }

    #[tokio::test]
    async fn test_gift_resolves_recipient_by_email() {
        let recipient = users::Model {
            id: 2,
            username: "bruno".to_string(),
            email: "bruno@example.com".to_string(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![recipient.clone()]])
            .into_connection();

        let result = EntitlementService::resolve_beneficiary(
            &db,
            &buyer(),
            true,
            Some("bruno@example.com"),
        )
        .await
        .unwrap();

        assert_eq!(result.id, recipient.id);
    }

    #[tokio::test]
    async fn test_gift_to_unknown_email_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .into_connection();

        let result = EntitlementService::resolve_beneficiary(
            &db,
            &buyer(),
            true,
            Some("ghost@example.com"),
        )
        .await;

        match result {
            Err(PurchaseError::RecipientNotFound(email)) => {
                assert_eq!(email, "ghost@example.com");
            }
            other => panic!("Expected RecipientNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_activity_registration_is_noop() {
        let existing = activity_registration::Model {
            id: 7,
            activity_id: 3,
            user_id: 1,
            access_method: "event".to_string(),
            registered_at: Utc::now(),
        };
        // Seule la recherche est servie: un INSERT ferait échouer le mock
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .into_connection();

        let result = EntitlementService::register_for_activity(&db, 3, 1, "event")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_first_activity_registration_creates_one_row() {
        let created = activity_registration::Model {
            id: 8,
            activity_id: 3,
            user_id: 1,
            access_method: "product".to_string(),
            registered_at: Utc::now(),
        };
        // Recherche vide, puis la ligne insérée (RETURNING)
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<activity_registration::Model>::new(),
                vec![created.clone()],
            ])
            .into_connection();

        let result = EntitlementService::register_for_activity(&db, 3, 1, "product")
            .await
            .unwrap();

        let registration = result.expect("registration should be created");
        assert_eq!(registration.activity_id, 3);
        assert_eq!(registration.access_method, "product");
    }
}
