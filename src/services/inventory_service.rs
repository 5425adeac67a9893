use sea_orm::*;
use sea_orm::sea_query::Expr;
use chrono::Utc;

use crate::errors::PurchaseError;
use crate::models::{product, user_product};

pub struct InventoryService;

impl InventoryService {
    /// Vérifie qu'un produit peut être réservé pour `quantity` unités.
    /// Ordre des contrôles: bloqué, expiré, stock.
    /// Aucune mutation - c'est le chemin d'échec le moins cher.
    pub fn reserve(product: &product::Model, quantity: i32) -> Result<(), PurchaseError> {
        if product.is_blocked {
            return Err(PurchaseError::ProductBlocked);
        }

        if let Some(expires_at) = product.expires_at {
            if Utc::now() > expires_at {
                return Err(PurchaseError::ProductExpired);
            }
        }

        if !product.has_unlimited_quantity && quantity > product.quantity {
            return Err(PurchaseError::OutOfStock);
        }

        Ok(())
    }

    /// Quantité déjà possédée par un utilisateur pour un produit.
    /// IMPORTANT: somme de TOUTES les lignes user_product (les possessions
    /// par cadeau et par achat propre s'accumulent indépendamment).
    pub async fn owned_quantity<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
        product_id: i32,
    ) -> Result<i64, DbErr> {
        let rows = user_product::Entity::find()
            .filter(user_product::Column::UserId.eq(user_id))
            .filter(user_product::Column::ProductId.eq(product_id))
            .all(conn)
            .await?;

        Ok(rows.iter().map(|r| r.quantity as i64).sum())
    }

    /// Vérifie le plafond de possession du bénéficiaire
    pub fn check_ownership_cap(
        product: &product::Model,
        owned: i64,
        requested: i32,
    ) -> Result<(), PurchaseError> {
        if owned + requested as i64 > product.max_ownable_quantity as i64 {
            return Err(PurchaseError::OwnershipCapExceeded {
                owned,
                requested,
                max: product.max_ownable_quantity,
            });
        }

        Ok(())
    }

    /// Décrémente le stock dans la transaction ouverte (sauté si illimité).
    ///
    /// Décrément gardé: UPDATE ... SET quantity = quantity - n
    ///                  WHERE id = ? AND quantity >= n
    /// Zéro ligne affectée => OutOfStock. Deux acheteurs concurrents à la
    /// limite du stock se sérialisent sur la ligne produit au lieu de se
    /// marcher dessus avec un read-modify-write.
    pub async fn commit<C: ConnectionTrait>(
        txn: &C,
        product: &product::Model,
        quantity: i32,
    ) -> Result<(), PurchaseError> {
        if product.has_unlimited_quantity {
            return Ok(());
        }

        let result = product::Entity::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(quantity),
            )
            .filter(product::Column::Id.eq(product.id))
            .filter(product::Column::Quantity.gte(quantity))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(PurchaseError::OutOfStock);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_product() -> product::Model {
        product::Model {
            id: 1,
            event_id: 1,
            name: "Camiseta SDC".to_string(),
            price_cents: 5000,
            quantity: 10,
            has_unlimited_quantity: false,
            max_ownable_quantity: 2,
            is_event_access: false,
            is_activity_access: false,
            is_activity_token: false,
            is_physical_item: true,
            is_ticket_type: false,
            token_quantity: 0,
            expires_at: None,
            is_hidden: false,
            is_blocked: false,
        }
    }

    #[test]
    fn test_reserve_ok() {
        let product = test_product();
        assert!(InventoryService::reserve(&product, 10).is_ok());
    }

    #[test]
    fn test_reserve_out_of_stock() {
        let product = test_product();
        let result = InventoryService::reserve(&product, 11);
        assert!(matches!(result, Err(PurchaseError::OutOfStock)));
    }

    #[test]
    fn test_reserve_unlimited_ignores_quantity() {
        let mut product = test_product();
        product.quantity = 0;
        product.has_unlimited_quantity = true;
        assert!(InventoryService::reserve(&product, 500).is_ok());
    }

    #[test]
    fn test_reserve_blocked() {
        let mut product = test_product();
        product.is_blocked = true;
        let result = InventoryService::reserve(&product, 1);
        assert!(matches!(result, Err(PurchaseError::ProductBlocked)));
    }

    #[test]
    fn test_reserve_expired() {
        let mut product = test_product();
        product.expires_at = Some(Utc::now() - Duration::hours(1));
        let result = InventoryService::reserve(&product, 1);
        assert!(matches!(result, Err(PurchaseError::ProductExpired)));
    }

    #[test]
    fn test_reserve_not_yet_expired() {
        let mut product = test_product();
        product.expires_at = Some(Utc::now() + Duration::hours(1));
        assert!(InventoryService::reserve(&product, 1).is_ok());
    }

    #[test]
    fn test_blocked_takes_precedence_over_stock() {
        let mut product = test_product();
        product.is_blocked = true;
        product.quantity = 0;
        let result = InventoryService::reserve(&product, 1);
        assert!(matches!(result, Err(PurchaseError::ProductBlocked)));
    }

    #[test]
    fn test_ownership_cap_ok() {
        let product = test_product(); // max 2
        assert!(InventoryService::check_ownership_cap(&product, 0, 2).is_ok());
        assert!(InventoryService::check_ownership_cap(&product, 1, 1).is_ok());
    }

    #[test]
    fn test_ownership_cap_exceeded() {
        let product = test_product(); // max 2
        let result = InventoryService::check_ownership_cap(&product, 2, 1);
        assert!(matches!(
            result,
            Err(PurchaseError::OwnershipCapExceeded { owned: 2, requested: 1, max: 2 })
        ));
    }

    #[test]
    fn test_ownership_cap_counts_accumulated_rows() {
        // 1 acheté + 1 reçu en cadeau = 2 lignes qui s'additionnent
        let product = test_product(); // max 2
        let owned_from_two_rows: i64 = [1i64, 1i64].iter().sum();
        let result = InventoryService::check_ownership_cap(&product, owned_from_two_rows, 1);
        assert!(matches!(result, Err(PurchaseError::OwnershipCapExceeded { .. })));
    }

    #[tokio::test]
    async fn test_commit_decrements_when_guard_holds() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = InventoryService::commit(&db, &test_product(), 2).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_commit_zero_rows_affected_is_out_of_stock() {
        // Le garde-fou WHERE quantity >= n n'a retenu aucune ligne:
        // un acheteur concurrent a vidé le stock entre temps
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = InventoryService::commit(&db, &test_product(), 2).await;
        assert!(matches!(result, Err(PurchaseError::OutOfStock)));
    }

    #[tokio::test]
    async fn test_commit_unlimited_skips_update() {
        // Aucun résultat préparé: le moindre UPDATE ferait échouer le mock
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let mut product = test_product();
        product.has_unlimited_quantity = true;

        let result = InventoryService::commit(&db, &product, 500).await;
        assert!(result.is_ok());
    }
}
