use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Achat Pix en attente: créé à la demande de paiement, supprimé à la
// finalisation (webhook 'approved') ou à l'abandon. Fait le pont entre
// "paiement demandé" et "paiement confirmé" puisque Pix règle hors bande.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_pix_purchase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub payment_id: String, // Id de paiement émis par la passerelle
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub is_gift: bool,
    pub gift_recipient_email: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
