use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Enregistrement immuable d'un achat. Une ligne par tentative de règlement
// qui atteint l'étape de fulfillment; jamais modifiée ensuite (sauf
// métadonnées de paiement posées dans la même transaction).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,    // Acheteur (payeur), pas forcément le bénéficiaire
    pub product_id: i32,
    pub quantity: i32,
    pub total_cents: i64, // price_cents x quantity au moment de l'achat
    pub is_gift: bool,
    pub gift_recipient_email: Option<String>,
    pub payment_id: Option<String>, // Id de paiement côté passerelle
    pub purchased_at: DateTimeUtc,
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

    #[sea_orm(has_many = "super::user_product::Entity")]
    UserProduct,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
