use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_id: i32,
    pub name: String,
    pub price_cents: i32, // Prix unitaire en centimes (pas de décimales)

    // Stock
    pub quantity: i32,                // Invariant: >= 0 sauf si illimité
    pub has_unlimited_quantity: bool, // true = quantity ignorée
    pub max_ownable_quantity: i32,    // Plafond par bénéficiaire (somme des user_product)

    // Capacités du produit (un produit peut en combiner plusieurs)
    pub is_event_access: bool,
    pub is_activity_access: bool,
    pub is_activity_token: bool,
    pub is_physical_item: bool,
    pub is_ticket_type: bool,
    pub token_quantity: i32, // Jetons frappés par unité achetée

    // Fenêtre de vente et visibilité
    // expires_at doit être <= end_date de l'événement (validé à la création)
    pub expires_at: Option<DateTimeUtc>,
    pub is_hidden: bool,
    pub is_blocked: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,

    #[sea_orm(has_many = "super::access_target::Entity")]
    AccessTarget,

    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchase,

    #[sea_orm(has_many = "super::user_product::Entity")]
    UserProduct,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::access_target::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessTarget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
