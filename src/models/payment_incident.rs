use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Trace d'un échec de compensation: le paiement a été capturé, le commit
// local a échoué ET le remboursement a échoué. Seul cas où le système ne
// peut pas se réparer seul - une intervention manuelle est requise.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_incident")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub payment_id: String,
    pub user_id: i32,
    pub amount_cents: i64,
    pub commit_error: String,
    pub refund_error: String,
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
