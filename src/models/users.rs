use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub email: String, // Unique - sert à résoudre le bénéficiaire d'un cadeau
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchase,

    #[sea_orm(has_many = "super::user_product::Entity")]
    UserProduct,

    #[sea_orm(has_many = "super::user_token::Entity")]
    UserToken,

    #[sea_orm(has_many = "super::activity_registration::Entity")]
    ActivityRegistration,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::user_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
