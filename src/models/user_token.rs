use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Un jeton d'activité individuel - une ligne par jeton, pas un compteur.
// Exactement token_quantity x quantity sont frappés par achat d'un produit
// à jetons. La consommation (is_used/used_at/used_for_id) appartient au
// flux de check-in des activités, pas au moteur d'achat.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_token")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub event_id: i32,
    pub user_product_id: i32,
    pub is_used: bool,
    pub used_at: Option<DateTimeUtc>,
    pub used_for_id: Option<i32>, // activity.id où le jeton a été dépensé
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
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,

    #[sea_orm(
        belongs_to = "super::user_product::Entity",
        from = "Column::UserProductId",
        to = "super::user_product::Column::Id"
    )]
    UserProduct,
}

impl Related<super::user_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProduct.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
