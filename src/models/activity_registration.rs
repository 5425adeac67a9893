use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Accès d'un utilisateur à une activité. Unique par (activity, user):
// une création en doublon est un no-op, jamais une erreur.
// access_method trace l'origine de l'accès pour l'audit:
//   'event'   : accordé par un produit d'accès événement (fan-out)
//   'product' : accordé par une cible d'accès directe du produit
//   'token'   : accordé en dépensant un jeton (flux check-in, externe)
//   'direct'  : accordé manuellement par un admin (externe)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_registration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub activity_id: i32,
    pub user_id: i32,
    pub access_method: String,
    pub registered_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::activity::Entity",
        from = "Column::ActivityId",
        to = "super::activity::Column::Id"
    )]
    Activity,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
