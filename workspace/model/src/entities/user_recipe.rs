use super::{recipe, user};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which personal list a saved recipe belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum RecipeListKind {
    #[sea_orm(string_value = "favorite")]
    Favorite,
    #[sea_orm(string_value = "shopping_cart")]
    ShoppingCart,
}

impl RecipeListKind {
    /// Human readable list name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            RecipeListKind::Favorite => "favorites",
            RecipeListKind::ShoppingCart => "shopping cart",
        }
    }
}

/// A recipe saved by a user to one of their lists. Favorites and the shopping
/// cart share this table and are told apart by `kind`.
/// (user_id, recipe_id, kind) is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_recipes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub recipe_id: i32,
    pub kind: RecipeListKind,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "recipe::Entity",
        from = "Column::RecipeId",
        to = "recipe::Column::Id",
        on_delete = "Cascade"
    )]
    Recipe,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
