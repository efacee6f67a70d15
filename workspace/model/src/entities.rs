//! SeaORM entities for the recipe-sharing service.
//!
//! Reference data (tags, ingredients), the recipe aggregate with its join rows,
//! and the per-user relations (saved recipes, subscriptions, API tokens).

pub mod auth_token;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod subscription;
pub mod tag;
pub mod user;
pub mod user_recipe;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::auth_token::Entity as AuthToken;
    pub use super::ingredient::Entity as Ingredient;
    pub use super::recipe::Entity as Recipe;
    pub use super::recipe_ingredient::Entity as RecipeIngredient;
    pub use super::recipe_tag::Entity as RecipeTag;
    pub use super::subscription::Entity as Subscription;
    pub use super::tag::Entity as Tag;
    pub use super::user::Entity as User;
    pub use super::user_recipe::Entity as UserRecipe;
    pub use super::user_recipe::RecipeListKind;
}
