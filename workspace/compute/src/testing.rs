//! Fixtures shared by the unit tests of this crate.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Set,
};

use model::entities::{ingredient, recipe, tag, user};

use crate::recipe_writer::{RecipeDraft, create_recipe};
use crate::settings::Settings;
use crate::validation::IngredientAmount;

static FIXTURE_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    FIXTURE_ID.fetch_add(1, Ordering::SeqCst)
}

/// Fresh in-memory database with foreign keys on and every migration applied.
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await.unwrap();
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

pub async fn new_user(db: &DatabaseConnection) -> Result<user::Model, DbErr> {
    let id = next_id();
    user::ActiveModel {
        email: Set(format!("user_{}@example.com", id)),
        username: Set(format!("user_{:06}", id)),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        is_admin: Set(false),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn new_tag(db: &DatabaseConnection) -> Result<tag::Model, DbErr> {
    let id = next_id();
    tag::ActiveModel {
        name: Set(format!("Tag {}", id)),
        color: Set("#E26C2D".to_string()),
        slug: Set(format!("tag_{}", id)),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Return the ingredient with this name and unit, creating it when missing.
pub async fn ingredient_named(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
) -> Result<ingredient::Model, DbErr> {
    let existing = ingredient::Entity::find()
        .filter(ingredient::Column::Name.eq(name))
        .filter(ingredient::Column::MeasurementUnit.eq(unit))
        .one(db)
        .await?;
    if let Some(found) = existing {
        return Ok(found);
    }

    ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Build a valid draft for the given `(name, unit, amount)` lines and tags.
pub async fn draft_with(
    db: &DatabaseConnection,
    lines: &[(&str, &str, i32)],
    tags: &[i32],
) -> RecipeDraft {
    let mut ingredients = Vec::with_capacity(lines.len());
    for (name, unit, amount) in lines {
        let found = ingredient_named(db, name, unit).await.unwrap();
        ingredients.push(IngredientAmount {
            id: found.id,
            amount: *amount,
        });
    }

    RecipeDraft {
        name: format!("Recipe {}", next_id()),
        image: "data:image/png;base64,AAAA".to_string(),
        text: "Mix and serve.".to_string(),
        cooking_time: 15,
        ingredients,
        tags: tags.to_vec(),
    }
}

/// Publish a recipe with a fresh tag and the given ingredient lines.
pub async fn new_recipe(
    db: &DatabaseConnection,
    author: &user::Model,
    lines: &[(&str, &str, i32)],
) -> crate::error::Result<recipe::Model> {
    let tag = new_tag(db).await?;
    let draft = draft_with(db, lines, &[tag.id]).await;
    create_recipe(db, author, draft, &Settings::default()).await
}
