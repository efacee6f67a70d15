//! Recipe write path.
//!
//! A recipe is stored as one `recipes` row plus its `recipes_ingredients` and
//! `recipes_tags` join rows. Every write validates the whole submission first
//! and then touches all three tables inside a single transaction.

use std::collections::HashMap;

use chrono::Utc;
use model::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag, user};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{ComputeError, Result};
use crate::settings::{IngredientMergeMode, Settings};
use crate::validation::{
    IngredientAmount, validate_cooking_time, validate_ingredients, validate_tags,
};

/// Everything needed to publish a new recipe.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i32>,
}

/// A partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<i32>>,
}

/// Only the author and admins may change a recipe.
pub fn can_edit(editor: &user::Model, recipe: &recipe::Model) -> bool {
    editor.is_admin || editor.id == recipe.author_id
}

fn ensure_can_edit(editor: &user::Model, recipe: &recipe::Model) -> Result<()> {
    if can_edit(editor, recipe) {
        return Ok(());
    }
    warn!(
        "User {} tried to modify recipe {} of user {}",
        editor.id, recipe.id, recipe.author_id
    );
    Err(ComputeError::Forbidden(
        "You cannot modify another user's recipe".to_string(),
    ))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ComputeError::validation("name", "Name must not be empty"));
    }
    if name.chars().count() > 200 {
        return Err(ComputeError::validation(
            "name",
            "Name must be at most 200 characters",
        ));
    }
    Ok(())
}

/// Fail unless every id in `ingredients` names a catalog ingredient.
/// The ids must already be pairwise distinct.
pub async fn ensure_ingredients_exist<C: ConnectionTrait>(
    db: &C,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    let ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    let found = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids.clone()))
        .count(db)
        .await?;

    if found != ids.len() as u64 {
        debug!("Unknown ingredient among {:?}", ids);
        return Err(ComputeError::validation(
            "ingredients",
            "Unknown ingredient id",
        ));
    }
    Ok(())
}

/// Fail unless every id in `tags` names a catalog tag.
/// The ids must already be pairwise distinct.
pub async fn ensure_tags_exist<C: ConnectionTrait>(db: &C, tags: &[i32]) -> Result<()> {
    let found = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tags.to_vec()))
        .count(db)
        .await?;

    if found != tags.len() as u64 {
        debug!("Unknown tag among {:?}", tags);
        return Err(ComputeError::validation("tags", "Unknown tag id"));
    }
    Ok(())
}

async fn ensure_name_free<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except: Option<i32>,
) -> Result<()> {
    let mut query = recipe::Entity::find().filter(recipe::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(recipe::Column::Id.ne(id));
    }

    if query.count(db).await? > 0 {
        return Err(ComputeError::validation(
            "name",
            "A recipe with this name already exists",
        ));
    }
    Ok(())
}

async fn insert_ingredient_rows<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    if ingredients.is_empty() {
        return Ok(());
    }

    let rows = ingredients.iter().map(|item| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(item.id),
        amount: Set(item.amount),
    });
    recipe_ingredient::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn insert_tag_rows<C: ConnectionTrait>(db: &C, recipe_id: i32, tags: &[i32]) -> Result<()> {
    if tags.is_empty() {
        return Ok(());
    }

    let rows = tags.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    });
    recipe_tag::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Add submitted amounts onto existing rows for the same ingredient and insert
/// rows for ingredients the recipe did not have yet.
async fn merge_ingredient_rows<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    ingredients: &[IngredientAmount],
    settings: &Settings,
) -> Result<()> {
    let existing: HashMap<i32, i32> = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.ingredient_id, row.amount))
        .collect();

    let mut fresh = Vec::new();
    for item in ingredients {
        let Some(current) = existing.get(&item.id) else {
            fresh.push(*item);
            continue;
        };

        let merged = i64::from(*current) + i64::from(item.amount);
        if merged > i64::from(settings.max_ingredient_amount) {
            return Err(ComputeError::validation(
                "ingredients",
                format!(
                    "Merged amount {} exceeds the maximum of {}",
                    merged, settings.max_ingredient_amount
                ),
            ));
        }

        recipe_ingredient::Entity::update_many()
            .col_expr(recipe_ingredient::Column::Amount, Expr::value(merged as i32))
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .filter(recipe_ingredient::Column::IngredientId.eq(item.id))
            .exec(db)
            .await?;
    }

    insert_ingredient_rows(db, recipe_id, &fresh).await
}

/// Validate and store a new recipe authored by `author`.
#[instrument(skip(db, draft, settings), fields(author_id = author.id, name = %draft.name))]
pub async fn create_recipe(
    db: &DatabaseConnection,
    author: &user::Model,
    draft: RecipeDraft,
    settings: &Settings,
) -> Result<recipe::Model> {
    validate_name(&draft.name)?;
    validate_cooking_time(draft.cooking_time, settings)?;
    validate_ingredients(&draft.ingredients, settings)?;
    validate_tags(&draft.tags)?;

    let txn = db.begin().await?;

    ensure_ingredients_exist(&txn, &draft.ingredients).await?;
    ensure_tags_exist(&txn, &draft.tags).await?;
    ensure_name_free(&txn, &draft.name, None).await?;

    let created = recipe::ActiveModel {
        author_id: Set(author.id),
        name: Set(draft.name),
        image: Set(draft.image),
        text: Set(draft.text),
        cooking_time: Set(draft.cooking_time),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_ingredient_rows(&txn, created.id, &draft.ingredients).await?;
    insert_tag_rows(&txn, created.id, &draft.tags).await?;

    txn.commit().await?;
    info!(
        "Created recipe {} with {} ingredients and {} tags",
        created.id,
        draft.ingredients.len(),
        draft.tags.len()
    );
    Ok(created)
}

/// Apply `patch` to recipe `recipe_id`. Omitted fields keep their values;
/// submitted ingredient and tag sets are written according to the configured
/// merge mode (tags are always replaced).
#[instrument(skip(db, patch, settings), fields(editor_id = editor.id))]
pub async fn update_recipe(
    db: &DatabaseConnection,
    editor: &user::Model,
    recipe_id: i32,
    patch: RecipePatch,
    settings: &Settings,
) -> Result<recipe::Model> {
    let txn = db.begin().await?;

    let current = recipe::Entity::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::NotFound(format!("Recipe {} not found", recipe_id)))?;
    ensure_can_edit(editor, &current)?;

    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(cooking_time) = patch.cooking_time {
        validate_cooking_time(cooking_time, settings)?;
    }
    if let Some(ingredients) = &patch.ingredients {
        validate_ingredients(ingredients, settings)?;
        ensure_ingredients_exist(&txn, ingredients).await?;
    }
    if let Some(tags) = &patch.tags {
        validate_tags(tags)?;
        ensure_tags_exist(&txn, tags).await?;
    }
    if let Some(name) = &patch.name {
        ensure_name_free(&txn, name, Some(recipe_id)).await?;
    }

    let mut active = current.clone().into_active_model();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(image) = patch.image {
        active.image = Set(image);
    }
    if let Some(text) = patch.text {
        active.text = Set(text);
    }
    if let Some(cooking_time) = patch.cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    let updated = if active.is_changed() {
        active.update(&txn).await?
    } else {
        current
    };

    if let Some(ingredients) = &patch.ingredients {
        match settings.ingredient_merge {
            IngredientMergeMode::Replace => {
                recipe_ingredient::Entity::delete_many()
                    .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
                    .exec(&txn)
                    .await?;
                insert_ingredient_rows(&txn, recipe_id, ingredients).await?;
            }
            IngredientMergeMode::Additive => {
                merge_ingredient_rows(&txn, recipe_id, ingredients, settings).await?;
            }
        }
        debug!("Rewrote ingredients of recipe {}", recipe_id);
    }

    if let Some(tags) = &patch.tags {
        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        insert_tag_rows(&txn, recipe_id, tags).await?;
        debug!("Rewrote tags of recipe {}", recipe_id);
    }

    txn.commit().await?;
    info!("Updated recipe {}", recipe_id);
    Ok(updated)
}

/// Delete a recipe together with its join rows and saved-list entries.
#[instrument(skip(db), fields(editor_id = editor.id))]
pub async fn delete_recipe(
    db: &DatabaseConnection,
    editor: &user::Model,
    recipe_id: i32,
) -> Result<()> {
    let txn = db.begin().await?;

    let current = recipe::Entity::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::NotFound(format!("Recipe {} not found", recipe_id)))?;
    ensure_can_edit(editor, &current)?;

    current.delete(&txn).await?;
    txn.commit().await?;

    info!("Deleted recipe {}", recipe_id);
    Ok(())
}
