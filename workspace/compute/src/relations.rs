//! User relations: saved recipes (favorites, shopping cart) and subscriptions.
//!
//! Adding a relation checks for an existing row and inserts inside one
//! transaction. Two concurrent adds can both pass the check; the unique index
//! then rejects the second insert, which is reported as the same duplicate
//! error.

use chrono::Utc;
use model::entities::{recipe, subscription, user, user_recipe, user_recipe::RecipeListKind};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, SqlErr,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{ComputeError, Result};
use crate::recipe_query::Page;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn already_saved(kind: RecipeListKind) -> ComputeError {
    ComputeError::Duplicate(format!("Recipe is already in {}", kind.label()))
}

/// Fail if `recipe_id` is already on the user's `kind` list.
pub async fn validate_favorite_or_cart<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_id: i32,
    kind: RecipeListKind,
) -> Result<()> {
    if is_in_list(db, Some(user_id), recipe_id, kind).await? {
        debug!("Recipe {} already in {:?} of user {}", recipe_id, kind, user_id);
        return Err(already_saved(kind));
    }
    Ok(())
}

/// Whether the viewer has `recipe_id` on their `kind` list. Anonymous viewers
/// never do.
pub async fn is_in_list<C: ConnectionTrait>(
    db: &C,
    viewer: Option<i32>,
    recipe_id: i32,
    kind: RecipeListKind,
) -> Result<bool> {
    let Some(user_id) = viewer else {
        return Ok(false);
    };

    let count = user_recipe::Entity::find()
        .filter(user_recipe::Column::UserId.eq(user_id))
        .filter(user_recipe::Column::RecipeId.eq(recipe_id))
        .filter(user_recipe::Column::Kind.eq(kind))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Put a recipe on one of the user's lists and return the recipe.
#[instrument(skip(db))]
pub async fn add_to_list(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
    kind: RecipeListKind,
) -> Result<recipe::Model> {
    let txn = db.begin().await?;

    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::NotFound(format!("Recipe {} not found", recipe_id)))?;

    validate_favorite_or_cart(&txn, user_id, recipe_id, kind).await?;

    let entry = user_recipe::ActiveModel {
        user_id: Set(user_id),
        recipe_id: Set(recipe_id),
        kind: Set(kind),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    match entry.insert(&txn).await {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            warn!("Concurrent add of recipe {} to {:?} for user {}", recipe_id, kind, user_id);
            return Err(already_saved(kind));
        }
        Err(err) => return Err(err.into()),
    }

    txn.commit().await?;
    info!("User {} added recipe {} to {:?}", user_id, recipe_id, kind);
    Ok(recipe)
}

/// Take a recipe off one of the user's lists. Both the recipe and the list
/// entry must exist.
#[instrument(skip(db))]
pub async fn remove_from_list(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
    kind: RecipeListKind,
) -> Result<()> {
    let txn = db.begin().await?;

    if recipe::Entity::find_by_id(recipe_id).one(&txn).await?.is_none() {
        return Err(ComputeError::NotFound(format!("Recipe {} not found", recipe_id)));
    }

    let result = user_recipe::Entity::delete_many()
        .filter(user_recipe::Column::UserId.eq(user_id))
        .filter(user_recipe::Column::RecipeId.eq(recipe_id))
        .filter(user_recipe::Column::Kind.eq(kind))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ComputeError::NotFound(format!(
            "Recipe is not in {}",
            kind.label()
        )));
    }

    txn.commit().await?;
    info!("User {} removed recipe {} from {:?}", user_id, recipe_id, kind);
    Ok(())
}

/// Fail if `user_id` would follow themselves or already follows `following_id`.
pub async fn validate_subscription<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    following_id: i32,
) -> Result<()> {
    if user_id == following_id {
        return Err(ComputeError::validation(
            "following",
            "You cannot subscribe to yourself",
        ));
    }
    if is_subscribed(db, Some(user_id), following_id).await? {
        return Err(ComputeError::Duplicate(
            "You are already subscribed to this user".to_string(),
        ));
    }
    Ok(())
}

/// Whether the viewer follows `author_id`. Anonymous viewers follow nobody.
pub async fn is_subscribed<C: ConnectionTrait>(
    db: &C,
    viewer: Option<i32>,
    author_id: i32,
) -> Result<bool> {
    let Some(user_id) = viewer else {
        return Ok(false);
    };

    let count = subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::FollowingId.eq(author_id))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Make `user_id` follow `following_id` and return the followed user.
#[instrument(skip(db))]
pub async fn subscribe(
    db: &DatabaseConnection,
    user_id: i32,
    following_id: i32,
) -> Result<user::Model> {
    let txn = db.begin().await?;

    let following = user::Entity::find_by_id(following_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::NotFound(format!("User {} not found", following_id)))?;

    validate_subscription(&txn, user_id, following_id).await?;

    let edge = subscription::ActiveModel {
        user_id: Set(user_id),
        following_id: Set(following_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    match edge.insert(&txn).await {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            warn!("Concurrent subscription of {} to {}", user_id, following_id);
            return Err(ComputeError::Duplicate(
                "You are already subscribed to this user".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    txn.commit().await?;
    info!("User {} subscribed to {}", user_id, following_id);
    Ok(following)
}

/// Remove the `user_id` → `following_id` edge. Both the user and the edge must
/// exist.
#[instrument(skip(db))]
pub async fn unsubscribe(db: &DatabaseConnection, user_id: i32, following_id: i32) -> Result<()> {
    let txn = db.begin().await?;

    if user::Entity::find_by_id(following_id).one(&txn).await?.is_none() {
        return Err(ComputeError::NotFound(format!("User {} not found", following_id)));
    }

    let result = subscription::Entity::delete_many()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::FollowingId.eq(following_id))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ComputeError::NotFound(
            "You are not subscribed to this user".to_string(),
        ));
    }

    txn.commit().await?;
    info!("User {} unsubscribed from {}", user_id, following_id);
    Ok(())
}

/// One page (1-based) of the users `user_id` follows, ordered by username.
#[instrument(skip(db))]
pub async fn followed_authors<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    page: u64,
    per_page: u64,
) -> Result<Page<user::Model>> {
    let following = subscription::Entity::find()
        .select_only()
        .column(subscription::Column::FollowingId)
        .filter(subscription::Column::UserId.eq(user_id))
        .into_query();

    let paginator = user::Entity::find()
        .filter(user::Column::Id.in_subquery(following))
        .order_by_asc(user::Column::Username)
        .paginate(db, per_page);

    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(page.saturating_sub(1)).await?;
    debug!("User {} follows {} authors", user_id, count);
    Ok(Page { count, results })
}
