//! Read side of the recipe aggregate: filtered pages and fully resolved
//! recipes with the viewer-scoped flags.

use std::collections::{HashMap, HashSet};

use model::entities::{
    ingredient, recipe, recipe_ingredient, recipe_tag, subscription, tag, user, user_recipe,
    user_recipe::RecipeListKind,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Select,
};
use tracing::{debug, instrument};

use crate::error::Result;

/// Query-string filters of the recipe list.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    /// Recipes carrying any of these tag slugs.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// One ingredient line of a resolved recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A recipe with everything its full representation shows.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: recipe::Model,
    pub author: user::Model,
    pub author_is_subscribed: bool,
    pub tags: Vec<tag::Model>,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// A page of results plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub count: u64,
    pub results: Vec<T>,
}

fn saved_by(user_id: i32, kind: RecipeListKind) -> sea_orm::sea_query::SelectStatement {
    user_recipe::Entity::find()
        .select_only()
        .column(user_recipe::Column::RecipeId)
        .filter(user_recipe::Column::UserId.eq(user_id))
        .filter(user_recipe::Column::Kind.eq(kind))
        .into_query()
}

/// Build the list query. List filters that need an identity are ignored for
/// anonymous viewers.
pub fn filtered(filter: &RecipeFilter, viewer: Option<i32>) -> Select<recipe::Entity> {
    let mut query = recipe::Entity::find()
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id);

    if let Some(author) = filter.author {
        query = query.filter(recipe::Column::AuthorId.eq(author));
    }

    if !filter.tags.is_empty() {
        let tagged = recipe_tag::Entity::find()
            .select_only()
            .column(recipe_tag::Column::RecipeId)
            .inner_join(tag::Entity)
            .filter(tag::Column::Slug.is_in(filter.tags.clone()))
            .into_query();
        query = query.filter(recipe::Column::Id.in_subquery(tagged));
    }

    if let Some(user_id) = viewer {
        if filter.is_favorited {
            query = query.filter(
                recipe::Column::Id.in_subquery(saved_by(user_id, RecipeListKind::Favorite)),
            );
        }
        if filter.is_in_shopping_cart {
            query = query.filter(
                recipe::Column::Id.in_subquery(saved_by(user_id, RecipeListKind::ShoppingCart)),
            );
        }
    }

    query
}

/// Fetch one page (1-based) of recipes matching `filter`, newest first.
#[instrument(skip(db))]
pub async fn list_recipes<C: ConnectionTrait>(
    db: &C,
    filter: &RecipeFilter,
    viewer: Option<i32>,
    page: u64,
    per_page: u64,
) -> Result<Page<RecipeDetails>> {
    let paginator = filtered(filter, viewer).paginate(db, per_page);
    let count = paginator.num_items().await?;
    let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
    debug!("Recipe page {} holds {} of {} rows", page, rows.len(), count);

    let results = resolve(db, rows, viewer).await?;
    Ok(Page { count, results })
}

/// Fetch and resolve a single recipe.
pub async fn get_recipe<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    viewer: Option<i32>,
) -> Result<Option<RecipeDetails>> {
    let Some(found) = recipe::Entity::find_by_id(recipe_id).one(db).await? else {
        return Ok(None);
    };
    Ok(resolve(db, vec![found], viewer).await?.into_iter().next())
}

/// Attach author, tags, ingredient lines and flags to `recipes`, keeping their
/// order. Uses a fixed number of queries regardless of how many recipes are
/// passed.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    recipes: Vec<recipe::Model>,
    viewer: Option<i32>,
) -> Result<Vec<RecipeDetails>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<i32> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut tags: HashMap<i32, Vec<tag::Model>> = HashMap::new();
    for (link, found) in recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?
    {
        if let Some(found) = found {
            tags.entry(link.recipe_id).or_default().push(found);
        }
    }

    let mut lines: HashMap<i32, Vec<IngredientLine>> = HashMap::new();
    for (link, found) in recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?
    {
        if let Some(found) = found {
            lines.entry(link.recipe_id).or_default().push(IngredientLine {
                id: found.id,
                name: found.name,
                measurement_unit: found.measurement_unit,
                amount: link.amount,
            });
        }
    }

    let mut favorited = HashSet::new();
    let mut in_cart = HashSet::new();
    let mut followed: HashSet<i32> = HashSet::new();
    if let Some(user_id) = viewer {
        for saved in user_recipe::Entity::find()
            .filter(user_recipe::Column::UserId.eq(user_id))
            .filter(user_recipe::Column::RecipeId.is_in(recipe_ids))
            .all(db)
            .await?
        {
            match saved.kind {
                RecipeListKind::Favorite => favorited.insert(saved.recipe_id),
                RecipeListKind::ShoppingCart => in_cart.insert(saved.recipe_id),
            };
        }

        followed = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::FollowingId.is_in(author_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|edge| edge.following_id)
            .collect();
    }

    let mut resolved = Vec::with_capacity(recipes.len());
    for found in recipes {
        // Authors cascade to their recipes, so a missing author means the row
        // was deleted concurrently.
        let Some(author) = authors.get(&found.author_id).cloned() else {
            continue;
        };
        resolved.push(RecipeDetails {
            author_is_subscribed: followed.contains(&author.id),
            author,
            tags: tags.remove(&found.id).unwrap_or_default(),
            ingredients: lines.remove(&found.id).unwrap_or_default(),
            is_favorited: favorited.contains(&found.id),
            is_in_shopping_cart: in_cart.contains(&found.id),
            recipe: found,
        });
    }
    Ok(resolved)
}

/// Recipes of one author, newest first, optionally truncated.
pub async fn recipes_by_author<C: ConnectionTrait>(
    db: &C,
    author_id: i32,
    limit: Option<u64>,
) -> Result<Vec<recipe::Model>> {
    let mut query = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author_id))
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    Ok(query.all(db).await?)
}

pub async fn count_by_author<C: ConnectionTrait>(db: &C, author_id: i32) -> Result<u64> {
    Ok(recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author_id))
        .count(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::{add_to_list, subscribe};
    use crate::testing::{new_recipe, new_user, setup_db};

    #[tokio::test]
    async fn test_resolve_flags_for_viewer() {
        let db = setup_db().await;
        let author = new_user(&db).await.unwrap();
        let reader = new_user(&db).await.unwrap();
        let created = new_recipe(&db, &author, &[("salt", "g", 5), ("basil", "g", 2)])
            .await
            .unwrap();

        add_to_list(&db, reader.id, created.id, RecipeListKind::Favorite).await.unwrap();
        subscribe(&db, reader.id, author.id).await.unwrap();

        let seen = get_recipe(&db, created.id, Some(reader.id)).await.unwrap().unwrap();
        assert!(seen.is_favorited);
        assert!(!seen.is_in_shopping_cart);
        assert!(seen.author_is_subscribed);
        assert_eq!(seen.tags.len(), 1);
        let names: Vec<&str> = seen.ingredients.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["basil", "salt"]);

        let anonymous = get_recipe(&db, created.id, None).await.unwrap().unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.author_is_subscribed);

        assert!(get_recipe(&db, 9999, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let db = setup_db().await;
        let author = new_user(&db).await.unwrap();
        let other = new_user(&db).await.unwrap();
        let reader = new_user(&db).await.unwrap();

        let first = new_recipe(&db, &author, &[("rice", "g", 100)]).await.unwrap();
        let second = new_recipe(&db, &author, &[("rice", "g", 50)]).await.unwrap();
        let foreign = new_recipe(&db, &other, &[("beans", "g", 70)]).await.unwrap();
        add_to_list(&db, reader.id, second.id, RecipeListKind::ShoppingCart).await.unwrap();

        let all = list_recipes(&db, &RecipeFilter::default(), None, 1, 2).await.unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(all.results.len(), 2);
        // Newest first
        assert_eq!(all.results[0].recipe.id, foreign.id);

        let by_author = RecipeFilter {
            author: Some(author.id),
            ..Default::default()
        };
        let page = list_recipes(&db, &by_author, None, 1, 10).await.unwrap();
        assert_eq!(page.count, 2);

        let first_details = get_recipe(&db, first.id, None).await.unwrap().unwrap();
        let first_tag = first_details.tags[0].slug.clone();
        let by_tag = RecipeFilter {
            tags: vec![first_tag, "missing-slug".to_string()],
            ..Default::default()
        };
        let page = list_recipes(&db, &by_tag, None, 1, 10).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].recipe.id, first.id);

        let in_cart = RecipeFilter {
            is_in_shopping_cart: true,
            ..Default::default()
        };
        let page = list_recipes(&db, &in_cart, Some(reader.id), 1, 10).await.unwrap();
        assert_eq!(page.count, 1);
        assert!(page.results[0].is_in_shopping_cart);

        // Anonymous viewers have no cart, so the filter does not apply
        let page = list_recipes(&db, &in_cart, None, 1, 10).await.unwrap();
        assert_eq!(page.count, 3);
    }

    #[tokio::test]
    async fn test_author_recipes_limit() {
        let db = setup_db().await;
        let author = new_user(&db).await.unwrap();
        for _ in 0..3 {
            new_recipe(&db, &author, &[("flour", "g", 100)]).await.unwrap();
        }

        assert_eq!(count_by_author(&db, author.id).await.unwrap(), 3);
        assert_eq!(recipes_by_author(&db, author.id, Some(2)).await.unwrap().len(), 2);
        assert_eq!(recipes_by_author(&db, author.id, None).await.unwrap().len(), 3);
    }
}
