//! Shopping list export.
//!
//! Sums ingredient amounts over every recipe in a user's shopping cart and
//! renders the result as plain text, one line per distinct
//! (ingredient name, measurement unit).

use std::collections::BTreeMap;

use model::entities::{ingredient, recipe_ingredient, user_recipe, user_recipe::RecipeListKind};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, QueryTrait};
use tracing::{debug, info, instrument};

use crate::error::Result;

pub const HEADER: &str = "Shopping list";

/// Summed amount per `(name, measurement_unit)`, ordered by name then unit.
pub type ShoppingTotals = BTreeMap<(String, String), i64>;

/// Fold `(name, unit, amount)` lines into totals. Sums are 64-bit so many
/// large amounts cannot overflow.
pub fn aggregate<I>(lines: I) -> ShoppingTotals
where
    I: IntoIterator<Item = (String, String, i32)>,
{
    let mut totals = ShoppingTotals::new();
    for (name, unit, amount) in lines {
        *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
    }
    totals
}

/// Render totals as the downloadable document. Every line, the header
/// included, ends with a newline.
pub fn render(totals: &ShoppingTotals) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + totals.len() * 24);
    out.push_str(HEADER);
    out.push('\n');
    for ((name, unit), amount) in totals {
        out.push_str(&format!("{} - {}, {}\n", name, amount, unit));
    }
    out
}

/// Collect the ingredient lines of every recipe in the user's cart and sum
/// them.
#[instrument(skip(db))]
pub async fn shopping_totals<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<ShoppingTotals> {
    let cart = user_recipe::Entity::find()
        .select_only()
        .column(user_recipe::Column::RecipeId)
        .filter(user_recipe::Column::UserId.eq(user_id))
        .filter(user_recipe::Column::Kind.eq(RecipeListKind::ShoppingCart))
        .into_query();

    let rows = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.in_subquery(cart))
        .find_also_related(ingredient::Entity)
        .all(db)
        .await?;
    debug!("Found {} ingredient rows in the cart of user {}", rows.len(), user_id);

    let totals = aggregate(rows.into_iter().filter_map(|(link, found)| {
        found.map(|found| (found.name, found.measurement_unit, link.amount))
    }));
    Ok(totals)
}

/// The full text document for the user's shopping cart.
pub async fn export_shopping_list<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<String> {
    let totals = shopping_totals(db, user_id).await?;
    info!("Exporting {} shopping list lines for user {}", totals.len(), user_id);
    Ok(render(&totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::add_to_list;
    use crate::testing::{new_recipe, new_user, setup_db};

    fn line(name: &str, unit: &str, amount: i32) -> (String, String, i32) {
        (name.to_string(), unit.to_string(), amount)
    }

    #[test]
    fn test_aggregate_groups_by_name_and_unit() {
        let totals = aggregate(vec![
            line("salt", "g", 5),
            line("salt", "g", 3),
            line("salt", "pinch", 1),
            line("apple", "pcs", 2),
        ]);

        assert_eq!(totals.len(), 3);
        assert_eq!(totals[&("salt".to_string(), "g".to_string())], 8);
        assert_eq!(
            render(&totals),
            "Shopping list\napple - 2, pcs\nsalt - 8, g\nsalt - 1, pinch\n"
        );
    }

    #[test]
    fn test_aggregate_sums_past_i32() {
        let totals = aggregate(vec![line("flour", "g", i32::MAX), line("flour", "g", i32::MAX)]);
        assert_eq!(totals[&("flour".to_string(), "g".to_string())], 2 * i64::from(i32::MAX));
        assert_eq!(render(&totals), "Shopping list\nflour - 4294967294, g\n");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&ShoppingTotals::new()), "Shopping list\n");
    }

    #[tokio::test]
    async fn test_export_sums_cart_recipes() {
        let db = setup_db().await;
        let author = new_user(&db).await.unwrap();
        let shopper = new_user(&db).await.unwrap();

        let soup = new_recipe(&db, &author, &[("salt", "g", 5), ("carrot", "pcs", 2)])
            .await
            .unwrap();
        let stew = new_recipe(&db, &author, &[("salt", "g", 3)]).await.unwrap();
        let skipped = new_recipe(&db, &author, &[("salt", "g", 100)]).await.unwrap();

        add_to_list(&db, shopper.id, soup.id, RecipeListKind::ShoppingCart).await.unwrap();
        add_to_list(&db, shopper.id, stew.id, RecipeListKind::ShoppingCart).await.unwrap();
        // Favorites do not count towards the shopping list
        add_to_list(&db, shopper.id, skipped.id, RecipeListKind::Favorite).await.unwrap();

        let document = export_shopping_list(&db, shopper.id).await.unwrap();
        assert_eq!(document, "Shopping list\ncarrot - 2, pcs\nsalt - 8, g\n");
    }

    #[tokio::test]
    async fn test_export_empty_cart() {
        let db = setup_db().await;
        let shopper = new_user(&db).await.unwrap();

        let document = export_shopping_list(&db, shopper.id).await.unwrap();
        assert_eq!(document, "Shopping list\n");
    }
}
