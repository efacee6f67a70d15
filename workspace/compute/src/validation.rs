//! Input rules checked before any write.
//!
//! Every function here is pure: it looks only at the submitted values and the
//! configured [`Settings`]. Checks that need the database (duplicates, existing
//! ids) live next to the writes in [`crate::relations`] and
//! [`crate::recipe_writer`].

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, instrument};

use crate::error::{ComputeError, Result};
use crate::settings::Settings;

/// One submitted `(ingredient id, amount)` pair of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

/// Characters a username may contain besides ASCII letters and digits.
const USERNAME_EXTRA_CHARS: &[char] = &['_', '.', '@', '+', '-'];

/// Check a recipe's ingredient list: not empty, every amount positive and
/// within bounds, no ingredient listed twice.
#[instrument(skip(settings), fields(count = ingredients.len()))]
pub fn validate_ingredients(ingredients: &[IngredientAmount], settings: &Settings) -> Result<()> {
    if ingredients.is_empty() {
        return Err(ComputeError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for ingredient in ingredients {
        validate_amount(ingredient.amount, settings)?;
        if !seen.insert(ingredient.id) {
            debug!("Ingredient {} submitted twice", ingredient.id);
            return Err(ComputeError::validation(
                "ingredients",
                "Ingredients must not repeat",
            ));
        }
    }

    Ok(())
}

/// Check a single ingredient amount against the configured bounds.
pub fn validate_amount(amount: i32, settings: &Settings) -> Result<()> {
    if amount <= 0 {
        return Err(ComputeError::validation(
            "ingredients",
            "Amount must be positive",
        ));
    }
    if amount < settings.min_ingredient_amount || amount > settings.max_ingredient_amount {
        return Err(ComputeError::validation(
            "ingredients",
            format!(
                "Amount must be between {} and {}",
                settings.min_ingredient_amount, settings.max_ingredient_amount
            ),
        ));
    }
    Ok(())
}

/// Check a recipe's tag list: not empty, no tag listed twice.
#[instrument(fields(count = tags.len()))]
pub fn validate_tags(tags: &[i32]) -> Result<()> {
    if tags.is_empty() {
        return Err(ComputeError::validation("tags", "At least one tag is required"));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    if tags.iter().any(|id| !seen.insert(*id)) {
        return Err(ComputeError::validation("tags", "Tags must be different"));
    }

    Ok(())
}

pub fn validate_cooking_time(cooking_time: i32, settings: &Settings) -> Result<()> {
    if cooking_time <= 0 {
        return Err(ComputeError::validation(
            "cooking_time",
            "Cooking time must be positive",
        ));
    }
    if cooking_time < settings.min_cooking_time {
        return Err(ComputeError::validation(
            "cooking_time",
            format!(
                "Cooking time cannot be less than {} min.",
                settings.min_cooking_time
            ),
        ));
    }
    if cooking_time > settings.max_cooking_time {
        return Err(ComputeError::validation(
            "cooking_time",
            format!(
                "Cooking time cannot be more than {} min.",
                settings.max_cooking_time
            ),
        ));
    }
    Ok(())
}

/// Reject denylisted usernames and usernames containing anything outside
/// `[A-Za-z0-9_.@+-]`. The message names each offending character once.
#[instrument(skip(settings))]
pub fn validate_username(username: &str, settings: &Settings) -> Result<()> {
    if settings.banned_usernames.iter().any(|banned| banned == username) {
        return Err(ComputeError::validation(
            "username",
            format!("Username \"{}\" is not allowed", username),
        ));
    }

    let invalid: BTreeSet<char> = username
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || USERNAME_EXTRA_CHARS.contains(c)))
        .collect();

    if !invalid.is_empty() {
        let listed: String = invalid.into_iter().collect();
        return Err(ComputeError::validation(
            "username",
            format!("Username contains invalid characters: {}", listed),
        ));
    }

    Ok(())
}
