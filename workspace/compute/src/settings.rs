use serde::Deserialize;

/// What to do with ingredient rows that already exist when a recipe update
/// submits the same ingredient again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientMergeMode {
    /// Drop the old ingredient set and write the submitted one.
    #[default]
    Replace,
    /// Keep the old rows; add submitted amounts onto rows for the same
    /// ingredient and insert the rest.
    Additive,
}

/// Business rules shared by every write path. Loaded once from configuration
/// and passed explicitly to the operations that need them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Usernames nobody may register with.
    pub banned_usernames: Vec<String>,
    pub min_cooking_time: i32,
    pub max_cooking_time: i32,
    pub min_ingredient_amount: i32,
    pub max_ingredient_amount: i32,
    /// Page size used when the client does not ask for one.
    pub page_size: u64,
    pub max_page_size: u64,
    pub ingredient_merge: IngredientMergeMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            banned_usernames: vec!["me".to_string()],
            min_cooking_time: 1,
            max_cooking_time: 32000,
            min_ingredient_amount: 1,
            max_ingredient_amount: 32000,
            page_size: 6,
            max_page_size: 100,
            ingredient_merge: IngredientMergeMode::Replace,
        }
    }
}

impl Settings {
    /// Clamp a client supplied page size into `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}
