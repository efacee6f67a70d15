use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use model::entities::{ingredient, tag};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, Database, EntityTrait, Set};
use serde::Deserialize;
use tracing::{debug, info, warn};

const BATCH_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
struct CatalogTag {
    name: String,
    color: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct CatalogIngredient {
    name: String,
    measurement_unit: String,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Insert tags, skipping rows whose name or slug already exists.
/// Returns the number of inserted rows.
pub async fn insert_tags<C: ConnectionTrait>(db: &C, path: &Path) -> Result<u64> {
    let rows: Vec<CatalogTag> = read_json(path)?;
    debug!("Read {} tags from {}", rows.len(), path.display());

    let mut inserted = 0;
    for batch in rows.chunks(BATCH_SIZE) {
        let models = batch.iter().map(|row| tag::ActiveModel {
            name: Set(row.name.clone()),
            color: Set(row.color.clone()),
            slug: Set(row.slug.clone()),
            ..Default::default()
        });
        inserted += tag::Entity::insert_many(models)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }
    Ok(inserted)
}

/// Insert ingredients, skipping existing (name, measurement_unit) pairs.
/// Returns the number of inserted rows.
pub async fn insert_ingredients<C: ConnectionTrait>(db: &C, path: &Path) -> Result<u64> {
    let rows: Vec<CatalogIngredient> = read_json(path)?;
    debug!("Read {} ingredients from {}", rows.len(), path.display());

    let mut inserted = 0;
    for batch in rows.chunks(BATCH_SIZE) {
        let models = batch.iter().map(|row| ingredient::ActiveModel {
            name: Set(row.name.clone()),
            measurement_unit: Set(row.measurement_unit.clone()),
            ..Default::default()
        });
        inserted += ingredient::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    ingredient::Column::Name,
                    ingredient::Column::MeasurementUnit,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }
    Ok(inserted)
}

pub async fn load_catalog(
    database_url: &str,
    tags: Option<&Path>,
    ingredients: Option<&Path>,
) -> Result<()> {
    if tags.is_none() && ingredients.is_none() {
        warn!("Nothing to load: pass --tags and/or --ingredients");
        return Ok(());
    }

    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", database_url))?;

    if let Some(path) = tags {
        let inserted = insert_tags(&db, path).await?;
        info!("Loaded {} new tags from {}", inserted, path.display());
    }
    if let Some(path) = ingredients {
        let inserted = insert_ingredients(&db, path).await?;
        info!("Loaded {} new ingredients from {}", inserted, path.display());
    }

    Ok(())
}
