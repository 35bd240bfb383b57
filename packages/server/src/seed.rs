use std::io::{self, Read};
use std::path::Path;

use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SeedConfig;
use crate::entity::{ingredient, recipe, tag};
use crate::error::AppError;
use crate::models::tag::{TagFixture, validate_tag_fixture};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("malformed ingredient CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed tag JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid fixture: {0}")]
    Invalid(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, PartialEq, Eq)]
pub struct IngredientFixture {
    pub name: String,
    pub measurement_unit: String,
}

/// Parse `name,measurement_unit` rows. The first row is a header and is skipped.
pub fn parse_ingredients<R: Read>(reader: R) -> Result<Vec<IngredientFixture>, SeedError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<(String, String)>().enumerate() {
        let (name, measurement_unit) = row?;
        if name.is_empty() || measurement_unit.is_empty() {
            return Err(SeedError::Invalid(format!(
                "ingredient row {} has an empty field",
                idx + 2
            )));
        }
        out.push(IngredientFixture {
            name,
            measurement_unit,
        });
    }
    Ok(out)
}

/// Parse and validate a JSON array of `{name, color, slug}`.
pub fn parse_tags<R: Read>(reader: R) -> Result<Vec<TagFixture>, SeedError> {
    let tags: Vec<TagFixture> = serde_json::from_reader(reader)?;
    for t in &tags {
        validate_tag_fixture(t).map_err(|e| {
            let detail = match e {
                AppError::Validation(msg) => msg,
                other => format!("{other:?}"),
            };
            SeedError::Invalid(format!("tag '{}': {}", t.slug, detail))
        })?;
    }
    Ok(tags)
}

/// Read a fixture file; `None` if it does not exist.
async fn read_fixture(path: &Path) -> Result<Option<Vec<u8>>, SeedError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Fixture file {} not found, skipping", path.display());
            Ok(None)
        }
        Err(source) => Err(SeedError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Load the configured ingredient and tag fixtures. Existing rows are left alone.
pub async fn load_fixtures(db: &DatabaseConnection, cfg: &SeedConfig) -> Result<(), SeedError> {
    if let Some(ref path) = cfg.ingredients_csv
        && let Some(bytes) = read_fixture(path).await?
    {
        let rows = parse_ingredients(bytes.as_slice())?;
        let inserted = seed_ingredients(db, rows).await?;
        info!("Seeded {} new ingredients from {}", inserted, path.display());
    }

    if let Some(ref path) = cfg.tags_json
        && let Some(bytes) = read_fixture(path).await?
    {
        let tags = parse_tags(bytes.as_slice())?;
        let inserted = seed_tags(db, tags).await?;
        info!("Seeded {} new tags from {}", inserted, path.display());
    }

    Ok(())
}

pub async fn seed_ingredients(
    db: &DatabaseConnection,
    rows: Vec<IngredientFixture>,
) -> Result<u32, DbErr> {
    let mut inserted = 0u32;
    for row in rows {
        let model = ingredient::ActiveModel {
            name: Set(row.name),
            measurement_unit: Set(row.measurement_unit),
            ..Default::default()
        };

        let result = ingredient::Entity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(inserted)
}

pub async fn seed_tags(db: &DatabaseConnection, tags: Vec<TagFixture>) -> Result<u32, DbErr> {
    let mut inserted = 0u32;
    for t in tags {
        let model = tag::ActiveModel {
            name: Set(t.name.trim().to_string()),
            color: Set(t.color.to_uppercase()),
            slug: Set(t.slug.trim().to_string()),
            ..Default::default()
        };

        let result = tag::Entity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(inserted)
}

/// Ensure indexes the entity definitions cannot express.
///
/// The ingredient `(name, measurement_unit)` index is required; the recipe
/// ordering index is best effort.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_ingredient_name_unit")
        .table(ingredient::Entity)
        .col(ingredient::Column::Name)
        .col(ingredient::Column::MeasurementUnit)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index idx_ingredient_name_unit exists");

    // Recipe listing: ORDER BY created_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_recipe_created")
        .table(recipe::Entity)
        .col(recipe::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_recipe_created exists"),
        Err(e) => warn!("Failed to create index idx_recipe_created: {}", e),
    }

    Ok(())
}

/// Ensure CHECK constraints exist.
pub async fn ensure_constraints(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared(
        r#"
        DO $$
        BEGIN
            IF NOT EXISTS (
                SELECT 1 FROM pg_constraint WHERE conname = 'subscription_prevent_self_follow'
            ) THEN
                ALTER TABLE "subscription"
                    ADD CONSTRAINT subscription_prevent_self_follow
                    CHECK (user_id <> author_id);
            END IF;
        END
        $$;
        "#,
    )
    .await?;
    info!("Ensured constraint subscription_prevent_self_follow exists");
    Ok(())
}
