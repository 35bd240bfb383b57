use serde::{Deserialize, Serialize};

use crate::entity::tag;
use crate::error::AppError;

const MAX_TAG_FIELD: usize = 200;

#[derive(Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct TagResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Breakfast")]
    pub name: String,
    #[schema(example = "#E26C2D")]
    pub color: String,
    #[schema(example = "breakfast")]
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(tag: tag::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

/// One entry of the tag fixture file.
#[derive(Deserialize, Debug)]
pub struct TagFixture {
    pub name: String,
    pub color: String,
    pub slug: String,
}

pub fn validate_tag_fixture(tag: &TagFixture) -> Result<(), AppError> {
    let name = tag.name.trim();
    if name.is_empty() || name.chars().count() > MAX_TAG_FIELD {
        return Err(AppError::Validation(format!(
            "Tag name must be 1-{MAX_TAG_FIELD} characters"
        )));
    }
    validate_color(&tag.color)?;
    validate_slug(&tag.slug)
}

/// `#RRGGBB`, either case.
pub fn validate_color(color: &str) -> Result<(), AppError> {
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Color '{color}' must be a hex value like #RRGGBB"
        )))
    }
}

pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty()
        || slug.len() > MAX_TAG_FIELD
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!(
            "Slug '{slug}' may contain only latin letters, digits, - and _"
        )));
    }
    Ok(())
}
