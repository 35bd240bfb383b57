use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::shared::{Pagination, flag};
use super::tag::TagResponse;
use super::user::UserResponse;
use crate::config::RecipeRules;
use crate::error::AppError;

const MAX_RECIPE_NAME: usize = 200;

/// One `{id, amount}` line of a recipe payload.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct IngredientAmount {
    /// Ingredient ID.
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 10)]
    pub amount: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    /// Tag IDs.
    #[serde(default)]
    #[schema(example = json!([1, 2]))]
    pub tags: Vec<i32>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[schema(example = "Omelette")]
    pub name: String,
    #[schema(example = "Beat the eggs, pour into a hot pan.")]
    pub text: String,
    /// Minutes.
    #[serde(default)]
    #[schema(example = 20)]
    pub cooking_time: i32,
    /// `data:image/<type>;base64,<payload>`.
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub image: Option<String>,
}

/// PATCH body. Tags and ingredients are always replaced wholesale; the
/// remaining fields keep their stored value when absent.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    #[serde(default)]
    pub tags: Vec<i32>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
}

/// The parts of a recipe payload the rule chain looks at.
pub struct RecipeCandidate<'a> {
    pub tags: &'a [i32],
    pub ingredients: &'a [IngredientAmount],
    pub cooking_time: i32,
    pub has_image: bool,
}

/// IDs from the payload that were found in the database.
#[derive(Default)]
pub struct KnownReferences {
    pub tags: HashSet<i32>,
    pub ingredients: HashSet<i32>,
}

/// Check the name and text fields that are present.
pub fn validate_recipe_fields(name: Option<&str>, text: Option<&str>) -> Result<(), AppError> {
    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_RECIPE_NAME {
            return Err(AppError::Validation(format!(
                "Recipe name must be 1-{MAX_RECIPE_NAME} characters"
            )));
        }
    }
    if let Some(text) = text
        && text.trim().is_empty()
    {
        return Err(AppError::Validation("Recipe text must not be empty".into()));
    }
    Ok(())
}

/// Run the recipe rule chain. The first failing rule is reported.
pub fn validate_recipe(
    candidate: &RecipeCandidate<'_>,
    rules: &RecipeRules,
    known: &KnownReferences,
) -> Result<(), AppError> {
    if candidate.tags.is_empty() {
        return Err(AppError::Validation(
            "Recipe must contain at least 1 tag".into(),
        ));
    }
    // Unknown tags are reported before repeats, wherever they sit in the list.
    if let Some(tag_id) = candidate.tags.iter().find(|&id| !known.tags.contains(id)) {
        return Err(AppError::Validation(format!("Tag {tag_id} does not exist")));
    }
    let mut seen_tags = HashSet::with_capacity(candidate.tags.len());
    if !candidate.tags.iter().all(|id| seen_tags.insert(*id)) {
        return Err(AppError::Validation("Tags must not repeat".into()));
    }

    if candidate.ingredients.is_empty() {
        return Err(AppError::Validation(
            "Recipe must contain at least 1 ingredient".into(),
        ));
    }
    let mut seen_ingredients = HashSet::with_capacity(candidate.ingredients.len());
    for line in candidate.ingredients {
        if line.amount < rules.min_amount {
            return Err(AppError::Validation(format!(
                "Ingredient amount must be at least {}",
                rules.min_amount
            )));
        }
        if line.amount > rules.max_amount {
            return Err(AppError::Validation(format!(
                "Ingredient amount must not exceed {}",
                rules.max_amount
            )));
        }
        if !known.ingredients.contains(&line.id) {
            return Err(AppError::Validation(format!(
                "Ingredient {} does not exist",
                line.id
            )));
        }
        if !seen_ingredients.insert(line.id) {
            return Err(AppError::Validation(format!(
                "Ingredient {} is already in the recipe",
                line.id
            )));
        }
    }

    if candidate.cooking_time < rules.min_cooking_time {
        return Err(AppError::Validation(format!(
            "Cooking time must be at least {} min",
            rules.min_cooking_time
        )));
    }
    if candidate.cooking_time > rules.max_cooking_time {
        return Err(AppError::Validation(format!(
            "Cooking time must not exceed {} min",
            rules.max_cooking_time
        )));
    }

    if !candidate.has_image {
        return Err(AppError::Validation("Recipe must have an image".into()));
    }

    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeIngredientResponse {
    /// Ingredient ID.
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "salt")]
    pub name: String,
    #[schema(example = "g")]
    pub measurement_unit: String,
    #[schema(example = 5)]
    pub amount: i32,
}

/// Full recipe representation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Absolute URL of the dish photo.
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact representation used by favorites, the cart and subscriptions.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeListResponse {
    pub data: Vec<RecipeResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Tag slugs; a recipe matches if it carries any of them.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Author user ID.
    pub author: Option<i32>,
    /// `1` to keep only the viewer's favorites.
    #[serde(default, deserialize_with = "flag")]
    #[param(value_type = Option<String>)]
    pub is_favorited: Option<bool>,
    /// `1` to keep only recipes in the viewer's cart.
    #[serde(default, deserialize_with = "flag")]
    #[param(value_type = Option<String>)]
    pub is_in_shopping_cart: Option<bool>,
}
