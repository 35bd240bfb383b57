//! Per-user recipe collections. Favorites and the shopping cart are both
//! `(user_id, recipe_id)` membership tables and share one add/remove path.

use sea_orm::*;

use crate::entity::{favorite, recipe, shopping_cart};
use crate::error::AppError;
use crate::utils::recipe::find_recipe;

pub trait RecipeCollection: EntityTrait {
    /// Name used in error messages, e.g. "favorites".
    const NAME: &'static str;

    fn user_column() -> Self::Column;
    fn recipe_column() -> Self::Column;
    fn entry(user_id: i32, recipe_id: i32) -> Self::ActiveModel;
}

impl RecipeCollection for favorite::Entity {
    const NAME: &'static str = "favorites";

    fn user_column() -> Self::Column {
        favorite::Column::UserId
    }

    fn recipe_column() -> Self::Column {
        favorite::Column::RecipeId
    }

    fn entry(user_id: i32, recipe_id: i32) -> Self::ActiveModel {
        favorite::ActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            added_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
    }
}

impl RecipeCollection for shopping_cart::Entity {
    const NAME: &'static str = "the shopping cart";

    fn user_column() -> Self::Column {
        shopping_cart::Column::UserId
    }

    fn recipe_column() -> Self::Column {
        shopping_cart::Column::RecipeId
    }

    fn entry(user_id: i32, recipe_id: i32) -> Self::ActiveModel {
        shopping_cart::ActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            added_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
    }
}

/// Put a recipe into the user's collection and return it.
///
/// An unknown recipe is a validation error here, not a 404: the id comes
/// from the path but names the thing being added.
pub async fn add_recipe<E, C>(db: &C, user_id: i32, recipe_id: i32) -> Result<recipe::Model, AppError>
where
    E: RecipeCollection,
    C: ConnectionTrait,
{
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Recipe {recipe_id} does not exist")))?;

    E::insert(E::entry(user_id, recipe.id))
        .exec_without_returning(db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(format!("Recipe {recipe_id} is already in {}", E::NAME))
            }
            _ => AppError::from(e),
        })?;

    Ok(recipe)
}

/// Take a recipe out of the user's collection.
pub async fn remove_recipe<E, C>(db: &C, user_id: i32, recipe_id: i32) -> Result<(), AppError>
where
    E: RecipeCollection,
    C: ConnectionTrait,
{
    find_recipe(db, recipe_id).await?;

    let result = E::delete_many()
        .filter(E::user_column().eq(user_id))
        .filter(E::recipe_column().eq(recipe_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotPresent(format!(
            "Recipe {recipe_id} is not in {}",
            E::NAME
        )));
    }
    Ok(())
}
