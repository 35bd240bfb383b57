use std::collections::{HashMap, HashSet};

use sea_orm::*;

use crate::entity::{
    favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, subscription, tag,
    user,
};
use crate::error::AppError;
use crate::models::recipe::{RecipeIngredientResponse, RecipeResponse, RecipeShortResponse};
use crate::models::tag::TagResponse;
use crate::models::user::{SubscriptionResponse, UserResponse};
use crate::utils::image::media_url;

/// Look up a recipe by ID, returning `NotFound` if absent.
pub async fn find_recipe<C: ConnectionTrait>(db: &C, id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {id} not found")))
}

pub fn short_recipe(model: recipe::Model, public_url: &str) -> RecipeShortResponse {
    RecipeShortResponse {
        id: model.id,
        name: model.name,
        image: media_url(public_url, &model.image),
        cooking_time: model.cooking_time,
    }
}

/// Of `author_ids`, the ones `viewer` follows.
pub async fn followed_authors<C: ConnectionTrait>(
    db: &C,
    viewer: Option<i32>,
    author_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<i32> = subscription::Entity::find()
        .select_only()
        .column(subscription::Column::AuthorId)
        .filter(subscription::Column::UserId.eq(viewer))
        .filter(subscription::Column::AuthorId.is_in(author_ids.to_vec()))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Build user profiles with `is_subscribed` relative to `viewer`.
pub async fn user_profiles<C: ConnectionTrait>(
    db: &C,
    users: Vec<user::Model>,
    viewer: Option<i32>,
) -> Result<Vec<UserResponse>, DbErr> {
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let followed = followed_authors(db, viewer, &ids).await?;

    Ok(users
        .into_iter()
        .map(|u| {
            let is_subscribed = followed.contains(&u.id);
            UserResponse::new(u, is_subscribed)
        })
        .collect())
}

/// Build the full representation of each recipe, preserving input order.
///
/// Runs a fixed number of queries regardless of how many recipes are passed.
pub async fn recipe_details<C: ConnectionTrait>(
    db: &C,
    public_url: &str,
    recipes: Vec<recipe::Model>,
    viewer: Option<i32>,
) -> Result<Vec<RecipeResponse>, DbErr> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

    let mut tags_by_recipe: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    let tag_rows = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;
    for (link, tag) in tag_rows {
        if let Some(tag) = tag {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(tag.into());
        }
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<RecipeIngredientResponse>> = HashMap::new();
    let ingredient_rows = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?;
    for (line, ingredient) in ingredient_rows {
        if let Some(ingredient) = ingredient {
            ingredients_by_recipe
                .entry(line.recipe_id)
                .or_default()
                .push(RecipeIngredientResponse {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: line.amount,
                });
        }
    }

    let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let followed = followed_authors(db, viewer, &author_ids).await?;

    let (favorited, in_cart) = match viewer {
        Some(uid) => {
            let favorited: HashSet<i32> = favorite::Entity::find()
                .select_only()
                .column(favorite::Column::RecipeId)
                .filter(favorite::Column::UserId.eq(uid))
                .filter(favorite::Column::RecipeId.is_in(recipe_ids.clone()))
                .into_tuple::<i32>()
                .all(db)
                .await?
                .into_iter()
                .collect();
            let in_cart: HashSet<i32> = shopping_cart::Entity::find()
                .select_only()
                .column(shopping_cart::Column::RecipeId)
                .filter(shopping_cart::Column::UserId.eq(uid))
                .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids))
                .into_tuple::<i32>()
                .all(db)
                .await?
                .into_iter()
                .collect();
            (favorited, in_cart)
        }
        None => (HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|r| -> Result<RecipeResponse, DbErr> {
            let author = authors.get(&r.author_id).cloned().ok_or_else(|| {
                DbErr::RecordNotFound(format!("author {} of recipe {}", r.author_id, r.id))
            })?;
            Ok(RecipeResponse {
                id: r.id,
                tags: tags_by_recipe.remove(&r.id).unwrap_or_default(),
                author: UserResponse::new(author, followed.contains(&r.author_id)),
                ingredients: ingredients_by_recipe.remove(&r.id).unwrap_or_default(),
                is_favorited: favorited.contains(&r.id),
                is_in_shopping_cart: in_cart.contains(&r.id),
                image: media_url(public_url, &r.image),
                name: r.name,
                text: r.text,
                cooking_time: r.cooking_time,
            })
        })
        .collect()
}

/// Build subscription entries for authors the viewer follows.
///
/// Each entry carries the author's recipes newest first, cut to
/// `recipes_limit` when given, and the uncut count.
pub async fn subscription_entries<C: ConnectionTrait>(
    db: &C,
    public_url: &str,
    authors: Vec<user::Model>,
    recipes_limit: Option<u64>,
) -> Result<Vec<SubscriptionResponse>, DbErr> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }
    let author_ids: Vec<i32> = authors.iter().map(|a| a.id).collect();

    let mut by_author: HashMap<i32, Vec<recipe::Model>> = HashMap::new();
    let recipes = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.is_in(author_ids))
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id)
        .all(db)
        .await?;
    for r in recipes {
        by_author.entry(r.author_id).or_default().push(r);
    }

    Ok(authors
        .into_iter()
        .map(|author| {
            let recipes = by_author.remove(&author.id).unwrap_or_default();
            let recipes_count = recipes.len() as u64;
            let take = recipes_limit.map_or(recipes.len(), |n| n as usize);
            SubscriptionResponse {
                id: author.id,
                email: author.email,
                username: author.username,
                first_name: author.first_name,
                last_name: author.last_name,
                is_subscribed: true,
                recipes: recipes
                    .into_iter()
                    .take(take)
                    .map(|r| short_recipe(r, public_url))
                    .collect(),
                recipes_count,
            }
        })
        .collect())
}
