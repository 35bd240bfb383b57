use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

async fn setup() -> (TestApp, TestUser, i32) {
    let app = TestApp::spawn().await;
    let author = app.create_user("author").await;
    let tag = app.create_tag("dinner", "#112233", "dinner").await;
    let salt = app.create_ingredient("salt", "g").await;
    let recipe = app
        .create_recipe(&author.token, "Soup", &[tag], &[(salt, 3)])
        .await;
    let fan = app.create_user("fan").await;
    (app, fan, recipe)
}

#[tokio::test]
async fn add_returns_short_recipe() {
    let (app, fan, recipe) = setup().await;

    let res = app
        .post_with_token(&routes::favorite(recipe), &json!({}), &fan.token)
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["id"], recipe);
    assert_eq!(res.body["name"], "Soup");
    assert_eq!(res.body["cooking_time"], 20);
    assert!(res.body["image"].as_str().unwrap().starts_with("/media/"));
    assert!(res.body.get("ingredients").is_none());

    let detail = app.get_with_token(&routes::recipe(recipe), &fan.token).await;
    assert_eq!(detail.body["is_favorited"], true);
    assert_eq!(detail.body["is_in_shopping_cart"], false);
}

#[tokio::test]
async fn favorites_are_per_user() {
    let (app, fan, recipe) = setup().await;
    let other = app.create_user("other").await;
    app.post_with_token(&routes::favorite(recipe), &json!({}), &fan.token)
        .await;

    let detail = app.get_with_token(&routes::recipe(recipe), &other.token).await;
    assert_eq!(detail.body["is_favorited"], false);

    let anon = app.get_without_token(&routes::recipe(recipe)).await;
    assert_eq!(anon.body["is_favorited"], false);
}

#[tokio::test]
async fn adding_twice_is_rejected() {
    let (app, fan, recipe) = setup().await;
    app.post_with_token(&routes::favorite(recipe), &json!({}), &fan.token)
        .await;

    let res = app
        .post_with_token(&routes::favorite(recipe), &json!({}), &fan.token)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "ALREADY_EXISTS");
    assert_eq!(
        res.body["message"],
        format!("Recipe {recipe} is already in favorites")
    );
}

#[tokio::test]
async fn remove_then_remove_again() {
    let (app, fan, recipe) = setup().await;
    app.post_with_token(&routes::favorite(recipe), &json!({}), &fan.token)
        .await;

    let first = app
        .delete_with_token(&routes::favorite(recipe), &fan.token)
        .await;
    assert_eq!(first.status, 204);

    let second = app
        .delete_with_token(&routes::favorite(recipe), &fan.token)
        .await;
    assert_eq!(second.status, 400);
    assert_eq!(second.body["code"], "NOT_PRESENT");
    assert_eq!(
        second.body["message"],
        format!("Recipe {recipe} is not in favorites")
    );
}

#[tokio::test]
async fn favorites_and_cart_are_separate() {
    let (app, fan, recipe) = setup().await;
    app.post_with_token(&routes::favorite(recipe), &json!({}), &fan.token)
        .await;

    let cart = app
        .post_with_token(&routes::shopping_cart(recipe), &json!({}), &fan.token)
        .await;
    assert_eq!(cart.status, 201, "{}", cart.text);

    let unfavorite = app
        .delete_with_token(&routes::favorite(recipe), &fan.token)
        .await;
    assert_eq!(unfavorite.status, 204);

    let detail = app.get_with_token(&routes::recipe(recipe), &fan.token).await;
    assert_eq!(detail.body["is_favorited"], false);
    assert_eq!(detail.body["is_in_shopping_cart"], true);
}

#[tokio::test]
async fn unknown_recipe() {
    let (app, fan, _) = setup().await;

    let add = app
        .post_with_token(&routes::favorite(4242), &json!({}), &fan.token)
        .await;
    assert_eq!(add.status, 400);
    assert_eq!(add.body["code"], "VALIDATION_ERROR");

    let remove = app
        .delete_with_token(&routes::favorite(4242), &fan.token)
        .await;
    assert_eq!(remove.status, 404);
    assert_eq!(remove.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn requires_authentication() {
    let (app, _, recipe) = setup().await;

    let res = app
        .post_without_token(&routes::favorite(recipe), &json!({}))
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}
