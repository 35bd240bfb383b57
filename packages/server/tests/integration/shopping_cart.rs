use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn export_sums_amounts_across_recipes() {
    let app = TestApp::spawn().await;
    let cook = app.create_user("cook").await;
    let tag = app.create_tag("bake", "#A0A0A0", "bake").await;
    let salt = app.create_ingredient("salt", "g").await;
    let flour = app.create_ingredient("flour", "g").await;

    let bread = app
        .create_recipe(&cook.token, "Bread", &[tag], &[(salt, 5), (flour, 500)])
        .await;
    let pretzel = app
        .create_recipe(&cook.token, "Pretzel", &[tag], &[(salt, 3)])
        .await;
    for id in [bread, pretzel] {
        let res = app
            .post_with_token(&routes::shopping_cart(id), &json!({}), &cook.token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    let res = app
        .get_with_token(routes::DOWNLOAD_SHOPPING_CART, &cook.token)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.header("content-type").starts_with("text/plain"));
    assert_eq!(
        res.header("content-disposition"),
        "attachment; filename=\"cook_shopping_list.txt\""
    );

    assert!(res.text.starts_with("Shopping list for: Test cook\n"));
    assert!(res.text.contains("- salt (g) - 8\n"), "{}", res.text);
    assert!(res.text.contains("- flour (g) - 500\n"), "{}", res.text);
    let flour_at = res.text.find("- flour").unwrap();
    let salt_at = res.text.find("- salt").unwrap();
    assert!(flour_at < salt_at);
    assert!(res.text.contains("Foodgram ("));
}

#[tokio::test]
async fn same_name_different_units_stay_separate() {
    let app = TestApp::spawn().await;
    let cook = app.create_user("cook").await;
    let tag = app.create_tag("drinks", "#0000FF", "drinks").await;
    let milk_ml = app.create_ingredient("milk", "ml").await;
    let milk_cup = app.create_ingredient("milk", "cup").await;

    let id = app
        .create_recipe(&cook.token, "Shake", &[tag], &[(milk_ml, 200), (milk_cup, 1)])
        .await;
    app.post_with_token(&routes::shopping_cart(id), &json!({}), &cook.token)
        .await;

    let res = app
        .get_with_token(routes::DOWNLOAD_SHOPPING_CART, &cook.token)
        .await;

    assert!(res.text.contains("- milk (ml) - 200\n"), "{}", res.text);
    assert!(res.text.contains("- milk (cup) - 1\n"), "{}", res.text);
}

#[tokio::test]
async fn other_users_carts_are_not_included() {
    let app = TestApp::spawn().await;
    let cook = app.create_user("cook").await;
    let guest = app.create_user("guest").await;
    let tag = app.create_tag("bake", "#A0A0A0", "bake").await;
    let salt = app.create_ingredient("salt", "g").await;
    let sugar = app.create_ingredient("sugar", "g").await;

    let salty = app
        .create_recipe(&cook.token, "Salty", &[tag], &[(salt, 5)])
        .await;
    let sweet = app
        .create_recipe(&cook.token, "Sweet", &[tag], &[(sugar, 9)])
        .await;
    app.post_with_token(&routes::shopping_cart(salty), &json!({}), &cook.token)
        .await;
    app.post_with_token(&routes::shopping_cart(sweet), &json!({}), &guest.token)
        .await;

    let res = app
        .get_with_token(routes::DOWNLOAD_SHOPPING_CART, &cook.token)
        .await;

    assert!(res.text.contains("- salt (g) - 5\n"));
    assert!(!res.text.contains("sugar"));
}

#[tokio::test]
async fn empty_cart_cannot_be_downloaded() {
    let app = TestApp::spawn().await;
    let cook = app.create_user("cook").await;

    let res = app
        .get_with_token(routes::DOWNLOAD_SHOPPING_CART, &cook.token)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "SHOPPING_CART_EMPTY");
}

#[tokio::test]
async fn add_twice_and_remove_twice() {
    let app = TestApp::spawn().await;
    let cook = app.create_user("cook").await;
    let tag = app.create_tag("bake", "#A0A0A0", "bake").await;
    let salt = app.create_ingredient("salt", "g").await;
    let id = app
        .create_recipe(&cook.token, "Bread", &[tag], &[(salt, 5)])
        .await;

    let first = app
        .post_with_token(&routes::shopping_cart(id), &json!({}), &cook.token)
        .await;
    assert_eq!(first.status, 201);
    assert_eq!(first.body["name"], "Bread");

    let again = app
        .post_with_token(&routes::shopping_cart(id), &json!({}), &cook.token)
        .await;
    assert_eq!(again.body["code"], "ALREADY_EXISTS");
    assert_eq!(
        again.body["message"],
        format!("Recipe {id} is already in the shopping cart")
    );

    let removed = app
        .delete_with_token(&routes::shopping_cart(id), &cook.token)
        .await;
    assert_eq!(removed.status, 204);

    let missing = app
        .delete_with_token(&routes::shopping_cart(id), &cook.token)
        .await;
    assert_eq!(missing.status, 400);
    assert_eq!(missing.body["code"], "NOT_PRESENT");
    assert_eq!(
        missing.body["message"],
        format!("Recipe {id} is not in the shopping cart")
    );
}

#[tokio::test]
async fn download_requires_authentication() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::DOWNLOAD_SHOPPING_CART).await;

    assert_eq!(res.status, 401);
}
