use sea_orm::{ActiveModelTrait, Set};
use server::entity::ingredient;

use crate::common::{TestApp, routes};

mod tags {
    use super::*;

    #[tokio::test]
    async fn tags_are_listed_by_name_without_pagination() {
        let app = TestApp::spawn().await;
        app.create_tag("lunch", "#00FF00", "lunch").await;
        app.create_tag("breakfast", "#E26C2D", "breakfast").await;

        let res = app.get_without_token(routes::TAGS).await;

        assert_eq!(res.status, 200);
        let tags = res.body.as_array().expect("tag list should be a plain array");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0]["slug"], "breakfast");
        assert_eq!(tags[0]["color"], "#E26C2D");
        assert_eq!(tags[1]["slug"], "lunch");
    }

    #[tokio::test]
    async fn single_tag_can_be_fetched() {
        let app = TestApp::spawn().await;
        let id = app.create_tag("dinner", "#123456", "dinner").await;

        let res = app.get_without_token(&routes::tag(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "dinner");
    }

    #[tokio::test]
    async fn unknown_tag_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::tag(4242)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod ingredients {
    use super::*;

    #[tokio::test]
    async fn name_filter_is_a_case_insensitive_prefix_match() {
        let app = TestApp::spawn().await;
        app.create_ingredient("Salt", "g").await;
        app.create_ingredient("sage", "g").await;
        app.create_ingredient("sugar", "g").await;
        app.create_ingredient("sea salt", "g").await;

        let res = app
            .get_without_token(&format!("{}?name=SA", routes::INGREDIENTS))
            .await;

        assert_eq!(res.status, 200);
        let mut names: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Salt", "sage"]);
    }

    #[tokio::test]
    async fn wildcards_in_the_filter_are_literal() {
        let app = TestApp::spawn().await;
        app.create_ingredient("salt", "g").await;
        app.create_ingredient("50% cream", "ml").await;

        let res = app
            .get_without_token(&format!("{}?name=%25", routes::INGREDIENTS))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 0);

        let res = app
            .get_without_token(&format!("{}?name=50%25", routes::INGREDIENTS))
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn without_filter_all_ingredients_are_returned() {
        let app = TestApp::spawn().await;
        app.create_ingredient("flour", "g").await;
        app.create_ingredient("milk", "ml").await;

        let res = app.get_without_token(routes::INGREDIENTS).await;

        assert_eq!(res.status, 200);
        let list = res.body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "flour");
        assert_eq!(list[1]["measurement_unit"], "ml");
    }

    #[tokio::test]
    async fn single_ingredient_can_be_fetched() {
        let app = TestApp::spawn().await;
        let id = app.create_ingredient("butter", "g").await;

        let res = app.get_without_token(&routes::ingredient(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id);
        assert_eq!(res.body["measurement_unit"], "g");

        let missing = app.get_without_token(&routes::ingredient(id + 100)).await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn name_and_unit_pair_is_unique_in_storage() {
        let app = TestApp::spawn().await;
        app.create_ingredient("salt", "g").await;

        let same_unit = ingredient::ActiveModel {
            name: Set("salt".into()),
            measurement_unit: Set("g".into()),
            ..Default::default()
        }
        .insert(&app.db)
        .await;
        assert!(same_unit.is_err());

        let other_unit = ingredient::ActiveModel {
            name: Set("salt".into()),
            measurement_unit: Set("pinch".into()),
            ..Default::default()
        }
        .insert(&app.db)
        .await;
        assert!(other_unit.is_ok());
    }
}
