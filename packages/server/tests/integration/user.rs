use serde_json::json;

use crate::common::{PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::USERS, &TestApp::registration("alice"))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["email"], "alice@example.com");
        assert_eq!(res.body["first_name"], "Test");
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let res = app
            .post_without_token(
                routes::USERS,
                &json!({
                    "email": "alice@example.com",
                    "username": "alice2",
                    "first_name": "A",
                    "last_name": "B",
                    "password": PASSWORD,
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let res = app
            .post_without_token(
                routes::USERS,
                &json!({
                    "email": "other@example.com",
                    "username": "alice",
                    "first_name": "A",
                    "last_name": "B",
                    "password": PASSWORD,
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn reserved_username_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::USERS, &TestApp::registration("me"))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = TestApp::spawn().await;
        let mut body = TestApp::registration("alice");
        body["password"] = json!("short");

        let res = app.post_without_token(routes::USERS, &body).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let app = TestApp::spawn().await;
        let mut body = TestApp::registration("alice");
        body["email"] = json!("not-an-email");

        let res = app.post_without_token(routes::USERS, &body).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod profiles {
    use super::*;

    #[tokio::test]
    async fn users_are_listed_by_username_with_pagination() {
        let app = TestApp::spawn().await;
        for name in ["carol", "alice", "bob"] {
            app.create_user(name).await;
        }

        let res = app
            .get_without_token(&format!("{}?limit=2", routes::USERS))
            .await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["username"], "alice");
        assert_eq!(data[1]["username"], "bob");
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let page2 = app
            .get_without_token(&format!("{}?limit=2&page=2", routes::USERS))
            .await;
        assert_eq!(page2.body["data"][0]["username"], "carol");
    }

    #[tokio::test]
    async fn profile_can_be_fetched_anonymously() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app.get_without_token(&routes::user(alice.id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["is_subscribed"], false);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::user(9999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn profile_reports_subscription_relative_to_viewer() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;

        let sub = app
            .post_with_token(&routes::subscribe(bob.id), &json!({}), &alice.token)
            .await;
        assert_eq!(sub.status, 201, "{}", sub.text);

        let as_alice = app.get_with_token(&routes::user(bob.id), &alice.token).await;
        assert_eq!(as_alice.body["is_subscribed"], true);

        let anonymous = app.get_without_token(&routes::user(bob.id)).await;
        assert_eq!(anonymous.body["is_subscribed"], false);
    }
}

mod set_password {
    use super::*;

    #[tokio::test]
    async fn password_can_be_changed() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .post_with_token(
                routes::SET_PASSWORD,
                &json!({"current_password": PASSWORD, "new_password": "brand-new-pass"}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        let old = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": PASSWORD}),
            )
            .await;
        assert_eq!(old.status, 401);

        let new = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "brand-new-pass"}),
            )
            .await;
        assert_eq!(new.status, 200);
    }

    #[tokio::test]
    async fn wrong_current_password_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .post_with_token(
                routes::SET_PASSWORD,
                &json!({"current_password": "not-my-pass", "new_password": "brand-new-pass"}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::SET_PASSWORD,
                &json!({"current_password": PASSWORD, "new_password": "brand-new-pass"}),
            )
            .await;

        assert_eq!(res.status, 401);
    }
}
