use reqwest::Method;

use crate::common::{TestApp, Upload, routes};

fn names(body: &serde_json::Value) -> Vec<String> {
    body["customers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

mod create {
    use super::*;

    #[tokio::test]
    async fn new_customer_is_featured_and_public_by_default() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let customer = app.create_customer(&token, "ABB Ltd", vec![]).await;

        assert_eq!(customer["name"], "ABB Ltd");
        assert_eq!(customer["is_featured"], true);
        assert!(customer["logo_url"].is_null());

        let public = app.get_without_token(routes::CUSTOMERS).await;
        assert_eq!(public.status, 200);
        assert_eq!(names(&public.body), vec!["ABB Ltd"]);
    }

    #[tokio::test]
    async fn unfeatured_customer_is_only_listed_for_admins() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(
                Method::POST,
                routes::ADMIN_CUSTOMERS,
                &[("name", "Quiet Corp"), ("is_featured", "false")],
                vec![],
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let public = app.get_without_token(routes::CUSTOMERS).await;
        assert_eq!(public.body["total"], 0);

        let admin = app.get_with_token(routes::ADMIN_CUSTOMERS, &token).await;
        assert_eq!(names(&admin.body), vec!["Quiet Corp"]);
    }

    #[tokio::test]
    async fn logo_is_stored_under_customers_prefix() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let customer = app
            .create_customer(&token, "Siemens", vec![Upload::png("logo")])
            .await;

        let logo_url = customer["logo_url"].as_str().unwrap();
        assert!(logo_url.starts_with(&app.url("/storage/customers/")));
        let objects = app.stored_objects();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].starts_with("customers/"));
    }

    #[tokio::test]
    async fn missing_name_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(
                Method::POST,
                routes::ADMIN_CUSTOMERS,
                &[("description", "No name given")],
                vec![Upload::png("logo")],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.stored_objects().is_empty());
    }

    #[tokio::test]
    async fn creating_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .send_form(
                Method::POST,
                routes::ADMIN_CUSTOMERS,
                &[("name", "Intruder")],
                vec![],
                "forged",
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn public_list_is_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        for name in ["Alpha", "Beta", "Gamma"] {
            app.create_customer(&token, name, vec![]).await;
        }

        let public = app.get_without_token(routes::CUSTOMERS).await;
        assert_eq!(names(&public.body), vec!["Gamma", "Beta", "Alpha"]);
        assert_eq!(public.body["total"], 3);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn unfeaturing_hides_customer_from_public_list() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let customer = app.create_customer(&token, "ABB Ltd", vec![]).await;
        let id = customer["id"].as_str().unwrap();

        // Populate the public list first so the edit must refresh it.
        assert_eq!(app.get_without_token(routes::CUSTOMERS).await.body["total"], 1);

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_customer(id),
                &[("is_featured", "false")],
                vec![],
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_featured"], false);

        assert_eq!(app.get_without_token(routes::CUSTOMERS).await.body["total"], 0);
        let admin = app.get_with_token(routes::ADMIN_CUSTOMERS, &token).await;
        assert_eq!(admin.body["customers"][0]["is_featured"], false);
    }

    #[tokio::test]
    async fn replacing_the_logo_keeps_other_fields() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app
            .send_form(
                Method::POST,
                routes::ADMIN_CUSTOMERS,
                &[("name", "Bosch"), ("description", "Long-time partner")],
                vec![Upload::png("logo")],
                &token,
            )
            .await;
        assert_eq!(created.status, 201, "{}", created.text);
        let id = created.id();

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_customer(&id),
                &[],
                vec![Upload::png("logo")],
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_ne!(res.body["logo_url"], created.body["logo_url"]);
        assert_eq!(res.body["description"], "Long-time partner");
        assert_eq!(res.body["name"], "Bosch");
    }

    #[tokio::test]
    async fn renaming_shows_in_public_list() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let customer = app.create_customer(&token, "Old Name", vec![]).await;
        let id = customer["id"].as_str().unwrap();
        app.get_without_token(routes::CUSTOMERS).await;

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_customer(id),
                &[("name", "New Name")],
                vec![],
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let public = app.get_without_token(routes::CUSTOMERS).await;
        assert_eq!(names(&public.body), vec!["New Name"]);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleted_customer_disappears_from_both_lists() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let customer = app.create_customer(&token, "ABB Ltd", vec![]).await;
        let id = customer["id"].as_str().unwrap();
        app.get_without_token(routes::CUSTOMERS).await;

        let res = app.delete_with_token(&routes::admin_customer(id), &token).await;
        assert_eq!(res.status, 204);

        assert_eq!(app.get_without_token(routes::CUSTOMERS).await.body["total"], 0);
        assert_eq!(
            app.get_with_token(routes::ADMIN_CUSTOMERS, &token)
                .await
                .body["total"],
            0
        );
    }

    #[tokio::test]
    async fn deleting_unknown_customer_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .delete_with_token(
                &routes::admin_customer("0190f5c2-7d1e-7c3a-9b1e-2f4d5a6b7c8d"),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}
