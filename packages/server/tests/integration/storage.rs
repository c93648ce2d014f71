use crate::common::{TestApp, Upload, routes};

mod serve {
    use super::*;

    #[tokio::test]
    async fn unknown_object_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/storage/machines/missing.png").await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn path_traversal_is_not_served() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/storage/..%2F..%2Fetc%2Fpasswd").await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn objects_are_served_with_long_lived_caching() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let customer = app
            .create_customer(&token, "Siemens", vec![Upload::png("logo")])
            .await;

        let res = app
            .client
            .get(customer["logo_url"].as_str().unwrap())
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        let cache_control = res.headers()["cache-control"].to_str().unwrap();
        assert!(cache_control.contains("immutable"));
    }
}

mod sweep {
    use super::*;

    #[tokio::test]
    async fn sweep_removes_media_of_deleted_records_only() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let kept = app
            .create_machine(&token, "Keeper", true, vec![Upload::png("image")])
            .await;
        let doomed = app
            .create_machine(
                &token,
                "Doomed",
                false,
                vec![Upload::png("image"), Upload::mp4("video")],
            )
            .await;
        app.create_customer(&token, "Siemens", vec![Upload::png("logo")])
            .await;
        assert_eq!(app.stored_objects().len(), 4);

        let id = doomed["id"].as_str().unwrap();
        let deleted = app.delete_with_token(&routes::admin_machine(id), &token).await;
        assert_eq!(deleted.status, 204);
        assert_eq!(app.stored_objects().len(), 4);

        let res = app
            .post_with_token(&routes::sweep_with_grace(0), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["scanned"], 4);
        assert_eq!(res.body["referenced"], 2);
        assert_eq!(res.body["deleted"], 2);
        assert_eq!(res.body["kept_recent"], 0);
        assert_eq!(app.stored_objects().len(), 2);

        let image = app
            .client
            .get(kept["image_url"].as_str().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(image.status(), 200);
    }

    #[tokio::test]
    async fn default_grace_period_keeps_fresh_orphans() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app
            .create_machine(&token, "Short-lived", false, vec![Upload::png("image")])
            .await;
        let id = machine["id"].as_str().unwrap();
        app.delete_with_token(&routes::admin_machine(id), &token)
            .await;

        let res = app.post_with_token(routes::SWEEP, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["deleted"], 0);
        assert_eq!(res.body["kept_recent"], 1);
        assert_eq!(app.stored_objects().len(), 1);
    }

    #[tokio::test]
    async fn replaced_image_is_collected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app
            .create_machine(&token, "Welder", false, vec![Upload::png("image")])
            .await;
        let id = machine["id"].as_str().unwrap();
        let updated = app
            .send_form(
                reqwest::Method::PATCH,
                &routes::admin_machine(id),
                &[],
                vec![Upload::png("image")],
                &token,
            )
            .await;
        assert_eq!(updated.status, 200, "{}", updated.text);

        let res = app
            .post_with_token(&routes::sweep_with_grace(0), &token)
            .await;

        assert_eq!(res.body["deleted"], 1);
        let remaining = app.stored_objects();
        assert_eq!(remaining.len(), 1);
        assert!(
            updated.body["image_url"]
                .as_str()
                .unwrap()
                .ends_with(&remaining[0])
        );
    }

    #[tokio::test]
    async fn sweep_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app.post_with_token(routes::SWEEP, "forged").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
