use reqwest::Method;

use crate::common::{MAX_OBJECT_SIZE, TestApp, Upload, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn machine_with_image_is_listed_everywhere() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let machine = app
            .create_machine(&token, "Robot Arm X1", true, vec![Upload::png("image")])
            .await;

        assert_eq!(machine["name"], "Robot Arm X1");
        assert_eq!(machine["category"], "Robotics");
        assert_eq!(machine["is_featured"], true);
        assert!(machine["video_url"].is_null());
        let image_url = machine["image_url"].as_str().unwrap();
        assert!(image_url.starts_with(&app.url("/storage/machines/")));
        assert!(image_url.ends_with(".png"));

        let all = app.get_without_token(routes::MACHINES).await;
        assert_eq!(all.status, 200);
        assert_eq!(all.body["total"], 1);
        assert_eq!(all.body["machines"][0]["id"], machine["id"]);

        let featured = app.get_without_token(routes::FEATURED_MACHINES).await;
        assert_eq!(featured.body["machines"][0]["id"], machine["id"]);

        let admin = app.get_with_token(routes::ADMIN_MACHINES, &token).await;
        assert_eq!(admin.body["total"], 1);
    }

    #[tokio::test]
    async fn uploaded_media_is_served_at_its_public_url() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let machine = app
            .create_machine(
                &token,
                "Press",
                false,
                vec![Upload::png("image"), Upload::mp4("video")],
            )
            .await;

        let image = app
            .client
            .get(machine["image_url"].as_str().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(image.status(), 200);
        assert_eq!(image.headers()["content-type"], "image/png");
        assert_eq!(
            image.bytes().await.unwrap().as_ref(),
            Upload::png("image").bytes.as_slice()
        );

        let video_url = machine["video_url"].as_str().unwrap();
        assert!(video_url.contains("/storage/videos/"));
        assert_eq!(app.stored_objects().len(), 2);
    }

    #[tokio::test]
    async fn defaults_apply_when_optional_fields_are_absent() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(Method::POST, routes::ADMIN_MACHINES, &[("name", "Lathe")], vec![], &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["category"], "General");
        assert_eq!(res.body["is_featured"], false);
        assert!(res.body["image_url"].is_null());
        assert!(res.body["description"].is_null());
    }

    #[tokio::test]
    async fn specifications_keep_their_values() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(
                Method::POST,
                routes::ADMIN_MACHINES,
                &[
                    ("name", "CNC Mill"),
                    ("specifications", r#"{"Spindle":"12000 rpm","Axes":"5"}"#),
                ],
                vec![],
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        let fetched = app.get_without_token(&routes::machine(&id)).await;
        assert_eq!(fetched.body["specifications"]["Spindle"], "12000 rpm");
        assert_eq!(fetched.body["specifications"]["Axes"], "5");
    }

    #[tokio::test]
    async fn empty_name_is_rejected_before_anything_is_stored() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(
                Method::POST,
                routes::ADMIN_MACHINES,
                &[("name", "   ")],
                vec![Upload::png("image")],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.stored_objects().is_empty());
        let all = app.get_without_token(routes::MACHINES).await;
        assert_eq!(all.body["total"], 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_and_nothing_is_saved() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let big = Upload {
            field: "image",
            file_name: "huge.png",
            mime: "image/png",
            bytes: vec![0u8; MAX_OBJECT_SIZE as usize + 1],
        };

        let res = app
            .send_form(Method::POST, routes::ADMIN_MACHINES, &[("name", "Crane")], vec![big], &token)
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert!(app.stored_objects().is_empty());
        let all = app.get_with_token(routes::ADMIN_MACHINES, &token).await;
        assert_eq!(all.body["total"], 0);
    }

    #[tokio::test]
    async fn malformed_specifications_are_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(
                Method::POST,
                routes::ADMIN_MACHINES,
                &[("name", "Drill"), ("specifications", "not json")],
                vec![],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn featured_list_holds_the_three_newest_featured_machines() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        for name in ["First", "Second", "Third", "Fourth"] {
            app.create_machine(&token, name, true, vec![]).await;
        }
        app.create_machine(&token, "Hidden", false, vec![]).await;

        let featured = app.get_without_token(routes::FEATURED_MACHINES).await;
        let names: Vec<_> = featured.body["machines"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Fourth", "Third", "Second"]);

        let all = app.get_without_token(routes::MACHINES).await;
        assert_eq!(all.body["total"], 5);
        assert_eq!(all.body["machines"][0]["name"], "Hidden");
    }

    #[tokio::test]
    async fn unknown_machine_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&routes::machine("0190f5c2-7d1e-7c3a-9b1e-2f4d5a6b7c8d"))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::machine("not-a-uuid")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn description_only_edit_keeps_media_and_advances_updated_at() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app
            .create_machine(&token, "Robot Arm X1", true, vec![Upload::png("image")])
            .await;
        let id = machine["id"].as_str().unwrap();

        // Warm the detail cache so the edit has to invalidate it.
        let before = app.get_without_token(&routes::machine(id)).await;
        assert_eq!(before.status, 200);

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_machine(id),
                &[("description", "Six-axis, 10 kg payload")],
                vec![],
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["description"], "Six-axis, 10 kg payload");
        assert_eq!(res.body["image_url"], machine["image_url"]);
        assert_eq!(res.body["name"], "Robot Arm X1");
        assert_eq!(res.body["created_at"], machine["created_at"]);
        assert_ne!(res.body["updated_at"], machine["updated_at"]);

        let after = app.get_without_token(&routes::machine(id)).await;
        assert_eq!(after.body["description"], "Six-axis, 10 kg payload");
        let listed = app.get_without_token(routes::MACHINES).await;
        assert_eq!(
            listed.body["machines"][0]["description"],
            "Six-axis, 10 kg payload"
        );
    }

    #[tokio::test]
    async fn empty_optional_field_clears_it() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app
            .send_form(
                Method::POST,
                routes::ADMIN_MACHINES,
                &[("name", "Saw"), ("technical_info", "3 kW motor")],
                vec![],
                &token,
            )
            .await;
        let id = created.id();

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_machine(&id),
                &[("technical_info", "")],
                vec![],
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["technical_info"].is_null());
    }

    #[tokio::test]
    async fn new_image_replaces_the_old_url() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app
            .create_machine(&token, "Welder", false, vec![Upload::png("image")])
            .await;
        let id = machine["id"].as_str().unwrap();

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_machine(id),
                &[],
                vec![Upload::png("image")],
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_ne!(res.body["image_url"], machine["image_url"]);
        assert!(res.body["image_url"].as_str().unwrap().contains("/machines/"));
    }

    #[tokio::test]
    async fn unfeaturing_removes_machine_from_featured_list() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app.create_machine(&token, "Forklift", true, vec![]).await;
        let id = machine["id"].as_str().unwrap();

        let featured = app.get_without_token(routes::FEATURED_MACHINES).await;
        assert_eq!(featured.body["total"], 1);

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_machine(id),
                &[("is_featured", "false")],
                vec![],
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let featured = app.get_without_token(routes::FEATURED_MACHINES).await;
        assert_eq!(featured.body["total"], 0);
    }

    #[tokio::test]
    async fn clearing_the_name_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app.create_machine(&token, "Boiler", false, vec![]).await;
        let id = machine["id"].as_str().unwrap();

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_machine(id),
                &[("name", "")],
                vec![],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn editing_a_missing_machine_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .send_form(
                Method::PATCH,
                &routes::admin_machine("0190f5c2-7d1e-7c3a-9b1e-2f4d5a6b7c8d"),
                &[("name", "Ghost")],
                vec![],
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleted_machine_disappears_from_every_read() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app.create_machine(&token, "Robot Arm X1", true, vec![]).await;
        let id = machine["id"].as_str().unwrap();

        assert_eq!(app.get_without_token(&routes::machine(id)).await.status, 200);
        assert_eq!(
            app.get_without_token(routes::FEATURED_MACHINES).await.body["total"],
            1
        );

        let res = app.delete_with_token(&routes::admin_machine(id), &token).await;
        assert_eq!(res.status, 204);

        assert_eq!(app.get_without_token(&routes::machine(id)).await.status, 404);
        assert_eq!(app.get_without_token(routes::MACHINES).await.body["total"], 0);
        assert_eq!(
            app.get_without_token(routes::FEATURED_MACHINES).await.body["total"],
            0
        );
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app.create_machine(&token, "Kiln", false, vec![]).await;
        let id = machine["id"].as_str().unwrap();

        assert_eq!(
            app.delete_with_token(&routes::admin_machine(id), &token)
                .await
                .status,
            204
        );
        let again = app.delete_with_token(&routes::admin_machine(id), &token).await;

        assert_eq!(again.status, 404);
        assert_eq!(again.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_requires_authentication() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let machine = app.create_machine(&token, "Pump", false, vec![]).await;
        let id = machine["id"].as_str().unwrap();

        let res = app
            .delete_with_token(&routes::admin_machine(id), "forged")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(app.get_without_token(routes::MACHINES).await.body["total"], 1);
    }
}
