use axum::http::StatusCode;
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_create_assigns_caller_as_owner() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    let reply = app
        .post(
            "/api/v1/ads",
            &token,
            json!({
                "title": "Bike",
                "description": "Red, barely used",
                "image_url": "https://img.example.com/bike.png",
                "category": "Sport",
                "condition": "new",
                "user_id": 999,
            }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["title"], "Bike");
    assert_eq!(reply.body["condition"], "new");
    assert_ne!(reply.body["user_id"], 999);

    let id = reply.body["id"].as_i64().unwrap();
    let fetched = app.get(&format!("/api/v1/ads/{id}"), &token).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, reply.body);
}

#[tokio::test]
async fn test_create_reports_every_bad_field() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    let reply = app
        .post(
            "/api/v1/ads",
            &token,
            json!({
                "description": "no title",
                "image_url": "ftp://example.com/x.png",
                "category": "Sport",
                "condition": "broken",
            }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let mut fields = reply.error_fields();
    fields.sort();
    assert_eq!(fields, ["condition", "image_url", "title"]);

    let listing = app.get("/api/v1/ads", &token).await;
    assert_eq!(listing.body["count"], 0);
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    let reply = app.post("/api/v1/ads", &token, json!("just a string")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "validation_error");
}

#[tokio::test]
async fn test_search_is_case_insensitive_over_title_and_description() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    let in_title = app.create_ad(&token, "Велосипед горный", "26 дюймов").await;
    let in_description = app.create_ad(&token, "Продам", "Детский ВЕЛОСИПЕД").await;
    app.create_ad(&token, "Самокат", "Почти новый").await;

    // search=велосипед
    let reply = app
        .get(
            "/api/v1/ads?search=%D0%B2%D0%B5%D0%BB%D0%BE%D1%81%D0%B8%D0%BF%D0%B5%D0%B4",
            &token,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 2);
    let ids: Vec<i64> = reply.body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ad| ad["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [in_title, in_description]);
}

#[tokio::test]
async fn test_category_and_condition_filters_combine() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    for (title, category, condition) in [
        ("Ball", "Sport", "new"),
        ("Racket", "Sport", "used"),
        ("Lamp", "Home", "new"),
    ] {
        let reply = app
            .post(
                "/api/v1/ads",
                &token,
                json!({
                    "title": title,
                    "description": "-",
                    "category": category,
                    "condition": condition,
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let reply = app
        .get("/api/v1/ads?category=Sport&condition=new", &token)
        .await;
    assert_eq!(reply.body["count"], 1);
    assert_eq!(reply.body["results"][0]["title"], "Ball");

    let bad = app.get("/api/v1/ads?condition=mint", &token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pagination_bounds() {
    let app = TestApp::with_page_size(2);
    let token = app.signup("alice").await;

    let empty = app.get("/api/v1/ads", &token).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["num_pages"], 1);

    for title in ["One", "Two", "Three"] {
        app.create_ad(&token, title, "-").await;
    }

    let first = app.get("/api/v1/ads", &token).await;
    assert_eq!(first.body["count"], 3);
    assert_eq!(first.body["next"], 2);
    assert!(first.body["previous"].is_null());

    let last = app.get("/api/v1/ads?page=2", &token).await;
    assert_eq!(last.status, StatusCode::OK);
    assert_eq!(last.body["results"].as_array().unwrap().len(), 1);
    assert_eq!(last.body["results"][0]["title"], "Three");
    assert!(last.body["next"].is_null());
    assert_eq!(last.body["previous"], 1);

    let beyond = app.get("/api/v1/ads?page=3", &token).await;
    assert_eq!(beyond.status, StatusCode::NOT_FOUND);

    for bad in ["0", "-1", "abc"] {
        let reply = app.get(&format!("/api/v1/ads?page={bad}"), &token).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "page={bad}");
    }
}

#[tokio::test]
async fn test_only_the_owner_mutates() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let ad = app.create_ad(&alice, "Bike", "Red").await;
    let uri = format!("/api/v1/ads/{ad}");

    let patch = app.patch(&uri, &bob, json!({ "title": "Mine now" })).await;
    assert_eq!(patch.status, StatusCode::FORBIDDEN);
    let put = app
        .put(
            &uri,
            &bob,
            json!({ "title": "x", "description": "x", "category": "x", "condition": "new" }),
        )
        .await;
    assert_eq!(put.status, StatusCode::FORBIDDEN);
    let delete = app.delete(&uri, &bob).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    // A non-owner with an invalid body still gets 403, not 400.
    let invalid = app.patch(&uri, &bob, json!({ "condition": "mint" })).await;
    assert_eq!(invalid.status, StatusCode::FORBIDDEN);

    let unchanged = app.get(&uri, &bob).await;
    assert_eq!(unchanged.body["title"], "Bike");
}

#[tokio::test]
async fn test_missing_ad_is_not_found() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    for uri in ["/api/v1/ads/4242", "/api/v1/ads/not-a-number"] {
        assert_eq!(app.get(uri, &token).await.status, StatusCode::NOT_FOUND, "{uri}");
    }
    let patch = app
        .patch("/api/v1/ads/4242", &token, json!({ "title": "x" }))
        .await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.delete("/api/v1/ads/4242", &token).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_owner_updates() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    let created = app
        .post(
            "/api/v1/ads",
            &token,
            json!({
                "title": "Bike",
                "description": "Red",
                "image_url": "https://img.example.com/bike.png",
                "category": "Sport",
                "condition": "new",
            }),
        )
        .await;
    let uri = format!("/api/v1/ads/{}", created.body["id"]);

    let patched = app
        .patch(&uri, &token, json!({ "condition": "used", "image_url": null }))
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["condition"], "used");
    assert!(patched.body["image_url"].is_null());
    assert_eq!(patched.body["title"], "Bike");
    assert_eq!(patched.body["created_at"], created.body["created_at"]);

    let incomplete = app.put(&uri, &token, json!({ "title": "Only title" })).await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);

    let replaced = app
        .put(
            &uri,
            &token,
            json!({
                "title": "Tandem",
                "description": "For two",
                "category": "Sport",
                "condition": "used",
            }),
        )
        .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["title"], "Tandem");
    assert_eq!(replaced.body["id"], created.body["id"]);
}

#[tokio::test]
async fn test_delete_cascades_to_proposals() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let bike = app.create_ad(&alice, "Bike", "Red").await;
    let guitar = app.create_ad(&bob, "Guitar", "Acoustic").await;
    let lamp = app.create_ad(&bob, "Lamp", "Desk").await;

    let outgoing = app.propose(&alice, bike, guitar).await;
    let incoming = app.propose(&bob, lamp, bike).await;
    let unrelated = app.propose(&bob, guitar, lamp).await;

    let deleted = app.delete(&format!("/api/v1/ads/{bike}"), &alice).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(deleted.body.is_null());

    for id in [outgoing, incoming] {
        let reply = app.get(&format!("/api/v1/proposals/{id}"), &bob).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }
    let kept = app.get(&format!("/api/v1/proposals/{unrelated}"), &bob).await;
    assert_eq!(kept.status, StatusCode::OK);
}

#[tokio::test]
async fn test_body_is_read_after_lookup_and_ownership() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let ad = app.create_ad(&alice, "Bike", "Red").await;
    let uri = format!("/api/v1/ads/{ad}");

    let foreign = app.patch(&uri, &bob, json!({ "title": 5 })).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    let foreign = app.put(&uri, &bob, json!("not an object")).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let missing = app
        .put("/api/v1/ads/4242", &alice, json!({ "condition": ["new"] }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    let missing = app
        .patch("/api/v1/ads/4242", &alice, json!({ "title": 5 }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let own = app
        .patch(&uri, &alice, json!({ "title": 5, "condition": "used" }))
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);
    assert_eq!(own.error_fields(), ["title"]);
    assert_eq!(app.get(&uri, &alice).await.body["title"], "Bike");
}

#[tokio::test]
async fn test_repeated_query_parameter_is_a_json_validation_error() {
    let app = TestApp::new();
    let token = app.signup("alice").await;
    let reply = app.get("/api/v1/ads?category=a&category=b", &token).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "validation_error");
    assert_eq!(reply.error_fields(), ["category"]);
}
