mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{TEST_SECRET, TestApp, spawn_app, spawn_app_with_catalog, two_category_catalog};
use kb_service::models::{ArticleInput, ArticleStatus, CategoryInput, Difficulty};
use serde_json::json;

async fn plumbing_id(app: &TestApp) -> i64 {
    app.store
        .upsert_category(&CategoryInput {
            slug: "plumbing".into(),
            name: "Plumbing".into(),
            description: None,
            icon: None,
            is_active: true,
        })
        .await
        .unwrap()
        .id
}

fn article(slug: &str, category_id: i64, status: ArticleStatus) -> ArticleInput {
    ArticleInput {
        slug: slug.to_string(),
        title: format!("Article {}", slug),
        content: "<p>Body</p>".to_string(),
        category_id,
        difficulty: Difficulty::Easy,
        time_estimate_min: 15,
        tools: vec![],
        steps: vec![],
        status,
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_is_plain_ok() {
    let app = spawn_app(None).await;
    let (status, _, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn health_does_not_need_the_store() {
    let app = spawn_app(None).await;
    app.store.close().await;

    let (status, _, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, _) = app.get_json("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = app.get_json("/seed-status").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn root_and_json_health() {
    let app = spawn_app(None).await;
    let (status, _, body) = app
        .send(Request::get("/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"FixGeni API is running");

    let (status, body) = app.get_json("/_health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = app.get_json("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "sqlite");
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let app = spawn_app(None).await;
    let (_, headers, _) = app
        .send(
            Request::get("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_some());
    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");

    let (_, headers, _) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert!(!headers.get("x-request-id").unwrap().is_empty());
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    let app = spawn_app(None).await;
    app.get_json("/api/kb/categories").await;

    let (status, headers, body) = app
        .send(Request::get("/metrics").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert!(String::from_utf8_lossy(&body).contains("kb_http_requests_total"));
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn categories_listed_by_name_after_seed() {
    let app = spawn_app_with_catalog(Some(TEST_SECRET), two_category_catalog()).await;
    let (status, _) = app
        .post_json("/api/admin/seed", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get_json("/api/kb/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["name"], "Electrical");
    assert_eq!(body["items"][1]["name"], "Plumbing");
    assert_eq!(body["items"][0]["isActive"], true);
}

#[tokio::test]
async fn active_only_filter() {
    let app = spawn_app(None).await;
    for (slug, active) in [("roofing", true), ("attic", false)] {
        app.store
            .create_category(&CategoryInput {
                slug: slug.into(),
                name: slug.to_uppercase(),
                description: None,
                icon: None,
                is_active: active,
            })
            .await
            .unwrap();
    }

    let (_, all) = app.get_json("/api/kb/categories").await;
    assert_eq!(all["total"], 2);

    let (_, active) = app.get_json("/api/kb/categories?activeOnly=true").await;
    assert_eq!(active["total"], 1);
    assert_eq!(active["items"][0]["slug"], "roofing");
}

#[tokio::test]
async fn create_category_derives_slug_and_rejects_duplicates() {
    let app = spawn_app(None).await;

    let (status, body) = app
        .post_json(
            "/api/kb/categories",
            json!({ "name": "Outdoor Lighting", "icon": "sun" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "outdoor-lighting");
    assert_eq!(body["isActive"], true);

    let (status, body) = app
        .post_json(
            "/api/kb/categories",
            json!({ "name": "Outdoor lighting!" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "slug already exists");

    let (status, _) = app
        .post_json("/api/kb/categories", json!({ "name": "" }), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post_json("/api/kb/categories", json!({ "name": "!!!" }), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_category_rejects_blank_name() {
    let app = spawn_app(None).await;

    let (status, _) = app
        .post_json(
            "/api/kb/categories",
            json!({ "name": "   ", "slug": "blank" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.store.find_category_by_slug("blank").await.unwrap().is_none());
}

#[tokio::test]
async fn create_category_with_blank_slug_uses_name() {
    let app = spawn_app(None).await;

    let (status, body) = app
        .post_json(
            "/api/kb/categories",
            json!({ "name": "Garage Doors", "slug": "   " }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "garage-doors");
    assert_eq!(body["name"], "Garage Doors");
}

// ============================================================================
// Articles
// ============================================================================

#[tokio::test]
async fn second_page_of_twenty_five() {
    let app = spawn_app(None).await;
    let category_id = plumbing_id(&app).await;
    for i in 0..25 {
        app.store
            .upsert_article(&article(&format!("article-{:02}", i), category_id, ArticleStatus::Published))
            .await
            .unwrap();
    }

    let (status, body) = app.get_json("/api/kb/articles?page=2&pageSize=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["total"], 25);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pageSize"], 10);

    // newest first
    assert_eq!(body["items"][0]["slug"], "article-14");
    assert!(body["items"][0].get("content").is_none());
}

#[tokio::test]
async fn page_size_is_clamped_and_drafts_hidden() {
    let app = spawn_app(None).await;
    let category_id = plumbing_id(&app).await;
    app.store
        .upsert_article(&article("published-one", category_id, ArticleStatus::Published))
        .await
        .unwrap();
    app.store
        .upsert_article(&article("draft-one", category_id, ArticleStatus::Draft))
        .await
        .unwrap();

    let (_, body) = app.get_json("/api/kb/articles?page=0&pageSize=500").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 50);
    assert_eq!(body["total"], 1);

    let (_, body) = app.get_json("/api/kb/articles?pageSize=0").await;
    assert_eq!(body["pageSize"], 1);

    let (_, body) = app.get_json("/api/kb/articles?status=all").await;
    assert_eq!(body["total"], 2);

    let (status, _) = app.get_json("/api/kb/articles?status=archived").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn article_by_slug() {
    let app = spawn_app(Some(TEST_SECRET)).await;
    app.post_json("/api/admin/seed", json!({}), Some(TEST_SECRET))
        .await;

    let (status, body) = app.get_json("/api/kb/articles/fix-running-toilet").await;
    assert_eq!(status, StatusCode::OK);
    let article = &body["article"];
    assert_eq!(article["title"], "Fix a Running Toilet (Fill Valve & Flapper)");
    assert_eq!(article["difficulty"], "easy");
    assert_eq!(article["timeEstimateMin"], 30);
    assert_eq!(article["toolsJson"][0]["name"], "Adjustable Wrench");
    assert_eq!(article["stepsJson"].as_array().unwrap().len(), 3);

    let (status, body) = app.get_json("/api/kb/articles/no-such-article").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

// ============================================================================
// Seed status and admin gate
// ============================================================================

#[tokio::test]
async fn seed_status_reflects_store_without_seeding() {
    let app = spawn_app(None).await;

    let (status, body) = app.get_json("/seed-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categoryCount"], 0);
    assert!(body["latest"].is_null());

    plumbing_id(&app).await;
    let (_, body) = app.get_json("/api/kb/seed-status").await;
    assert_eq!(body["categoryCount"], 1);
    assert_eq!(body["latest"]["slug"], "plumbing");
}

#[tokio::test]
async fn wrong_secret_is_rejected_without_writes() {
    let app = spawn_app(Some(TEST_SECRET)).await;
    let before = app.store.count_categories().await.unwrap();

    let (status, _) = app
        .post_json("/admin/seed", json!({}), Some("not-the-secret"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.post_json("/api/admin/seed", json!({}), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid or missing admin secret");

    assert_eq!(app.store.count_categories().await.unwrap(), before);
}

#[tokio::test]
async fn admin_seed_with_store_down_is_unavailable() {
    let app = spawn_app(Some(TEST_SECRET)).await;
    app.store.close().await;

    let (status, body) = app
        .post_json("/api/admin/seed", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service unavailable");
}

#[tokio::test]
async fn admin_fails_closed_without_configured_secret() {
    let app = spawn_app(None).await;

    let (status, body) = app
        .post_json("/api/admin/seed", json!({}), Some("anything"))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
    assert_eq!(body["reason"], "Security not configured");

    let (status, _) = app.get_json("/api/admin/_gate").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.store.count_categories().await.unwrap(), 0);
}

#[tokio::test]
async fn admin_seed_reports_counts() {
    let app = spawn_app(Some(TEST_SECRET)).await;

    let (status, body) = app
        .post_json("/admin/seed", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["created"], 7);
    assert_eq!(body["updated"], 0);

    let (_, body) = app
        .post_json("/admin/seed", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(body["created"], 0);
    assert_eq!(body["updated"], 0);
    assert_eq!(body["unchanged"], 7);
}

#[tokio::test]
async fn bearer_token_is_accepted() {
    let app = spawn_app(Some(TEST_SECRET)).await;
    let (status, _, body) = app
        .send(
            Request::get("/api/admin/_gate")
                .header("authorization", format!("Bearer {}", TEST_SECRET))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(common::parse_json(&body)["ok"], true);
}

#[tokio::test]
async fn maintenance_ops_are_a_closed_set() {
    let app = spawn_app(Some(TEST_SECRET)).await;

    let (status, _, body) = app
        .send(
            Request::get("/api/admin/ops")
                .header("x-admin-secret", TEST_SECRET)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<String> = common::parse_json(&body)["ops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["migrate", "seed"]);

    let (status, body) = app
        .post_json("/api/admin/ops/migrate", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["op"], "migrate");

    let (status, body) = app
        .post_json("/api/admin/ops/seed", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seed"]["categories"]["created"], 6);

    let (status, _) = app
        .post_json("/api/admin/ops/shell", json!({}), Some(TEST_SECRET))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post_json("/api/admin/ops/seed", json!({}), Some("wrong"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
