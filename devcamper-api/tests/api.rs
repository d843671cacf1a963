//! End to end tests against the assembled router

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use devcamper_api::auth::ResetNotifier;
use devcamper_api::models::{Repository, Role, User};
use devcamper_api::prelude::*;
use devcamper_api::store::new_document_id;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
const LOS_ANGELES: &str = "1 World Way Los Angeles CA 90045";
const BOUNDARY: &str = "devcamper-test-boundary";

/// Captures reset links instead of mailing them
#[derive(Default)]
struct Outbox {
    links: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl ResetNotifier for Outbox {
    async fn send_reset(&self, _user: &User, reset_url: &str) -> devcamper_api::error::Result<()> {
        if self.fail {
            return Err(Error::Internal("smtp down".to_string()));
        }
        self.links.lock().unwrap().push(reset_url.to_string());
        Ok(())
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    outbox: Arc<Outbox>,
    uploads: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        Self::with_outbox(Outbox::default())
    }

    fn with_outbox(outbox: Outbox) -> Self {
        let uploads = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.auth.argon2_memory_kib = 1024;
        config.auth.argon2_iterations = 1;
        config.rate_limit.enabled = false;
        config.uploads.dir = uploads.path().to_path_buf();
        config.uploads.max_file_upload_bytes = 1000;

        let geocoder = StaticGeocoder::default()
            .with_entry(BOSTON, GeoLocation::at(42.35, -71.1))
            .with_entry("02215", GeoLocation::at(42.35, -71.1))
            .with_entry(LOS_ANGELES, GeoLocation::at(33.94, -118.40));

        let outbox = Arc::new(outbox);
        let state = AppState::builder()
            .config(config)
            .geocoder(Arc::new(geocoder))
            .notifier(outbox.clone())
            .build()
            .unwrap();

        Self {
            app: router(state.clone()),
            state,
            outbox,
            uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };
        self.send(request.body(body).unwrap()).await
    }

    async fn get(&self, uri: &str) -> Reply {
        self.call(Method::GET, uri, None, None).await
    }

    async fn register(&self, name: &str, email: &str, role: &str) -> String {
        let reply = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": "123456", "role": role})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.body["token"].as_str().unwrap().to_string()
    }

    /// Admins cannot register themselves, so write one straight to the store
    async fn admin(&self) -> String {
        let user = User {
            id: new_document_id(),
            name: "Admin Account".to_string(),
            email: "admin@gmail.com".to_string(),
            role: Role::Admin,
            password: self.state.passwords().hash("123456").unwrap(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        };
        Repository::<User>::new(self.state.store())
            .insert(&user)
            .await
            .unwrap();
        self.state.tokens().issue(&user.id).unwrap()
    }

    async fn create_bootcamp(&self, token: &str, name: &str, address: &str) -> String {
        let reply = self
            .call(
                Method::POST,
                "/api/v1/bootcamps",
                Some(token),
                Some(json!({
                    "name": name,
                    "description": "Full stack web development",
                    "website": "https://devworks.com",
                    "careers": ["Web Development", "UI/UX"],
                    "address": address
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["data"]["_id"].as_str().unwrap().to_string()
    }

    async fn add_course(&self, token: &str, bootcamp_id: &str, title: &str, tuition: u32) -> Reply {
        self.call(
            Method::POST,
            &format!("/api/v1/bootcamps/{bootcamp_id}/courses"),
            Some(token),
            Some(json!({
                "title": title,
                "description": "Learn the basics",
                "weeks": "8",
                "tuition": tuition,
                "minimumSkill": "beginner"
            })),
        )
        .await
    }

    async fn upload(&self, token: &str, bootcamp_id: &str, content_type: &str, bytes: &[u8]) -> Reply {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"Team.JPG\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/v1/bootcamps/{bootcamp_id}/photo"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    fn uploaded_files(&self) -> Vec<String> {
        std::fs::read_dir(self.uploads.path())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = TestApp::new();
    let reply = app.get("/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert_eq!(reply.headers["x-content-type-options"], "nosniff");
    assert!(reply.headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new();
    let token = app.register("John Doe", "John@Gmail.com", "user").await;

    let me = app.call(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "john@gmail.com");
    assert_eq!(me.body["data"]["role"], "user");
    assert!(me.body["data"].get("password").is_none());

    let login = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "john@gmail.com", "password": "123456"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["success"], true);
    let cookie = login.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let wrong = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "john@gmail.com", "password": "654321"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid credentials");

    let missing = app
        .call(Method::POST, "/api/v1/auth/login", None, Some(json!({"email": "john@gmail.com"})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cookie_session_and_logout() {
    let app = TestApp::new();
    let token = app.register("Cookie Monster", "cookie@gmail.com", "user").await;

    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::OK);

    let logout = app.get("/api/v1/auth/logout").await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["data"], json!({}));
    let cookie = logout.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=none"));
}

#[tokio::test]
async fn test_register_rejects_admin_and_duplicate_email() {
    let app = TestApp::new();
    let admin = app
        .call(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Eve", "email": "eve@gmail.com", "password": "123456", "role": "admin"})),
        )
        .await;
    assert_eq!(admin.status, StatusCode::BAD_REQUEST);

    app.register("Jane", "jane@gmail.com", "user").await;
    let duplicate = app
        .call(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Jane", "email": "jane@gmail.com", "password": "123456"})),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token_and_role() {
    let app = TestApp::new();
    let anonymous = app
        .call(Method::POST, "/api/v1/bootcamps", None, Some(json!({"name": "x"})))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forged = app
        .call(Method::GET, "/api/v1/auth/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let user = app.register("Plain User", "user@gmail.com", "user").await;
    let forbidden = app
        .call(Method::POST, "/api/v1/bootcamps", Some(&user), Some(json!({"name": "x"})))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert!(forbidden.body["error"]
        .as_str()
        .unwrap()
        .contains("not authorized"));
}

#[tokio::test]
async fn test_bootcamp_lifecycle() {
    let app = TestApp::new();
    let publisher = app.register("Publisher", "pub@gmail.com", "publisher").await;
    let id = app.create_bootcamp(&publisher, "Devworks Bootcamp", BOSTON).await;

    let reply = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(reply.status, StatusCode::OK);
    let data = &reply.body["data"];
    assert_eq!(data["slug"], "devworks-bootcamp");
    assert_eq!(data["location"]["type"], "Point");
    assert_eq!(data["location"]["coordinates"], json!([-71.1, 42.35]));
    assert_eq!(data["photo"], "no-photo.jpg");
    assert!(data.get("address").is_none());

    let second = app
        .call(
            Method::POST,
            "/api/v1/bootcamps",
            Some(&publisher),
            Some(json!({"name": "Another", "description": "x", "careers": ["Other"], "address": BOSTON})),
        )
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);

    let updated = app
        .call(
            Method::PUT,
            &format!("/api/v1/bootcamps/{id}"),
            Some(&publisher),
            Some(json!({"name": "Devworks Academy", "averageCost": 1})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["slug"], "devworks-academy");
    assert!(updated.body["data"].get("averageCost").is_none());

    let intruder = app.register("Other Publisher", "other@gmail.com", "publisher").await;
    let denied = app
        .call(
            Method::DELETE,
            &format!("/api/v1/bootcamps/{id}"),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    app.add_course(&publisher, &id, "Front End", 8000).await;
    let deleted = app
        .call(Method::DELETE, &format!("/api/v1/bootcamps/{id}"), Some(&publisher), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["data"], json!({}));

    assert_eq!(app.get(&format!("/api/v1/bootcamps/{id}")).await.status, StatusCode::NOT_FOUND);
    let courses = app.get("/api/v1/courses").await;
    assert_eq!(courses.body["count"], 0);
}

#[tokio::test]
async fn test_bootcamp_validation_errors() {
    let app = TestApp::new();
    let publisher = app.register("Publisher", "pub@gmail.com", "publisher").await;

    let no_address = app
        .call(
            Method::POST,
            "/api/v1/bootcamps",
            Some(&publisher),
            Some(json!({"name": "Nowhere", "description": "x", "careers": ["Other"]})),
        )
        .await;
    assert_eq!(no_address.status, StatusCode::BAD_REQUEST);

    let bad_career = app
        .call(
            Method::POST,
            "/api/v1/bootcamps",
            Some(&publisher),
            Some(json!({"name": "Odd", "description": "x", "careers": ["Juggling"], "address": BOSTON})),
        )
        .await;
    assert_eq!(bad_career.status, StatusCode::BAD_REQUEST);

    let malformed = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/bootcamps")
                .header(header::AUTHORIZATION, format!("Bearer {publisher}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_resources_are_not_found() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let id = app.create_bootcamp(&admin, "Devworks Bootcamp", BOSTON).await;
    let course = app.add_course(&admin, &id, "Front End", 8000).await;
    assert_eq!(course.status, StatusCode::CREATED);

    for uri in [
        "/api/v1/bootcamps/missing",
        "/api/v1/courses/missing",
        "/api/v1/reviews/missing",
    ] {
        let reply = app.get(uri).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(reply.body["success"], false);
    }

    let update = app
        .call(
            Method::PUT,
            "/api/v1/bootcamps/missing",
            Some(&admin),
            Some(json!({"name": "x"})),
        )
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);

    for uri in [
        "/api/v1/bootcamps/missing",
        "/api/v1/courses/missing",
        "/api/v1/reviews/missing",
    ] {
        let reply = app.call(Method::DELETE, uri, Some(&admin), None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
    }

    let bootcamps = app.get("/api/v1/bootcamps").await;
    assert_eq!(bootcamps.body["count"], 1);
    assert_eq!(bootcamps.body["data"][0]["name"], "Devworks Bootcamp");
    assert_eq!(bootcamps.body["data"][0]["averageCost"].as_f64(), Some(8000.0));
    let courses = app.get(&format!("/api/v1/bootcamps/{id}/courses")).await;
    assert_eq!(courses.body["count"], 1);

    let course = app.add_course(&admin, "missing", "Ghost", 100).await;
    assert_eq!(course.status, StatusCode::NOT_FOUND);
    assert_eq!(course.body["error"], "No bootcamp with the id of missing");

    let user = app
        .call(Method::GET, "/api/v1/users/missing", Some(&admin), None)
        .await;
    assert_eq!(user.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_select_sort_and_pagination() {
    let app = TestApp::new();
    let admin = app.admin().await;
    for name in ["Alpha Camp", "Bravo Camp", "Charlie Camp"] {
        app.create_bootcamp(&admin, name, BOSTON).await;
    }

    let page = app
        .get("/api/v1/bootcamps?select=name,slug&sort=-name&limit=2")
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["count"], 2);
    assert_eq!(page.body["pagination"], json!({"next": {"page": 2, "limit": 2}}));
    let names: Vec<&str> = page.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Charlie Camp", "Bravo Camp"]);
    assert!(page.body["data"][0].get("description").is_none());
    assert!(page.body["data"][0].get("_id").is_some());

    let last = app.get("/api/v1/bootcamps?sort=name&limit=2&page=2").await;
    assert_eq!(last.body["count"], 1);
    assert_eq!(last.body["data"][0]["name"], "Charlie Camp");
    assert_eq!(last.body["pagination"], json!({"prev": {"page": 1, "limit": 2}}));
}

#[tokio::test]
async fn test_course_filters_and_average_cost() {
    let app = TestApp::new();
    let publisher = app.register("Publisher", "pub@gmail.com", "publisher").await;
    let id = app.create_bootcamp(&publisher, "Devworks Bootcamp", BOSTON).await;

    let first = app.add_course(&publisher, &id, "Front End", 8000).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["bootcamp"], id.as_str());
    app.add_course(&publisher, &id, "Full Stack", 12001).await;

    let bootcamp = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(bootcamp.body["data"]["averageCost"].as_f64(), Some(10010.0));
    let listed = app.get("/api/v1/bootcamps").await;
    assert_eq!(listed.body["data"][0]["courses"].as_array().unwrap().len(), 2);

    let pricey = app.get("/api/v1/courses?tuition%5Bgte%5D=10000").await;
    assert_eq!(pricey.status, StatusCode::OK);
    assert_eq!(pricey.body["count"], 1);
    assert_eq!(pricey.body["data"][0]["title"], "Full Stack");
    assert_eq!(pricey.body["data"][0]["bootcamp"]["name"], "Devworks Bootcamp");
    assert!(pricey.body["data"][0]["bootcamp"].get("website").is_none());

    let cheap = app.get("/api/v1/courses?tuition%5Blt%5D=10000&minimumSkill=beginner").await;
    assert_eq!(cheap.body["count"], 1);

    let bad = app.get("/api/v1/courses?tuition%5Bnear%5D=1").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let nested = app.get(&format!("/api/v1/bootcamps/{id}/courses")).await;
    assert_eq!(nested.body["count"], 2);
    assert!(nested.body.get("pagination").is_none());

    let course_id = first.body["data"]["_id"].as_str().unwrap().to_string();
    let removed = app
        .call(
            Method::DELETE,
            &format!("/api/v1/courses/{course_id}"),
            Some(&publisher),
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    let bootcamp = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(bootcamp.body["data"]["averageCost"].as_f64(), Some(12010.0));
}

#[tokio::test]
async fn test_bootcamps_in_radius() {
    let app = TestApp::new();
    let admin = app.admin().await;
    app.create_bootcamp(&admin, "Boston Camp", BOSTON).await;
    app.create_bootcamp(&admin, "LA Camp", LOS_ANGELES).await;

    let near = app.get("/api/v1/bootcamps/radius/02215/10").await;
    assert_eq!(near.status, StatusCode::OK);
    assert_eq!(near.body["count"], 1);
    assert_eq!(near.body["data"][0]["name"], "Boston Camp");

    let far = app.get("/api/v1/bootcamps/radius/02215/3000").await;
    assert_eq!(far.body["count"], 2);

    let unknown = app.get("/api/v1/bootcamps/radius/99999/10").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let bad_distance = app.get("/api/v1/bootcamps/radius/02215/far").await;
    assert_eq!(bad_distance.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_photo_upload() {
    let app = TestApp::new();
    let publisher = app.register("Publisher", "pub@gmail.com", "publisher").await;
    let id = app.create_bootcamp(&publisher, "Devworks Bootcamp", BOSTON).await;

    let text = app.upload(&publisher, &id, "text/plain", b"hello").await;
    assert_eq!(text.status, StatusCode::BAD_REQUEST);
    assert_eq!(text.body["error"], "Please upload an image file");

    let huge = app.upload(&publisher, &id, "image/jpeg", &[7u8; 2000]).await;
    assert_eq!(huge.status, StatusCode::BAD_REQUEST);
    assert!(app.uploaded_files().is_empty());

    let ok = app.upload(&publisher, &id, "image/jpeg", &[7u8; 100]).await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    let name = format!("photo_{id}.jpg");
    assert_eq!(ok.body["data"], name.as_str());
    assert_eq!(app.uploaded_files(), [name.clone()]);

    let bootcamp = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(bootcamp.body["data"]["photo"], name.as_str());

    let served = app
        .send(
            Request::builder()
                .uri(format!("/uploads/{name}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(served.status, StatusCode::OK);

    let no_file = app
        .send(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("/api/v1/bootcamps/{id}/photo"))
                .header(header::AUTHORIZATION, format!("Bearer {publisher}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(no_file.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_file.body["error"], "Please upload a file");
}

#[tokio::test]
async fn test_reviews_and_average_rating() {
    let app = TestApp::new();
    let publisher = app.register("Publisher", "pub@gmail.com", "publisher").await;
    let id = app.create_bootcamp(&publisher, "Devworks Bootcamp", BOSTON).await;

    let review = json!({"title": "Learned a ton", "text": "Great instructors", "rating": 8});
    let uri = format!("/api/v1/bootcamps/{id}/reviews");

    let by_publisher = app
        .call(Method::POST, &uri, Some(&publisher), Some(review.clone()))
        .await;
    assert_eq!(by_publisher.status, StatusCode::FORBIDDEN);

    let alice = app.register("Alice", "alice@gmail.com", "user").await;
    let bob = app.register("Bob", "bob@gmail.com", "user").await;
    let first = app.call(Method::POST, &uri, Some(&alice), Some(review.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);

    let again = app.call(Method::POST, &uri, Some(&alice), Some(review.clone())).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let out_of_range = app
        .call(
            Method::POST,
            &uri,
            Some(&bob),
            Some(json!({"title": "Meh", "text": "Meh", "rating": 11})),
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let second = app
        .call(
            Method::POST,
            &uri,
            Some(&bob),
            Some(json!({"title": "Decent", "text": "Fine", "rating": 5})),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED);

    let bootcamp = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(bootcamp.body["data"]["averageRating"].as_f64(), Some(6.5));

    let listed = app.get(&uri).await;
    assert_eq!(listed.body["count"], 2);

    let review_id = first.body["data"]["_id"].as_str().unwrap().to_string();
    let single = app.get(&format!("/api/v1/reviews/{review_id}")).await;
    assert_eq!(single.body["data"]["bootcamp"]["name"], "Devworks Bootcamp");

    let hijack = app
        .call(
            Method::PUT,
            &format!("/api/v1/reviews/{review_id}"),
            Some(&bob),
            Some(json!({"rating": 1})),
        )
        .await;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);

    let edit = app
        .call(
            Method::PUT,
            &format!("/api/v1/reviews/{review_id}"),
            Some(&alice),
            Some(json!({"rating": 10})),
        )
        .await;
    assert_eq!(edit.status, StatusCode::OK);
    let bootcamp = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(bootcamp.body["data"]["averageRating"].as_f64(), Some(7.5));
}

#[tokio::test]
async fn test_update_details_and_password() {
    let app = TestApp::new();
    let token = app.register("John Doe", "john@gmail.com", "user").await;

    let details = app
        .call(
            Method::PUT,
            "/api/v1/auth/updatedetails",
            Some(&token),
            Some(json!({"name": "John Smith", "role": "admin"})),
        )
        .await;
    assert_eq!(details.status, StatusCode::OK);
    assert_eq!(details.body["data"]["name"], "John Smith");
    assert_eq!(details.body["data"]["role"], "user");

    let wrong = app
        .call(
            Method::PUT,
            "/api/v1/auth/updatepassword",
            Some(&token),
            Some(json!({"currentPassword": "nope", "newPassword": "abcdef"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let changed = app
        .call(
            Method::PUT,
            "/api/v1/auth/updatepassword",
            Some(&token),
            Some(json!({"currentPassword": "123456", "newPassword": "abcdef"})),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let login = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "john@gmail.com", "password": "abcdef"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = TestApp::new();
    app.register("John Doe", "john@gmail.com", "user").await;

    let unknown = app
        .call(
            Method::POST,
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({"email": "nobody@gmail.com"})),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/forgotpassword")
        .header(header::HOST, "devcamper.io")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"john@gmail.com"}"#))
        .unwrap();
    let sent = app.send(request).await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.body["data"], "Email sent");

    let link = app.outbox.links.lock().unwrap().pop().unwrap();
    let prefix = "http://devcamper.io/api/v1/auth/resetpassword/";
    assert!(link.starts_with(prefix), "{link}");
    let token = &link[prefix.len()..];

    let bogus = app
        .call(
            Method::PUT,
            "/api/v1/auth/resetpassword/bogus",
            None,
            Some(json!({"password": "abcdef"})),
        )
        .await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);
    assert_eq!(bogus.body["error"], "Invalid token");

    let reset = app
        .call(
            Method::PUT,
            &format!("/api/v1/auth/resetpassword/{token}"),
            None,
            Some(json!({"password": "abcdef"})),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK, "{}", reset.body);
    assert!(reset.body["token"].is_string());

    let reused = app
        .call(
            Method::PUT,
            &format!("/api/v1/auth/resetpassword/{token}"),
            None,
            Some(json!({"password": "ghijkl"})),
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);

    let login = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "john@gmail.com", "password": "abcdef"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_reset_delivery_clears_token() {
    let app = TestApp::with_outbox(Outbox {
        fail: true,
        ..Outbox::default()
    });
    app.register("John Doe", "john@gmail.com", "user").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({"email": "john@gmail.com"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);

    let user = Repository::<User>::new(app.state.store())
        .find_one(devcamper_api::query::Filter::new().eq("email", "john@gmail.com"))
        .await
        .unwrap()
        .unwrap();
    assert!(user.reset_password_token.is_none());
    assert!(user.reset_password_expire.is_none());
}

#[tokio::test]
async fn test_user_administration() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let user = app.register("Plain User", "user@gmail.com", "user").await;

    let denied = app.call(Method::GET, "/api/v1/users", Some(&user), None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let created = app
        .call(
            Method::POST,
            "/api/v1/users",
            Some(&admin),
            Some(json!({"name": "New Pub", "email": "newpub@gmail.com", "password": "123456", "role": "publisher"})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert!(created.body["data"].get("password").is_none());
    let id = created.body["data"]["_id"].as_str().unwrap().to_string();

    let listed = app
        .call(Method::GET, "/api/v1/users?role=publisher", Some(&admin), None)
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["count"], 1);
    assert!(listed.body["data"][0].get("password").is_none());

    let updated = app
        .call(
            Method::PUT,
            &format!("/api/v1/users/{id}"),
            Some(&admin),
            Some(json!({"name": "Renamed"})),
        )
        .await;
    assert_eq!(updated.body["data"]["name"], "Renamed");

    let deleted = app
        .call(Method::DELETE, &format!("/api/v1/users/{id}"), Some(&admin), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = app
        .call(Method::GET, &format!("/api/v1/users/{id}"), Some(&admin), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserved_keys_with_operators_are_ignored() {
    let app = TestApp::new();
    let admin = app.admin().await;
    app.create_bootcamp(&admin, "Alpha Camp", BOSTON).await;
    app.create_bootcamp(&admin, "Bravo Camp", LOS_ANGELES).await;

    for query in [
        "page%5Bgte%5D=1",
        "limit%5Blt%5D=5",
        "select%5Bin%5D=name",
        "sort%5Bgt%5D=a",
    ] {
        let reply = app.get(&format!("/api/v1/bootcamps?{query}")).await;
        assert_eq!(reply.status, StatusCode::OK, "{query}");
        assert_eq!(reply.body["count"], 2, "{query}");
    }
}
