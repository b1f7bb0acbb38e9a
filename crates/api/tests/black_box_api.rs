use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{Value, json};

use switchboard_api::app::{AppServices, router};
use switchboard_api::config::SessionSettings;
use switchboard_infra::Database;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory database, on an ephemeral port.
        let db = Database::in_memory().await.expect("in-memory database");
        let services = AppServices::from_database(db, &SessionSettings::default())
            .await
            .expect("services");
        let app = router(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `name=value` part of the session cookie set by `res`.
fn session_cookie(res: &reqwest::Response) -> String {
    let header = res
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

fn token_of(cookie: &str) -> &str {
    cookie.split_once('=').unwrap().1
}

async fn login(client: &reqwest::Client, srv: &TestServer, username: &str, password: &str) -> String {
    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    session_cookie(&res)
}

async fn register(client: &reqwest::Client, srv: &TestServer, username: &str, password: &str) -> String {
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "username": username,
            "password": password,
            "confirm_password": password,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    session_cookie(&res)
}

fn nav_names(body: &Value) -> Vec<String> {
    body["pages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_open() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_callers_are_turned_away() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/pages/Dashboard")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = client.get(srv.url("/snippets")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/nav")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(nav_names(&body).is_empty());

    let res = client.get(srv.url("/auth/whoami")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn default_admin_can_sign_in_and_sees_every_page() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "admin", "1234").await;

    let body: Value = client
        .get(srv.url("/auth/whoami"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["username"], "admin");
    assert_eq!(body["is_admin"], true);
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "user"));

    let body: Value = client
        .get(srv.url("/nav"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        nav_names(&body),
        vec![
            "Dashboard",
            "User Profile",
            "Edit Page",
            "Code Snippets",
            "Pages Manager",
            "Admin Panel",
        ]
    );
}

#[tokio::test]
async fn wrong_password_is_rejected_without_a_cookie() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": "admin", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(SET_COOKIE).is_none());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn register_requires_matching_confirmation() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "username": "carol",
            "password": "secret",
            "confirm_password": "secreT",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let cookie = register(&client, &srv, "carol", "secret").await;
    let res = client
        .get(srv.url("/admin/users"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "admin", "1234").await;

    let res = client
        .post(srv.url("/auth/logout"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let cleared = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let res = client
        .get(srv.url("/pages/Dashboard"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn granting_a_role_opens_the_page_on_the_next_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "1234").await;

    let res = client
        .post(srv.url("/admin/roles"))
        .header(COOKIE, &admin)
        .json(&json!({ "name": "editor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/admin/pages"))
        .header(COOKIE, &admin)
        .json(&json!({ "name": "Drafts", "required_role": "editor", "icon": "📝" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["page"]["menu_order"], 1);

    let bob = register(&client, &srv, "bob", "hunter2").await;
    let res = client
        .get(srv.url("/pages/Drafts"))
        .header(COOKIE, &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url("/admin/users/bob/roles"))
        .header(COOKIE, &admin)
        .json(&json!({ "roles": ["editor"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["roles"], json!(["editor", "user"]));

    // Same session, no re-login.
    let res = client
        .get(srv.url("/pages/Drafts"))
        .header(COOKIE, &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["title"], "Drafts");

    let body: Value = client
        .get(srv.url("/nav"))
        .header(COOKIE, &bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(nav_names(&body), vec!["Drafts", "Dashboard", "User Profile"]);
}

#[tokio::test]
async fn destructive_operations_need_confirmation() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "1234").await;

    client
        .post(srv.url("/admin/roles"))
        .header(COOKIE, &admin)
        .json(&json!({ "name": "auditor" }))
        .send()
        .await
        .unwrap();

    let res = client
        .delete(srv.url("/admin/roles/auditor"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "confirmation_required");

    let res = client
        .delete(srv.url("/admin/roles/auditor?confirm=true"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .delete(srv.url("/admin/roles/admin?confirm=true"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn system_pages_cannot_be_deleted_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "1234").await;

    let res = client
        .delete(srv.url("/admin/pages/Dashboard?confirm=true"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invariant_violation");
}

#[tokio::test]
async fn admin_cannot_revoke_their_own_session_from_the_panel() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "1234").await;
    let other = login(&client, &srv, "admin", "1234").await;

    let body: Value = client
        .get(srv.url("/admin/sessions"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    let current: Vec<&Value> = sessions.iter().filter(|s| s["current"] == true).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["token"], token_of(&admin));

    let res = client
        .delete(srv.url(&format!("/admin/sessions/{}?confirm=true", token_of(&admin))))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "current_session");

    let res = client
        .delete(srv.url(&format!("/admin/sessions/{}?confirm=true", token_of(&other))))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let body: Value = client
        .get(srv.url("/auth/whoami"))
        .header(COOKIE, &other)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn role_listing_separates_assignable_roles() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "1234").await;

    let body: Value = client
        .get(srv.url("/admin/roles"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names = |key: &str| -> Vec<String> {
        body[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_str().unwrap().to_string())
            .collect()
    };
    assert!(names("roles").contains(&"user".to_string()));
    assert!(!names("assignable").contains(&"user".to_string()));
    assert!(names("assignable").contains(&"admin".to_string()));
}

#[tokio::test]
async fn admin_can_sign_a_user_out_everywhere() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "1234").await;
    let first = register(&client, &srv, "bob", "builder1").await;
    let second = login(&client, &srv, "bob", "builder1").await;

    let res = client
        .delete(srv.url("/admin/users/admin/sessions?confirm=true"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "current_session");

    let res = client
        .delete(srv.url("/admin/users/bob/sessions"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "confirmation_required");

    let res = client
        .delete(srv.url("/admin/users/bob/sessions?confirm=true"))
        .header(COOKIE, &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["revoked"], 2);

    for cookie in [&first, &second] {
        let body: Value = client
            .get(srv.url("/auth/whoami"))
            .header(COOKIE, cookie)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["authenticated"], false);
    }
}

#[tokio::test]
async fn snippets_crud_for_signed_in_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let cookie = register(&client, &srv, "dana", "pass1234").await;

    let res = client
        .post(srv.url("/snippets"))
        .header(COOKIE, &cookie)
        .json(&json!({
            "title": "Hello",
            "code": "print('hi')",
            "tags": ["intro", "python"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["language"], "Python");
    assert_eq!(created["created_by"], "dana");
    let id = created["id"].as_str().unwrap().to_string();

    let body: Value = client
        .get(srv.url("/snippets?search=intro"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["snippets"].as_array().unwrap().len(), 1);

    let res = client
        .get(srv.url("/snippets/not-a-uuid"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .delete(srv.url(&format!("/snippets/{id}?confirm=true")))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/snippets/{id}")))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
