use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use popnplan_server::config::{AdminAuth, Config};
use popnplan_server::models::{Account, AccountKind, Message, MessageType};
use popnplan_server::routes::create_routes;
use popnplan_server::services::accounts::ensure_system_account;
use popnplan_server::services::credentials::Credentials;
use popnplan_server::services::mailer::{Mailer, RecordingMailer};
use popnplan_server::store::{AccountStore, MemoryStore, MessageStore};
use popnplan_server::AppState;

const SECRET: &[u8] = b"integration-test-secret";

struct TestApp {
    router: Router,
    store: MemoryStore,
    mailer: RecordingMailer,
    system_account: Uuid,
}

impl TestApp {
    async fn new(admin_auth: AdminAuth) -> Self {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let system_account = ensure_system_account(&store, "admin@popnplan.local", Utc::now())
            .await
            .unwrap();

        let state = AppState::new(
            store.clone(),
            Mailer::Recording(mailer.clone()),
            credentials(),
            system_account,
            admin_auth,
        );
        let config = Config::from_lookup(|_| None).unwrap();

        Self {
            router: create_routes(state, &config),
            store,
            mailer,
            system_account,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body), None).await
    }

    async fn create_event(&self, title: &str, max_participants: i32) -> String {
        let (status, body) = self
            .post(
                "/api/events",
                json!({
                    "title": title,
                    "description": "Annual fest",
                    "date": "2025-03-01",
                    "time": "10:00",
                    "venue": "Main hall",
                    "maxParticipants": max_participants,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["event"]["id"].as_str().unwrap().to_string()
    }

    async fn register(&self, event_id: &str, email: &str) -> (StatusCode, Value) {
        self.post(&format!("/api/events/{event_id}/register"), registrant(email))
            .await
    }

    /// Latest code mailed to `email`.
    fn code_for(&self, email: &str) -> String {
        let html = self.mailer.last_to(email).unwrap().html;
        let start = html.find("<b>").unwrap() + 3;
        let end = html.find("</b>").unwrap();
        html[start..end].to_string()
    }

    async fn seed_member(&self, email: &str) -> Uuid {
        let mut account = Account::new(
            AccountKind::Member,
            email.to_string(),
            "!".to_string(),
            Utc::now(),
        );
        account.is_verified = true;
        self.store.insert_account(&account).await.unwrap();
        account.id
    }
}

fn credentials() -> Credentials {
    Credentials::new(SECRET, 1_000).unwrap()
}

fn registrant(email: &str) -> Value {
    json!({
        "registrantName": "Asha",
        "registrantEmail": email,
        "registrantPhone": "9999999999",
        "registrantClass": "TE",
        "registrantRollNo": "42",
        "registrantPRN": "PRN42",
    })
}

fn error_params(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["param"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(AdminAuth::Open).await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_single_seat_event_scenario() {
    let app = TestApp::new(AdminAuth::Open).await;
    let event_id = app.create_event("E1", 1).await;

    let (status, body) = app.register(&event_id, "a@x.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Registration successful");
    assert!(body["registrationId"].is_string());

    let (status, body) = app.register(&event_id, "b@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EVENT_FULL");
    assert_eq!(body["error"], "Event is full");

    let (status, body) = app.register(&event_id, "a@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_REGISTERED");

    let (_, registrations) = app
        .get(&format!("/api/events/{event_id}/registrations"))
        .await;
    assert_eq!(registrations.as_array().unwrap().len(), 1);
    assert_eq!(registrations[0]["eventTitle"], "E1");
    assert_eq!(registrations[0]["status"], "pending");
    assert_eq!(registrations[0]["registrantPRN"], "PRN42");
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let app = TestApp::new(AdminAuth::Open).await;

    let (status, body) = app.register(&Uuid::new_v4().to_string(), "a@x.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");

    let (status, _) = app.register("not-an-id", "a@x.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/events/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = app.get("/api/events/admin/all-registrations").await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn test_inactive_event_refuses_registration() {
    let app = TestApp::new(AdminAuth::Open).await;
    let event_id = app.create_event("Closed", 10).await;

    let (status, body) = app
        .put(&format!("/api/events/{event_id}"), json!({ "isActive": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["isActive"], false);

    let (status, body) = app.register(&event_id, "a@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EVENT_INACTIVE");

    let (_, events) = app.get("/api/events").await;
    assert_eq!(events, json!([]));
}

#[tokio::test]
async fn test_registration_validation_lists_every_field() {
    let app = TestApp::new(AdminAuth::Open).await;
    let event_id = app.create_event("E", 5).await;

    let (status, body) = app
        .post(
            &format!("/api/events/{event_id}/register"),
            json!({ "registrantName": "  ", "registrantEmail": "nope" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_params(&body),
        vec![
            "registrantName",
            "registrantEmail",
            "registrantPhone",
            "registrantClass",
            "registrantRollNo",
            "registrantPRN",
        ]
    );
}

#[tokio::test]
async fn test_malformed_json_uses_error_list() {
    let app = TestApp::new(AdminAuth::Open).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["errors"][0]["msg"].is_string());
}

#[tokio::test]
async fn test_event_crud() {
    let app = TestApp::new(AdminAuth::Open).await;

    let (status, body) = app.post("/api/events", json!({ "title": "Only title" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_params(&body), vec!["description", "date", "time"]);

    let (status, body) = app
        .post(
            "/api/events",
            json!({
                "title": "T", "description": "D", "date": "d", "time": "t",
                "maxParticipants": -1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_params(&body), vec!["maxParticipants"]);

    let id = app.create_event("Hackathon", 50).await;
    let (status, event) = app.get(&format!("/api/events/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["title"], "Hackathon");
    assert_eq!(event["createdBy"], app.system_account.to_string());

    let (status, body) = app
        .put(&format!("/api/events/{id}"), json!({ "venue": "Lab 3" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event updated successfully");
    assert_eq!(body["event"]["venue"], "Lab 3");
    assert_eq!(body["event"]["title"], "Hackathon");

    let (status, _) = app
        .put(&format!("/api/events/{}", Uuid::new_v4()), json!({ "venue": "x" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::DELETE, &format!("/api/events/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event deleted successfully");

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/events/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_removes_only_that_events_registrations() {
    let app = TestApp::new(AdminAuth::Open).await;
    let doomed = app.create_event("Doomed", 10).await;
    let kept = app.create_event("Kept", 10).await;

    app.register(&doomed, "a@x.com").await;
    app.register(&doomed, "b@x.com").await;
    app.register(&kept, "a@x.com").await;

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/events/{doomed}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = app.get("/api/events/admin/all-registrations").await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["eventId"], kept);
    assert_eq!(all[0]["event"]["title"], "Kept");
    assert_eq!(all[0]["event"]["venue"], "Main hall");
}

#[tokio::test]
async fn test_registration_status_updates() {
    let app = TestApp::new(AdminAuth::Open).await;
    let event_id = app.create_event("E", 5).await;
    let (_, body) = app.register(&event_id, "a@x.com").await;
    let registration_id = body["registrationId"].as_str().unwrap().to_string();
    let uri = format!("/api/events/registrations/{registration_id}/status");

    let (status, body) = app.put(&uri, json!({ "status": "maybe" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid status");

    let (status, body) = app.put(&uri, json!({ "status": "approved" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Registration status updated");
    assert_eq!(body["registration"]["status"], "approved");

    let missing = format!("/api/events/registrations/{}/status", Uuid::new_v4());
    let (status, _) = app.put(&missing, json!({ "status": "rejected" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_register_verify_login() {
    let app = TestApp::new(AdminAuth::Open).await;
    let signup = json!({
        "college": "MIT",
        "committee": "Tech",
        "email": "ana@example.com",
        "contact": "9876543210",
        "password": "secret1",
        "confirmPassword": "secret1",
    });

    let (status, body) = app.post("/api/auth/register", signup.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "msg": "Verification code sent", "email": "ana@example.com" }));

    let login = json!({ "email": "ana@example.com", "password": "secret1" });
    let (status, body) = app.post("/api/auth/login", login.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Please verify your email before login");

    let (status, body) = app
        .post(
            "/api/auth/verify",
            json!({ "email": "ana@example.com", "code": "000000x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Invalid verification code");

    let code = app.code_for("ana@example.com");
    let (status, body) = app
        .post(
            "/api/auth/verify",
            json!({ "email": "ana@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Registration successful");

    let (status, body) = app.post("/api/auth/register", signup).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "User already exists and is verified");

    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "email": "ana@example.com", "password": "wrong-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Invalid credentials");

    let (status, body) = app.post("/api/auth/login", login).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Login successful");
    assert!(body.get("member").is_none());

    let claims = credentials()
        .verify_token(body["token"].as_str().unwrap(), Utc::now())
        .unwrap();
    assert_eq!(claims.kind, AccountKind::User);
}

#[tokio::test]
async fn test_verify_rejects_padded_code() {
    let app = TestApp::new(AdminAuth::Open).await;
    app.post(
        "/api/member/register",
        json!({
            "name": "Ravi",
            "email": "ravi@example.com",
            "contact": "12345",
            "password": "secret1",
        }),
    )
    .await;
    let code = app.code_for("ravi@example.com");

    let (status, body) = app
        .post(
            "/api/member/verify",
            json!({ "email": "ravi@example.com", "code": format!(" {code} ") }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Invalid verification code");

    let (status, _) = app
        .post(
            "/api/member/verify",
            json!({ "email": "ravi@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_resend_code_replaces_the_old_code() {
    let app = TestApp::new(AdminAuth::Open).await;
    app.post(
        "/api/member/register",
        json!({
            "name": "Ravi",
            "email": "ravi@example.com",
            "contact": "12345",
            "password": "secret1",
        }),
    )
    .await;
    let first = app.code_for("ravi@example.com");

    let (status, body) = app
        .post("/api/member/resend-code", json!({ "email": "ravi@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Verification code resent");
    assert_eq!(app.mailer.sent().len(), 2);

    let second = app.code_for("ravi@example.com");
    if first != second {
        let (status, _) = app
            .post(
                "/api/member/verify",
                json!({ "email": "ravi@example.com", "code": first }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = app
        .post("/api/member/resend-code", json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "User not found");
}

#[tokio::test]
async fn test_member_login_returns_summary() {
    let app = TestApp::new(AdminAuth::Open).await;
    let (status, _) = app
        .post(
            "/api/member/register",
            json!({
                "name": "Ravi",
                "email": "ravi@example.com",
                "contact": "12345",
                "password": "secret1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let code = app.code_for("ravi@example.com");
    let (status, _) = app
        .post(
            "/api/member/verify",
            json!({ "email": "ravi@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Users and members are separate account spaces
    let (status, _) = app
        .post(
            "/api/auth/login",
            json!({ "email": "ravi@example.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/member/login",
            json!({ "email": "ravi@example.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member"]["name"], "Ravi");
    assert_eq!(body["member"]["email"], "ravi@example.com");
    assert_eq!(body["member"]["role"], "Member");
}

#[tokio::test]
async fn test_messaging_flow() {
    let app = TestApp::new(AdminAuth::Open).await;
    let ravi = app.seed_member("ravi@example.com").await;
    let mira = app.seed_member("mira@example.com").await;

    let (status, body) = app
        .post("/api/messages/broadcast", json!({ "content": "Fest on Friday" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sentTo"], 2);
    assert_eq!(body["message"], "Broadcast sent to 2 members");

    let (status, body) = app
        .post(
            "/api/messages/send",
            json!({ "receiverId": ravi, "content": "See you there" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["messageId"].is_string());

    let (status, body) = app
        .post("/api/messages/send", json!({ "receiverId": "bogus", "content": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_params(&body), vec!["receiverId"]);

    let reply = Message::new(
        ravi,
        app.system_account,
        "Thanks!".to_string(),
        MessageType::Text,
        Utc::now(),
    );
    app.store
        .insert_messages(std::slice::from_ref(&reply))
        .await
        .unwrap();

    let (_, conversation) = app.get(&format!("/api/messages/conversation/{ravi}")).await;
    let contents: Vec<&str> = conversation
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["Fest on Friday", "See you there", "Thanks!"]);
    assert_eq!(conversation[0]["messageType"], "announcement");
    assert_eq!(conversation[1]["messageType"], "text");

    let (_, summaries) = app.get("/api/messages/conversations").await;
    let summaries = summaries.as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["accountId"], ravi.to_string());
    assert_eq!(summaries[0]["unreadCount"], 1);
    assert_eq!(summaries[0]["lastMessage"]["content"], "Thanks!");
    assert_eq!(summaries[1]["accountId"], mira.to_string());
    assert_eq!(summaries[1]["unreadCount"], 0);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/messages/read/{ravi}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, summaries) = app.get("/api/messages/conversations").await;
    assert_eq!(summaries[0]["unreadCount"], 0);
}

#[tokio::test]
async fn test_required_admin_auth() {
    let app = TestApp::new(AdminAuth::Required).await;
    let event = json!({ "title": "T", "description": "D", "date": "d", "time": "t" });

    let (status, body) = app.post("/api/events", event.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .request(Method::POST, "/api/events", Some(event.clone()), Some("garbage"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let now = Utc::now();
    let member_token = credentials()
        .issue_token(Uuid::new_v4(), AccountKind::Member, now)
        .unwrap();
    let (status, _) = app
        .request(Method::POST, "/api/events", Some(event.clone()), Some(member_token.as_str()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let user_id = Uuid::new_v4();
    let user_token = credentials()
        .issue_token(user_id, AccountKind::User, now)
        .unwrap();
    let (status, body) = app
        .request(Method::POST, "/api/events", Some(event), Some(user_token.as_str()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["event"]["createdBy"], user_id.to_string());

    // Public routes stay open
    let (status, events) = app.get("/api/events").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/messages/conversations").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
