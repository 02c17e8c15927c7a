use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};
use techinder::api::{self, AppState};
use techinder::config::Config;
use techinder::services::{MailError, Mailer, OutgoingMail};
use techinder::state::SharedState;
use tower::ServiceExt;

#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

fn test_config() -> Config {
    let tmp = std::env::temp_dir();
    let id = uuid::Uuid::new_v4();

    let mut config = Config::default();
    config.general.database_path = format!(
        "sqlite:{}",
        tmp.join(format!("techinder-test-{id}.db")).display()
    );
    config.reports.cases_path = tmp
        .join(format!("techinder-cases-{id}.content"))
        .display()
        .to_string();
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app() -> (Router, Arc<CapturingMailer>) {
    spawn_app_with(test_config()).await
}

async fn spawn_app_with(config: Config) -> (Router, Arc<CapturingMailer>) {
    let mailer = Arc::new(CapturingMailer::default());
    let shared = SharedState::with_mailer(config, mailer.clone())
        .await
        .expect("Failed to create shared state");
    let state = AppState::new(Arc::new(shared), None);
    let app = api::router(state).await.expect("Failed to build router");
    (app, mailer)
}

/// Carries the session cookie between requests like a browser would.
struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    const fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    async fn send(&mut self, request: Request<Body>) -> Response {
        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(value) = response.headers().get(header::SET_COOKIE) {
            let cookie = value.to_str().unwrap();
            self.cookie = cookie.split(';').next().map(ToString::to_string);
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&mut self, uri: &str, form: &[(&str, &str)]) -> Response {
        let body = form
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn register(&mut self, username: &str) -> Response {
        let email = format!("{username}@example.com");
        self.post(
            "/register",
            &[
                ("username", username),
                ("name", "Test User"),
                ("gender", "Male"),
                ("privacy", "Public"),
                ("email", &email),
                ("password", "cat"),
                ("location", "52.52,13.40"),
            ],
        )
        .await
    }

    async fn login(&mut self, username: &str, password: &str) -> Response {
        self.post("/login", &[("username", username), ("password", password)])
            .await
    }

    /// Creates a project owned by the logged-in `username` and returns its
    /// id and channel.
    async fn create_project(&mut self, username: &str, name: &str) -> (String, String) {
        let uri = format!("/create_project/{username}");
        let page = json(self.get(&uri).await).await;
        let channel = page["context"]["form"]["channel"].as_str().unwrap().to_string();

        let response = self
            .post(
                &uri,
                &[
                    ("name", name),
                    ("fields", "rust"),
                    ("members_required", "2"),
                    ("project_description", "A project"),
                    ("channel", &channel),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let page = json(self.get(&format!("/my_projects/{username}")).await).await;
        let projectid = page["context"]["projects"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == name)
            .unwrap()["projectid"]
            .as_str()
            .unwrap()
            .to_string();
        (projectid, channel)
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

async fn json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Flashes queue up until a page renders, so a page may carry several.
fn flashed(page: &serde_json::Value, message: &str) -> bool {
    page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m == message)
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);

    let response = client.get("/explore?page=2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fexplore%3Fpage%3D2");

    let response = client.get("/login").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(page["template"], "auth/login.html");
    assert!(flashed(&page, "Please log in to access this page."));
}

#[tokio::test]
async fn test_register_and_login() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);

    let response = client.register("john").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = client.login("john", "dog").await;
    assert_eq!(location(&response), "/login");
    let page = json(client.get("/login").await).await;
    assert!(flashed(&page, "Invalid username or password"));

    let response = client.login("john", "cat").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/index");

    let response = client.get("/index").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(page["template"], "index.html");

    let page = json(client.get("/profile/john").await).await;
    assert_eq!(page["context"]["is_self"], true);
    assert_eq!(page["context"]["lat_long"], "52.52,13.40");

    let response = client.get("/logout").await;
    assert_eq!(location(&response), "/index");
    let response = client.get("/index").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_follows_next() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;

    let response = client
        .post(
            "/login?next=%2Fexplore",
            &[("username", "john"), ("password", "cat")],
        )
        .await;
    assert_eq!(location(&response), "/explore");
}

#[tokio::test]
async fn test_duplicate_registration_rerenders_form() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);

    client.register("john").await;
    let response = client.register("john").await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = json(response).await;
    assert_eq!(page["template"], "auth/register.html");
    assert_eq!(
        page["context"]["errors"]["username"][0],
        "Please use a different username."
    );
    assert_eq!(
        page["context"]["errors"]["email"][0],
        "Please use a different email address."
    );
    assert!(page["context"]["form"].get("password").is_none());
}

#[tokio::test]
async fn test_register_requires_fields() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);

    let response = client
        .post("/register", &[("username", "john"), ("email", "not-an-email")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = json(response).await;
    let errors = &page["context"]["errors"];
    assert!(errors["email"].is_array());
    assert!(errors["password"].is_array());
    assert!(errors["gender"].is_array());
    assert!(errors.get("username").is_none());
}

#[tokio::test]
async fn test_follow_flow() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);

    client.register("john").await;
    client.register("susan").await;
    client.login("john", "cat").await;

    let response = client.post("/follow/susan", &[]).await;
    assert_eq!(location(&response), "/profile/susan");

    let page = json(client.get("/profile/susan").await).await;
    assert!(flashed(&page, "You are following susan!"));
    assert_eq!(page["context"]["is_following"], true);
    assert_eq!(page["context"]["followers_count"], 1);

    client.post("/follow/john", &[]).await;
    let page = json(client.get("/profile/john").await).await;
    assert!(flashed(&page, "You cannot follow yourself!"));

    let response = client.post("/follow/nobody", &[]).await;
    assert_eq!(location(&response), "/index");

    client.post("/unfollow/susan", &[]).await;
    let page = json(client.get("/profile/susan").await).await;
    assert!(flashed(&page, "You are not following susan."));
    assert_eq!(page["context"]["is_following"], false);
}

#[tokio::test]
async fn test_unknown_profile_is_not_found() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;

    let response = client.get("/profile/nobody").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_project() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;

    let page = json(client.get("/create_project/john").await).await;
    assert_eq!(page["template"], "user/new_project.html");
    let channel = page["context"]["form"]["channel"].as_str().unwrap().to_string();
    assert!(channel.starts_with("CID_"));

    let response = client
        .post(
            "/create_project/john",
            &[
                ("name", "Rusty"),
                ("fields", "rust;web"),
                ("members_required", "3"),
                ("project_description", "A project"),
                ("channel", &channel),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/my_projects/john");

    let page = json(client.get("/my_projects/john").await).await;
    assert_eq!(page["context"]["projects"][0]["name"], "Rusty");
    assert_eq!(page["context"]["projects"][0]["channel"], channel.as_str());

    let page = json(client.get("/index").await).await;
    assert_eq!(page["context"]["projects"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (app, mailer) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;

    let response = client
        .post("/reset_password_request", &[("email", "john@example.com")])
        .await;
    assert_eq!(location(&response), "/login");

    let link = {
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "john@example.com");
        assert_eq!(sent[0].subject, "[Techinder] Reset Your Password");
        sent[0]
            .body
            .lines()
            .find(|line| line.contains("/reset_password/"))
            .unwrap()
            .trim()
            .to_string()
    };
    let path = &link[link.find("/reset_password/").unwrap()..];

    let response = client.get(path).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["template"], "auth/reset_password.html");

    let response = client
        .post(path, &[("password", "dog"), ("password2", "cow")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(
        page["context"]["errors"]["password2"][0],
        "Field must be equal to password."
    );

    let response = client
        .post(path, &[("password", "dog"), ("password2", "dog")])
        .await;
    assert_eq!(location(&response), "/login");

    let response = client.login("john", "dog").await;
    assert_eq!(location(&response), "/index");
}

#[tokio::test]
async fn test_reset_request_for_unknown_email() {
    let (app, mailer) = spawn_app().await;
    let mut client = Client::new(app);

    let response = client
        .post("/reset_password_request", &[("email", "ghost@example.com")])
        .await;
    assert_eq!(location(&response), "/login");
    assert!(mailer.sent.lock().unwrap().is_empty());

    let response = client.get("/reset_password/not-a-token").await;
    assert_eq!(location(&response), "/index");
}

#[tokio::test]
async fn test_report_user() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.register("susan").await;
    client.login("john", "cat").await;

    let page = json(client.get("/report/susan").await).await;
    assert_eq!(page["template"], "report.html");

    let response = client
        .post("/report/susan", &[("cause", "Spam"), ("description", "ads")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client
        .post("/report/susan", &[("cause", "Nonsense"), ("description", "x")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["context"]["errors"]["cause"].is_array());

    let response = client.post("/report/john", &[("cause", "Spam")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_metrics_disabled() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    let response = client.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_profile_prefills_form() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;

    let response = client.get("/edit_profile").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(page["template"], "edit_profile.html");
    let form = &page["context"]["form"];
    assert_eq!(form["username"], "john");
    assert_eq!(form["email"], "john@example.com");
    assert_eq!(form["name"], "Test User");
    assert_eq!(form["gender"], "Male");
    assert_eq!(form["privacy"], "Public");
    assert_eq!(form["location"], "52.52,13.40");
}

#[tokio::test]
async fn test_edit_profile_rejects_taken_username_and_email() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.register("susan").await;
    client.login("john", "cat").await;

    let response = client
        .post(
            "/edit_profile",
            &[("username", "susan"), ("email", "susan@example.com")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(page["template"], "edit_profile.html");
    assert_eq!(
        page["context"]["errors"]["username"][0],
        "Please use a different username."
    );
    assert_eq!(
        page["context"]["errors"]["email"][0],
        "Please use a different email address."
    );

    let page = json(client.get("/edit_profile").await).await;
    assert_eq!(page["context"]["form"]["username"], "john");

    // Keeping one's own username and email is not a conflict.
    let response = client
        .post(
            "/edit_profile",
            &[("username", "john"), ("email", "john@example.com")],
        )
        .await;
    assert_eq!(location(&response), "/edit_profile");
}

#[tokio::test]
async fn test_edit_profile_partial_update() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;

    let response = client
        .post(
            "/edit_profile",
            &[
                ("username", "johnny"),
                ("email", "johnny@example.com"),
                ("about_me", "Rust developer"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/edit_profile");

    let page = json(client.get("/edit_profile").await).await;
    assert!(flashed(&page, "Your changes have been saved"));
    let form = &page["context"]["form"];
    assert_eq!(form["username"], "johnny");
    assert_eq!(form["email"], "johnny@example.com");
    assert_eq!(form["about_me"], "Rust developer");
    assert_eq!(form["name"], "Test User");
    assert_eq!(form["gender"], "Male");
    assert_eq!(form["location"], "52.52,13.40");

    client
        .post(
            "/edit_profile",
            &[
                ("username", "johnny"),
                ("email", "johnny@example.com"),
                ("location", "48.85,2.35"),
            ],
        )
        .await;
    let page = json(client.get("/profile/johnny").await).await;
    assert_eq!(page["context"]["lat_long"], "48.85,2.35");
    assert_eq!(page["context"]["user"]["about_me"], "Rust developer");
}

#[tokio::test]
async fn test_edit_profile_fills_blank_location() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client
        .post(
            "/register",
            &[
                ("username", "susan"),
                ("gender", "Female"),
                ("privacy", "Private"),
                ("email", "susan@example.com"),
                ("password", "cat"),
            ],
        )
        .await;
    client.login("susan", "cat").await;

    let page = json(client.get("/edit_profile").await).await;
    assert_eq!(page["context"]["form"]["location"], "");

    client
        .post(
            "/edit_profile",
            &[
                ("username", "susan"),
                ("email", "susan@example.com"),
                ("location", "40.71,-74.00"),
            ],
        )
        .await;
    let page = json(client.get("/profile/susan").await).await;
    assert_eq!(page["context"]["lat_long"], "40.71,-74.00");
}

#[tokio::test]
async fn test_explore_and_index_pagination() {
    let mut config = test_config();
    config.pagination.projects_per_page = 1;
    let (app, _) = spawn_app_with(config).await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;
    client.create_project("john", "First").await;
    client.create_project("john", "Second").await;

    let page = json(client.get("/explore").await).await;
    let pagination = &page["context"]["pagination"];
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["total_pages"], 2);
    assert_eq!(pagination["next_url"], "/explore?page=2");
    assert!(pagination["prev_url"].is_null());
    assert_eq!(page["context"]["projects"].as_array().unwrap().len(), 1);

    let page = json(client.get("/explore?page=2").await).await;
    let pagination = &page["context"]["pagination"];
    assert!(pagination["next_url"].is_null());
    assert_eq!(pagination["prev_url"], "/explore?page=1");

    let page = json(client.get("/index?page=2").await).await;
    let pagination = &page["context"]["pagination"];
    assert_eq!(page["template"], "index.html");
    assert!(pagination["next_url"].is_null());
    assert_eq!(pagination["prev_url"], "/index?page=1");

    let page = json(client.get("/index").await).await;
    assert_eq!(page["context"]["pagination"]["next_url"], "/index?page=2");
}

#[tokio::test]
async fn test_huge_page_number_shows_last_page() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;
    let (_, channel) = client.create_project("john", "Rusty").await;

    for uri in [
        "/explore?page=18446744073709551615".to_string(),
        "/index?page=18446744073709551615".to_string(),
        format!("/channel/{channel}?page=18446744073709551615"),
    ] {
        let response = client.get(&uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let page = json(response).await;
        assert_eq!(page["context"]["pagination"]["page"], 1, "{uri}");
        assert!(page["context"]["pagination"]["next_url"].is_null(), "{uri}");
    }
}

#[tokio::test]
async fn test_apply_to_project() {
    let (app, _) = spawn_app().await;
    let mut john = Client::new(app.clone());
    let mut susan = Client::new(app);
    john.register("john").await;
    susan.register("susan").await;
    john.login("john", "cat").await;
    susan.login("susan", "cat").await;
    let (projectid, _) = john.create_project("john", "Rusty").await;
    let apply = format!("/project/{projectid}/apply");

    let response = john.post(&apply, &[("body", "mine")]).await;
    assert_eq!(location(&response), "/profile/john");
    let page = json(john.get("/profile/john").await).await;
    assert!(flashed(&page, "You cannot apply to your own project!"));

    let response = susan.post(&apply, &[("body", "Let me in")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/john");
    let page = json(susan.get("/profile/john").await).await;
    assert!(flashed(&page, "You applied to Rusty!"));

    susan.post(&apply, &[("body", "again")]).await;
    let page = json(susan.get("/profile/john").await).await;
    assert!(flashed(&page, "You have already applied to this project."));

    let page = json(john.get(&format!("/project/{projectid}/applications")).await).await;
    let applications = page["context"]["applications"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["username"], "susan");
    assert_eq!(applications[0]["body"], "Let me in");

    let response = susan
        .get(&format!("/project/{projectid}/applications"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = susan.post("/project/PID_missing/apply", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accept_application_is_author_only() {
    let (app, _) = spawn_app().await;
    let mut john = Client::new(app.clone());
    let mut susan = Client::new(app);
    john.register("john").await;
    susan.register("susan").await;
    john.login("john", "cat").await;
    susan.login("susan", "cat").await;
    let (projectid, _) = john.create_project("john", "Rusty").await;

    susan
        .post(&format!("/project/{projectid}/apply"), &[("body", "hi")])
        .await;
    let page = json(john.get(&format!("/project/{projectid}/applications")).await).await;
    let appliedid = page["context"]["applications"][0]["appliedid"]
        .as_str()
        .unwrap()
        .to_string();
    let accept = format!("/applications/{appliedid}/accept");

    let response = susan.post(&accept, &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = john.post(&accept, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/project/{projectid}/applications")
    );
    let page = json(john.get(&format!("/project/{projectid}/applications")).await).await;
    assert!(flashed(&page, "The applicant is now a member of your project!"));
    assert_eq!(page["context"]["applications"][0]["accepted"], true);
    assert_eq!(page["context"]["project"]["members"], 1);

    john.post(&accept, &[]).await;
    let page = json(john.get(&format!("/project/{projectid}/applications")).await).await;
    assert!(flashed(&page, "This application was already accepted."));
    assert_eq!(page["context"]["project"]["members"], 1);

    let response = john.post("/applications/AID_missing/accept", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_toggles() {
    let (app, _) = spawn_app().await;
    let mut client = Client::new(app);
    client.register("john").await;
    client.login("john", "cat").await;
    let (projectid, _) = client.create_project("john", "Rusty").await;
    let like = format!("/project/{projectid}/like");

    let response = client.post(&like, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/explore");
    let page = json(client.get("/explore").await).await;
    assert!(flashed(&page, "You liked Rusty!"));

    let response = client.post(&like, &[("next", "/my_projects/john")]).await;
    assert_eq!(location(&response), "/my_projects/john");
    let page = json(client.get("/my_projects/john").await).await;
    assert!(flashed(&page, "You no longer like Rusty."));

    client.post(&like, &[]).await;
    let page = json(client.get("/explore").await).await;
    assert!(flashed(&page, "You liked Rusty!"));

    let response = client.post("/project/PID_missing/like", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_channel_posting_requires_membership() {
    let (app, _) = spawn_app().await;
    let mut john = Client::new(app.clone());
    let mut susan = Client::new(app);
    john.register("john").await;
    susan.register("susan").await;
    john.login("john", "cat").await;
    susan.login("susan", "cat").await;
    let (projectid, channel) = john.create_project("john", "Rusty").await;
    let uri = format!("/channel/{channel}");

    let page = json(susan.get(&uri).await).await;
    assert_eq!(page["template"], "channel.html");
    assert_eq!(page["context"]["can_post"], false);

    let response = susan.post(&uri, &[("content", "hello")]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = john.post(&uri, &[("content", "welcome")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), uri);

    susan
        .post(&format!("/project/{projectid}/apply"), &[])
        .await;
    let page = json(john.get(&format!("/project/{projectid}/applications")).await).await;
    let appliedid = page["context"]["applications"][0]["appliedid"]
        .as_str()
        .unwrap()
        .to_string();
    john.post(&format!("/applications/{appliedid}/accept"), &[])
        .await;

    let response = susan.post(&uri, &[("content", "hello")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = susan.post(&uri, &[("content", "  ")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["context"]["errors"]["content"].is_array());

    let page = json(susan.get(&uri).await).await;
    assert_eq!(page["context"]["can_post"], true);
    let messages = page["context"]["messages"].as_array().unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["welcome", "hello"]);
    assert_eq!(messages[1]["username"], "susan");

    let response = susan.get("/channel/CID_missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
