use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::{
    form::FormData,
    handlers::internal_error,
    models::FlashMessage,
    session::{
        clear_cookie, encode_flashes, redirect_with_flash, set_cookie, with_cookies, CurrentUser,
        FLASH_COOKIE, SESSION_COOKIE,
    },
    AppState,
};
use crate::{
    auth::{google, local},
    storage::Storage,
    types::{FitnessError, User},
};

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Starts a login session and sends the user to the dashboard.
fn logged_in<S: Storage>(state: &AppState<S>, user: &User, welcome: &str) -> Response {
    let token = match state.sessions.login(&user.id) {
        Ok(token) => token,
        Err(err) => return internal_error("Failed to start login session", err),
    };
    log::info!("🔑 User {} logged in", user.email);
    let flash = encode_flashes(&[FlashMessage {
        category: "success".to_string(),
        message: format!("Welcome, {welcome}!"),
    }]);
    with_cookies(
        Redirect::to("/dashboard").into_response(),
        &[
            set_cookie(SESSION_COOKIE, &token, state.secure_cookies),
            set_cookie(FLASH_COOKIE, &flash, false),
        ],
    )
}

fn domain_failure(context: &str, err: anyhow::Error) -> Response {
    match err.downcast_ref::<FitnessError>() {
        Some(e) => redirect_with_flash("/", "error", &e.to_string()),
        None => internal_error(context, err),
    }
}

pub async fn register<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Response {
    let form = FormData::parse(&body);
    match local::register(
        &state.storage,
        form.get("email").unwrap_or_default(),
        form.get("username").unwrap_or_default(),
        form.get("password").unwrap_or_default(),
    ) {
        Ok(user) => logged_in(&state, &user, &user.username),
        Err(err) => domain_failure("Failed to register user", err),
    }
}

pub async fn login<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Response {
    let form = FormData::parse(&body);
    match local::authenticate(
        &state.storage,
        form.get("email").unwrap_or_default(),
        form.get("password").unwrap_or_default(),
    ) {
        Ok(user) => logged_in(&state, &user, &user.username),
        Err(err) => domain_failure("Failed to authenticate user", err),
    }
}

pub async fn logout<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    current: CurrentUser,
) -> Response {
    state.sessions.logout(&current.token);
    log::info!("👋 User {} logged out", current.user.email);
    let flash = encode_flashes(&[FlashMessage {
        category: "info".to_string(),
        message: "You have been logged out.".to_string(),
    }]);
    with_cookies(
        Redirect::to("/").into_response(),
        &[
            clear_cookie(SESSION_COOKIE),
            set_cookie(FLASH_COOKIE, &flash, false),
        ],
    )
}

pub async fn google_login<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    let Some(oauth) = state.google.as_ref() else {
        return redirect_with_flash(
            "/",
            "error",
            "Google OAuth not configured. Please set up your credentials.",
        );
    };

    let csrf = state.sessions.issue_oauth_state();
    match oauth.authorization_url(&csrf).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(err) => {
            state.sessions.take_oauth_state(&csrf);
            log::error!("Google authorization URL failed: {:?}", err);
            redirect_with_flash("/", "error", &format!("Authentication error: {err}"))
        }
    }
}

pub async fn google_callback<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(oauth) = state.google.as_ref() else {
        return redirect_with_flash("/", "error", "Google OAuth not configured.");
    };

    if let Some(error) = query.error {
        return redirect_with_flash("/", "error", &format!("Authentication failed: {error}"));
    }
    let valid_state = query
        .state
        .as_deref()
        .is_some_and(|s| state.sessions.take_oauth_state(s));
    if !valid_state {
        log::warn!("Rejected Google callback with unknown state");
        return redirect_with_flash("/", "error", "Authentication failed: invalid state.");
    }
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return redirect_with_flash(
            "/",
            "error",
            "Authentication failed: missing authorization code.",
        );
    };

    let info = match oauth.exchange_code(&code).await {
        Ok(info) => info,
        Err(err) => {
            log::error!("Google code exchange failed: {:?}", err);
            return redirect_with_flash("/", "error", &format!("Authentication failed: {err}"));
        }
    };
    let Some(identity) = info.verified() else {
        return redirect_with_flash(
            "/",
            "error",
            "User email not available or not verified by Google.",
        );
    };

    match google::find_or_create_user(&state.storage, &identity) {
        Ok(user) => logged_in(&state, &user, &identity.name),
        Err(err) => internal_error("Failed to store Google user", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{GoogleConfig, GoogleOAuth},
        rest::router,
        storage::MemoryStorage,
    };
    use axum::{
        body::Body,
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            Request, StatusCode,
        },
        Router,
    };
    use tower::ServiceExt;

    fn app(google: Option<GoogleOAuth>) -> (AppState<MemoryStorage>, Router) {
        let state = AppState::new(MemoryStorage::new(), google, false).unwrap();
        (state.clone(), router(state))
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn set_cookies(resp: &Response) -> Vec<String> {
        resp.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    fn session_token(resp: &Response) -> Option<String> {
        set_cookies(resp).into_iter().find_map(|c| {
            c.strip_prefix(&format!("{SESSION_COOKIE}="))
                .and_then(|rest| rest.split(';').next())
                .map(str::to_string)
        })
    }

    #[tokio::test]
    async fn register_logs_in_and_redirects_to_dashboard() {
        let (state, app) = app(None);
        let resp = app
            .oneshot(post_form(
                "/register",
                "email=ana%40example.com&username=Ana&password=longenough",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[LOCATION], "/dashboard");

        let token = session_token(&resp).unwrap();
        let user_id = state.sessions.user_id(&token).unwrap();
        let user = state.storage.load_user(&user_id).unwrap().unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(set_cookies(&resp)
            .iter()
            .any(|c| c.contains("Welcome%2C+Ana%21")));
    }

    #[tokio::test]
    async fn short_password_flashes_error_without_session() {
        let (_, app) = app(None);
        let resp = app
            .oneshot(post_form(
                "/register",
                "email=ana%40example.com&password=short",
            ))
            .await
            .unwrap();
        assert_eq!(resp.headers()[LOCATION], "/");
        assert!(session_token(&resp).is_none());
        assert!(set_cookies(&resp)
            .iter()
            .any(|c| c.starts_with(&format!("{FLASH_COOKIE}=error="))));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let (state, app) = app(None);
        local::register(&state.storage, "ana@example.com", "Ana", "longenough").unwrap();

        let resp = app
            .clone()
            .oneshot(post_form(
                "/login",
                "email=ana%40example.com&password=wrongpassword",
            ))
            .await
            .unwrap();
        assert_eq!(resp.headers()[LOCATION], "/");
        assert!(session_token(&resp).is_none());

        let resp = app
            .oneshot(post_form(
                "/login",
                "email=ANA%40example.com&password=longenough",
            ))
            .await
            .unwrap();
        assert_eq!(resp.headers()[LOCATION], "/dashboard");
        assert!(session_token(&resp).is_some());
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let (state, app) = app(None);
        let user = local::register(&state.storage, "ana@example.com", "Ana", "longenough").unwrap();
        let token = state.sessions.login(&user.id).unwrap();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/logout")
                    .header(COOKIE, format!("{SESSION_COOKIE}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers()[LOCATION], "/");
        assert!(state.sessions.user_id(&token).is_none());
        assert!(set_cookies(&resp)
            .iter()
            .any(|c| c.starts_with(&format!("{SESSION_COOKIE}=;")) && c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn google_login_without_credentials_flashes() {
        let (_, app) = app(None);
        let resp = app
            .oneshot(Request::builder().uri("/google_login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.headers()[LOCATION], "/");
        assert!(set_cookies(&resp)
            .iter()
            .any(|c| c.contains("Google+OAuth+not+configured")));
    }

    #[tokio::test]
    async fn google_callback_rejects_unknown_state() {
        let oauth = GoogleOAuth::new(GoogleConfig::new("id", "secret", "http://localhost:5000"));
        let (state, app) = app(Some(oauth));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/google_login/callback?code=abc&state=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers()[LOCATION], "/");
        assert!(session_token(&resp).is_none());
        assert!(state.storage.find_user_by_email("ana@example.com").unwrap().is_none());
    }
}
