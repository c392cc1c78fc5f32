use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Redirect, Response},
};

use super::{models::FlashMessage, AppState};
use crate::{storage::Storage, types::User};

pub const SESSION_COOKIE: &str = "fittrack_session";
pub const FLASH_COOKIE: &str = "fittrack_flash";

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

pub fn set_cookie(name: &str, value: &str, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn encode_flashes(messages: &[FlashMessage]) -> String {
    let mut out = url::form_urlencoded::Serializer::new(String::new());
    for m in messages {
        out.append_pair(&m.category, &m.message);
    }
    out.finish()
}

pub fn read_flashes(headers: &HeaderMap) -> Vec<FlashMessage> {
    read_cookie(headers, FLASH_COOKIE)
        .map(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .map(|(category, message)| FlashMessage {
                    category: category.into_owned(),
                    message: message.into_owned(),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(err) => log::warn!("Dropping invalid cookie header: {}", err),
        }
    }
    response
}

/// 303 redirect that leaves a one-shot message for the next page.
pub fn redirect_with_flash(to: &str, category: &str, message: &str) -> Response {
    let flash = encode_flashes(&[FlashMessage {
        category: category.to_string(),
        message: message.to_string(),
    }]);
    with_cookies(
        Redirect::to(to).into_response(),
        &[set_cookie(FLASH_COOKIE, &flash, false)],
    )
}

/// The logged-in user. Anonymous requests are sent back to the landing page.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
    S: Storage + Clone + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let login_required =
            || redirect_with_flash("/", "info", "Please log in to access this page.");

        let Some(token) = read_cookie(&parts.headers, SESSION_COOKIE) else {
            return Err(login_required());
        };
        let Some(user_id) = state.sessions.user_id(&token) else {
            return Err(login_required());
        };
        match state.storage.load_user(&user_id) {
            Ok(Some(user)) => Ok(CurrentUser { user, token }),
            Ok(None) => {
                state.sessions.logout(&token);
                Err(login_required())
            }
            Err(err) => {
                log::error!("Failed to load user {}: {:?}", user_id, err);
                Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
        }
    }
}
