//! Google sign-in over OAuth 2.0 / OpenID Connect.
//!
//! The provider endpoints are read from Google's discovery document on every
//! login, then the authorization code is exchanged for an access token which is
//! used to read the user's profile.

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::{
    storage::Storage,
    types::{normalize_email, User},
};

pub const GOOGLE_DISCOVERY_URL: &str =
    "https://accounts.google.com/.well-known/openid-configuration";
pub const CALLBACK_PATH: &str = "/google_login/callback";
const SCOPES: &str = "openid email profile";

#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub discovery_url: String,
}

impl GoogleConfig {
    pub fn new(client_id: &str, client_secret: &str, public_url: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_url: format!("{}{}", public_url.trim_end_matches('/'), CALLBACK_PATH),
            discovery_url: GOOGLE_DISCOVERY_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderConfig {
    authorization_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub google_id: String,
    pub email: String,
    pub name: String,
}

impl UserInfo {
    /// Returns the identity only when Google vouches for the email address.
    pub fn verified(self) -> Option<VerifiedIdentity> {
        if self.email_verified != Some(true) {
            return None;
        }
        let email = self.email.filter(|e| !e.trim().is_empty())?;
        let name = self
            .given_name
            .or(self.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Some(VerifiedIdentity {
            google_id: self.sub,
            email,
            name,
        })
    }
}

#[derive(Clone)]
pub struct GoogleOAuth {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn redirect_url(&self) -> &str {
        &self.config.redirect_url
    }

    async fn provider_config(&self) -> Result<ProviderConfig> {
        self.http
            .get(&self.config.discovery_url)
            .send()
            .await
            .context("fetching Google discovery document")?
            .error_for_status()?
            .json()
            .await
            .context("decoding Google discovery document")
    }

    pub async fn authorization_url(&self, state: &str) -> Result<String> {
        let provider = self.provider_config().await?;
        let url = build_authorization_url(
            &provider.authorization_endpoint,
            &self.config.client_id,
            &self.config.redirect_url,
            state,
        )?;
        Ok(url.into())
    }

    /// Exchanges an authorization code and fetches the signed-in user's profile.
    pub async fn exchange_code(&self, code: &str) -> Result<UserInfo> {
        let provider = self.provider_config().await?;

        let token: TokenResponse = self
            .http
            .post(&provider.token_endpoint)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .context("requesting Google access token")?
            .error_for_status()?
            .json()
            .await
            .context("decoding Google token response")?;

        self.http
            .get(&provider.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("requesting Google userinfo")?
            .error_for_status()?
            .json()
            .await
            .context("decoding Google userinfo")
    }
}

pub fn build_authorization_url(
    endpoint: &str,
    client_id: &str,
    redirect_url: &str,
    state: &str,
) -> Result<Url> {
    let mut url = Url::parse(endpoint).context("parsing authorization endpoint")?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_url)
        .append_pair("scope", SCOPES)
        .append_pair("state", state);
    Ok(url)
}

/// Finds the account for a Google identity, creating it on first sign-in.
///
/// Accounts are matched by Google id, then by email. Existing local accounts
/// get the Google id attached.
pub fn find_or_create_user<S: Storage + ?Sized>(
    storage: &S,
    identity: &VerifiedIdentity,
) -> Result<User> {
    if let Some(user) = storage.find_user_by_google_id(&identity.google_id)? {
        return Ok(user);
    }
    let email = normalize_email(&identity.email);
    match storage.find_user_by_email(&email)? {
        Some(mut user) => {
            if user.google_id.is_none() {
                user.google_id = Some(identity.google_id.clone());
                storage.save_user(&user)?;
            }
            Ok(user)
        }
        None => {
            let user = User::new_google(&email, &identity.name, &identity.google_id);
            storage.save_user(&user)?;
            log::info!("👤 Created Google user {}", user.email);
            Ok(user)
        }
    }
}
