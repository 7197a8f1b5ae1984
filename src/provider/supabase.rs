//! GoTrue REST client (`/auth/v1/*`).

use super::{
    types::{unix_now, Session, SignUpOutcome, SignUpRequest, User},
    IdentityProvider, ProviderError,
};
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{fmt, time::Duration};
use tracing::{debug, info_span, instrument, Instrument};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SupabaseClient {
    base_url: Url,
    api_key: SecretString,
    project_ref: String,
    client: Client,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("project_ref", &self.project_ref)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// # Errors
    /// Returns an error if the URL is invalid, has no host, or the HTTP client cannot be built.
    pub fn new(url: &str, api_key: SecretString) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(url)
            .map_err(|err| ProviderError::Config(format!("invalid provider URL {url}: {err}")))?;

        let host = base_url
            .host_str()
            .ok_or_else(|| ProviderError::Config(format!("provider URL has no host: {url}")))?;
        let project_ref = project_ref_from_host(host);

        // `Url::join` drops the last path segment unless it ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            project_ref,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|err| ProviderError::Config(format!("invalid endpoint {path}: {err}")))
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.api_key.expose_secret())
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, ProviderError> {
        let url = self.endpoint("auth/v1/token")?;

        let span = info_span!(
            "provider.token",
            http.method = "POST",
            grant_type = grant_type,
            url = %url
        );
        let response = self
            .with_api_key(self.client.post(url))
            .bearer_auth(self.api_key.expose_secret())
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .instrument(span)
            .await?;

        let session: Session = read_json(response).await?;

        Ok(session.with_absolute_expiry(unix_now()))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    fn project_ref(&self) -> &str {
        &self.project_ref
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<User, ProviderError> {
        let url = self.endpoint("auth/v1/user")?;

        let span = info_span!("provider.get_user", http.method = "GET", url = %url);
        let response = self
            .with_api_key(self.client.get(url))
            .bearer_auth(access_token)
            .send()
            .instrument(span)
            .await?;

        read_json(response).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip_all)]
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, ProviderError> {
        self.token_grant(
            "pkce",
            json!({
                "auth_code": auth_code,
                "code_verifier": code_verifier.unwrap_or_default(),
            }),
        )
        .await
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    #[instrument(skip_all, fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, ProviderError> {
        let url = self.endpoint("auth/v1/signup")?;

        let mut data = serde_json::Map::new();
        if let Some(full_name) = &request.full_name {
            data.insert("full_name".to_string(), Value::String(full_name.clone()));
        }

        let mut builder = self
            .with_api_key(self.client.post(url.clone()))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": data,
            }));
        if let Some(redirect_to) = &request.email_redirect_to {
            builder = builder.query(&[("redirect_to", redirect_to)]);
        }

        let span = info_span!("provider.sign_up", http.method = "POST", url = %url);
        let response = builder.send().instrument(span).await?;

        let body: Value = read_json(response).await?;

        parse_sign_up(body)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let url = self.endpoint("auth/v1/logout")?;

        let span = info_span!("provider.sign_out", http.method = "POST", url = %url);
        let response = self
            .with_api_key(self.client.post(url))
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: provider_error_message(&body),
        })
    }

    fn authorize_url(
        &self,
        oauth_provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, ProviderError> {
        let mut url = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", oauth_provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");

        debug!("authorize URL: {}", url);

        Ok(url)
    }
}

/// `my-project.supabase.co` -> `my-project`
#[must_use]
pub fn project_ref_from_host(host: &str) -> String {
    host.split('.').next().unwrap_or(host).to_string()
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: provider_error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|err| ProviderError::Decode(err.to_string()))
}

fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| json.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// Sign-up answers with a session when confirmation is disabled, otherwise with the bare user.
fn parse_sign_up(body: Value) -> Result<SignUpOutcome, ProviderError> {
    if body.get("access_token").is_some() {
        let session: Session =
            serde_json::from_value(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
        let session = session.with_absolute_expiry(unix_now());
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = body.get("user").cloned().unwrap_or(body);
    let user = if user_value.get("id").is_some() {
        Some(
            serde_json::from_value(user_value)
                .map_err(|err| ProviderError::Decode(err.to_string()))?,
        )
    } else {
        None
    };

    Ok(SignUpOutcome {
        user,
        session: None,
    })
}
