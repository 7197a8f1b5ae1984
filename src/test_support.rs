//! In-memory provider and profile store for handler tests.

use crate::{
    api::store::{ProfileRecord, ProfileStore},
    provider::{
        IdentityProvider, ProviderError, Session, SignUpOutcome, SignUpRequest, User,
        UserMetadata,
    },
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};
use url::Url;
use uuid::Uuid;

pub const PROJECT_REF: &str = "testproj";

pub fn user(id: u128, email: &str, full_name: Option<&str>) -> User {
    User {
        id: Uuid::from_u128(id),
        email: Some(email.to_string()),
        user_metadata: UserMetadata {
            full_name: full_name.map(str::to_string),
        },
    }
}

pub fn session_for(user: &User, access: &str, refresh: &str, expires_at: i64) -> Session {
    let mut session = Session::new(access, refresh);
    session.expires_at = Some(expires_at);
    session.expires_in = Some(3600);
    session.token_type = Some("bearer".to_string());
    session.user = Some(user.clone());
    session
}

fn rejected(message: &str) -> ProviderError {
    ProviderError::Rejected {
        status: 401,
        message: message.to_string(),
    }
}

#[derive(Default)]
pub struct FakeProvider {
    users: Mutex<HashMap<String, User>>,
    refreshes: Mutex<HashMap<String, Session>>,
    codes: Mutex<HashMap<String, (Option<String>, Session)>>,
    passwords: Mutex<HashMap<(String, String), Session>>,
    pending_signups: Mutex<Vec<String>>,
    unavailable: AtomicBool,
    refresh_calls: AtomicUsize,
    sign_outs: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, access_token: &str, user: &User) -> Self {
        self.allow_access(access_token, user);
        self
    }

    pub fn allow_access(&self, access_token: &str, user: &User) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(access_token.to_string(), user.clone());
        }
    }

    /// `refresh_token` yields `session`, whose access token also becomes valid.
    pub fn with_refresh(self, refresh_token: &str, session: Session) -> Self {
        if let Some(user) = &session.user {
            self.allow_access(&session.access_token, user);
        }
        if let Ok(mut refreshes) = self.refreshes.lock() {
            refreshes.insert(refresh_token.to_string(), session);
        }
        self
    }

    pub fn with_code(self, code: &str, verifier: Option<&str>, session: Session) -> Self {
        if let Some(user) = &session.user {
            self.allow_access(&session.access_token, user);
        }
        if let Ok(mut codes) = self.codes.lock() {
            codes.insert(code.to_string(), (verifier.map(str::to_string), session));
        }
        self
    }

    pub fn with_password(self, email: &str, password: &str, session: Session) -> Self {
        if let Some(user) = &session.user {
            self.allow_access(&session.access_token, user);
        }
        if let Ok(mut passwords) = self.passwords.lock() {
            passwords.insert((email.to_string(), password.to_string()), session);
        }
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn pending_signups(&self) -> Vec<String> {
        self.pending_signups
            .lock()
            .map(|pending| pending.clone())
            .unwrap_or_default()
    }

    pub fn sign_outs(&self) -> Vec<String> {
        self.sign_outs
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Rejected {
                status: 503,
                message: "upstream unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn project_ref(&self) -> &str {
        PROJECT_REF
    }

    async fn get_user(&self, access_token: &str) -> Result<User, ProviderError> {
        self.check_available()?;
        self.users
            .lock()
            .ok()
            .and_then(|users| users.get(access_token).cloned())
            .ok_or_else(|| rejected("invalid JWT"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        self.check_available()?;
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshes
            .lock()
            .ok()
            .and_then(|refreshes| refreshes.get(refresh_token).cloned())
            .ok_or_else(|| ProviderError::Rejected {
                status: 400,
                message: "Invalid Refresh Token".to_string(),
            })
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, ProviderError> {
        self.check_available()?;
        let entry = self
            .codes
            .lock()
            .ok()
            .and_then(|codes| codes.get(auth_code).cloned());
        match entry {
            Some((expected, session)) if expected.as_deref() == code_verifier => Ok(session),
            _ => Err(ProviderError::Rejected {
                status: 400,
                message: "invalid flow state".to_string(),
            }),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        self.check_available()?;
        self.passwords
            .lock()
            .ok()
            .and_then(|passwords| {
                passwords
                    .get(&(email.to_string(), password.to_string()))
                    .cloned()
            })
            .ok_or_else(|| ProviderError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, ProviderError> {
        self.check_available()?;
        if let Ok(mut pending) = self.pending_signups.lock() {
            pending.push(request.email.clone());
        }
        Ok(SignUpOutcome {
            user: Some(User {
                id: Uuid::from_u128(0xfeed),
                email: Some(request.email.clone()),
                user_metadata: UserMetadata {
                    full_name: request.full_name.clone(),
                },
            }),
            session: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        if let Ok(mut calls) = self.sign_outs.lock() {
            calls.push(access_token.to_string());
        }
        Ok(())
    }

    fn authorize_url(
        &self,
        oauth_provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, ProviderError> {
        let mut url = Url::parse("https://testproj.supabase.co/auth/v1/authorize")
            .map_err(|err| ProviderError::Config(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", oauth_provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, ProfileRecord>>,
    broken: AtomicBool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, id: Uuid, full_name: Option<&str>, email: Option<&str>) -> Self {
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.insert(
                id,
                ProfileRecord {
                    full_name: full_name.map(str::to_string),
                    email: email.map(str::to_string),
                },
            );
        }
        self
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, sqlx::Error> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self
            .profiles
            .lock()
            .ok()
            .and_then(|profiles| profiles.get(&user_id).cloned()))
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.broken.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}
