//! Optional login gate
//!
//! With login disabled every session counts as authenticated. Otherwise a
//! stored, unexpired token is required; tokens come from the backend or from
//! the offline mock users.

mod mock;
mod token;

pub use mock::MockAuth;
pub use token::{decode_claims, is_expired, TokenClaims};

use crate::client::{ApiClient, ApiError, LoginRequest, LoginResponse};
use crate::locale::Language;
use crate::store::{LocalStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingFields,
    /// `status` is 0 when the server could not be reached
    #[error("Login rejected (status {status})")]
    Rejected { status: u16 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        AuthError::Rejected { status: e.status }
    }
}

impl AuthError {
    /// Text shown to the user for this failure
    pub fn message(&self, language: Language) -> &'static str {
        match (self, language) {
            (AuthError::MissingFields, Language::Pt) => {
                "Por favor, preencha todos os campos obrigatórios."
            }
            (AuthError::MissingFields, Language::En) => "Please fill in all required fields.",
            (AuthError::Rejected { status: 401 }, Language::Pt) => {
                "Credenciais inválidas. Verifique o seu utilizador e palavra-passe."
            }
            (AuthError::Rejected { status: 401 }, Language::En) => {
                "Invalid credentials. Check your username and password."
            }
            (AuthError::Rejected { status: 400 }, Language::Pt) => {
                "Dados inválidos. Por favor, verifique os campos preenchidos."
            }
            (AuthError::Rejected { status: 400 }, Language::En) => {
                "Invalid data. Please check the fields you filled in."
            }
            (AuthError::Rejected { status: 0 }, Language::Pt) => {
                "Erro de conexão. Verifique a sua ligação à internet."
            }
            (AuthError::Rejected { status: 0 }, Language::En) => {
                "Connection error. Check your internet connection."
            }
            (_, Language::Pt) => "Ocorreu um erro inesperado. Tente novamente mais tarde.",
            (_, Language::En) => "An unexpected error occurred. Please try again later.",
        }
    }
}

/// Where credentials are checked
pub enum LoginBackend {
    Mock(MockAuth),
    Remote(Arc<ApiClient>),
}

pub struct AuthService {
    login_enabled: bool,
    backend: LoginBackend,
    store: LocalStore,
}

impl AuthService {
    pub fn new(login_enabled: bool, backend: LoginBackend, store: LocalStore) -> Self {
        Self {
            login_enabled,
            backend,
            store,
        }
    }

    pub fn is_login_enabled(&self) -> bool {
        self.login_enabled
    }

    /// Check credentials and store the issued token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let result = match &self.backend {
            LoginBackend::Mock(mock) => mock.login(&request).await,
            LoginBackend::Remote(client) => client.login(&request).await.map_err(AuthError::from),
        };
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(username, error = %e, "Login failed");
                return Err(e);
            }
        };

        if !response.token.is_empty() {
            self.store.set_auth_token(&response.token)?;
        }
        tracing::info!(username, "Logged in");
        Ok(response)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.remove_auth_token()?;
        tracing::info!("Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        if !self.login_enabled {
            return true;
        }
        match self.store.auth_token() {
            Ok(Some(token)) => !is_expired(&token, Utc::now()),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read auth token");
                false
            }
        }
    }

    /// Claims of the stored token, if any
    pub fn user_info(&self) -> Option<TokenClaims> {
        self.store
            .auth_token()
            .ok()
            .flatten()
            .and_then(|token| decode_claims(&token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service(login_enabled: bool) -> AuthService {
        AuthService::new(
            login_enabled,
            LoginBackend::Mock(MockAuth::new(Duration::ZERO)),
            LocalStore::open_in_memory().unwrap(),
        )
    }

    #[test]
    fn test_disabled_login_is_always_authenticated() {
        assert!(service(false).is_authenticated());
        assert!(!service(true).is_authenticated());
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let auth = service(true);
        auth.login("user", "user123").await.unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(
            auth.user_info().unwrap().email.as_deref(),
            Some("user@genesis.pt")
        );

        auth.logout().unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.user_info().is_none());
    }

    #[tokio::test]
    async fn test_empty_fields_rejected_before_backend() {
        let err = service(true).login("  ", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingFields));
    }

    #[test]
    fn test_expired_stored_token_not_authenticated() {
        let auth = service(true);
        let claims = TokenClaims {
            exp: Some(1),
            ..Default::default()
        };
        let token = token::encode_unsigned(&claims, "sig").unwrap();
        auth.store.set_auth_token(&token).unwrap();
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_localized_messages_by_status() {
        let msg = |status| AuthError::Rejected { status }.message(Language::Pt);
        assert!(msg(401).starts_with("Credenciais inválidas"));
        assert!(msg(400).starts_with("Dados inválidos"));
        assert!(msg(0).starts_with("Erro de conexão"));
        assert!(msg(503).starts_with("Ocorreu um erro inesperado"));
        assert_eq!(
            AuthError::Rejected { status: 401 }.message(Language::En),
            "Invalid credentials. Check your username and password."
        );
    }

    #[test]
    fn test_api_error_status_carried() {
        let err: AuthError = ApiError::network("down").into();
        assert!(matches!(err, AuthError::Rejected { status: 0 }));
    }
}
