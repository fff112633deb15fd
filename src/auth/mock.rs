//! Offline login against fixed development users

use super::token::{encode_unsigned, TokenClaims};
use super::AuthError;
use crate::client::{LoginRequest, LoginResponse};
use chrono::{Duration as TokenLifetime, Utc};
use std::time::Duration;

pub const MOCK_SIGNATURE: &str = "mock-signature";
const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
pub struct MockUser {
    pub username: &'static str,
    pub password: &'static str,
    pub email: &'static str,
    pub role: &'static str,
}

pub const MOCK_USERS: [MockUser; 3] = [
    MockUser {
        username: "admin",
        password: "admin123",
        email: "admin@genesis.pt",
        role: "admin",
    },
    MockUser {
        username: "user",
        password: "user123",
        email: "user@genesis.pt",
        role: "user",
    },
    MockUser {
        username: "test",
        password: "test123",
        email: "test@genesis.pt",
        role: "user",
    },
];

/// Simulated login service issuing 24h tokens
#[derive(Debug, Clone)]
pub struct MockAuth {
    delay: Duration,
}

impl Default for MockAuth {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl MockAuth {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        tokio::time::sleep(self.delay).await;

        let user = MOCK_USERS
            .iter()
            .find(|u| u.username == request.username && u.password == request.password)
            .ok_or(AuthError::Rejected { status: 401 })?;

        let now = Utc::now();
        let claims = TokenClaims {
            sub: Some(user.username.to_string()),
            email: Some(user.email.to_string()),
            role: Some(user.role.to_string()),
            exp: Some((now + TokenLifetime::hours(24)).timestamp()),
            iat: Some(now.timestamp()),
        };
        let token = encode_unsigned(&claims, MOCK_SIGNATURE)
            .map_err(|_| AuthError::Rejected { status: 500 })?;

        Ok(LoginResponse {
            token,
            user: Some(serde_json::json!({
                "username": user.username,
                "email": user.email,
                "role": user.role,
            })),
        })
    }
}
