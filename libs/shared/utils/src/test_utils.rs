//! Config and token helpers for tests across the workspace.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, DOCTOR_ROLE};

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

/// Config pointing at `supabase_url`, with short timeouts and the test secret.
pub fn test_config_for(supabase_url: impl Into<String>) -> AppConfig {
    AppConfig {
        supabase_url: supabase_url.into(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_key: "test-service-key".to_string(),
        supabase_jwt_secret: TEST_JWT_SECRET.to_string(),
        stats_query_timeout_ms: 2_000,
        supabase_max_rows: 1_000,
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

/// Config whose Supabase URL is never expected to be reached.
pub fn test_config() -> Arc<AppConfig> {
    Arc::new(test_config_for("http://localhost:54321"))
}

/// A caller as the auth middleware would insert it.
pub fn test_user(id: &str, role: Option<&str>) -> User {
    User {
        id: id.to_string(),
        email: None,
        role: role.map(str::to_string),
        metadata: None,
        created_at: None,
    }
}

/// Builds HS256 tokens with the claims the stats endpoint cares about.
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    sub: String,
    role: Option<String>,
    expires_in: Duration,
    secret: String,
}

impl TokenBuilder {
    fn with_role(role: Option<&str>) -> Self {
        Self {
            sub: Uuid::new_v4().to_string(),
            role: role.map(str::to_string),
            expires_in: Duration::hours(1),
            secret: TEST_JWT_SECRET.to_string(),
        }
    }

    pub fn doctor() -> Self {
        Self::with_role(Some(DOCTOR_ROLE))
    }

    pub fn patient() -> Self {
        Self::with_role(Some("patient"))
    }

    /// A token whose claims carry no `role` at all.
    pub fn without_role() -> Self {
        Self::with_role(None)
    }

    pub fn subject(mut self, sub: &str) -> Self {
        self.sub = sub.to_string();
        self
    }

    pub fn expired(mut self) -> Self {
        self.expires_in = Duration::hours(-1);
        self
    }

    pub fn signed_with(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    pub fn build(&self) -> String {
        let now = Utc::now();

        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("exp".to_string(), json!((now + self.expires_in).timestamp()));
        if let Some(role) = &self.role {
            claims.insert("role".to_string(), json!(role));
        }

        let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
        let payload = URL_SAFE_NO_PAD.encode(Value::Object(claims).to_string());
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }

    /// `Authorization` header value carrying the token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.build())
    }
}
