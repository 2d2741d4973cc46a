//! Backend client for random Pokemon and capture submissions

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NamedResource {
    pub name: String,
}

/// A Pokemon record as served by `GET /pokemon/random/`.
///
/// The backend nests the elemental type as `tipo: {"name": ...}`; older
/// payloads carry a flat `type` string. Either is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PokemonRecord {
    pub name: String,
    pub hp: u16,
    pub attack: u16,
    #[serde(default)]
    pub defense: Option<u16>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<NamedResource>,
}

impl PokemonRecord {
    pub fn new(name: &str, hp: u16, attack: u16, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            hp,
            attack,
            defense: None,
            image: None,
            type_name: Some(type_name.to_string()),
            tipo: None,
        }
    }

    pub fn element_name(&self) -> Option<&str> {
        self.type_name
            .as_deref()
            .or_else(|| self.tipo.as_ref().map(|tipo| tipo.name.as_str()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CaptureReceipt {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("response parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait PokemonApi: Send + Sync {
    async fn random_pokemon(&self) -> Result<PokemonRecord, ApiError>;
    async fn capture(&self, name: &str) -> Result<CaptureReceipt, ApiError>;
}

/// Fetch the player and enemy records concurrently; fails if either fails.
pub async fn fetch_combatants(
    api: &dyn PokemonApi,
) -> Result<(PokemonRecord, PokemonRecord), ApiError> {
    tokio::try_join!(api.random_pokemon(), api.random_pokemon())
}

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Exchange credentials for an access token (`POST /auth/login/`).
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        let response = self
            .client
            .post(self.url("auth/login/"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(login.access)
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl PokemonApi for HttpApi {
    async fn random_pokemon(&self) -> Result<PokemonRecord, ApiError> {
        let response = self
            .authorize(self.client.get(self.url("pokemon/random/")))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn capture(&self, name: &str) -> Result<CaptureReceipt, ApiError> {
        let body = serde_json::json!({ "name": name });
        let response = self
            .authorize(self.client.post(self.url("pokemon/capturar/")))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        capture_result(status, &body)
    }
}

/// Only 200 and 201 count as a capture; any other status is a rejection.
fn capture_result(status: StatusCode, body: &[u8]) -> Result<CaptureReceipt, ApiError> {
    match status {
        StatusCode::OK | StatusCode::CREATED => {
            Ok(serde_json::from_slice(body).unwrap_or_default())
        }
        _ => Err(ApiError::Rejected {
            status: status.as_u16(),
            message: rejection_message(body),
        }),
    }
}

async fn rejected(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let message = match response.bytes().await {
        Ok(body) => rejection_message(&body),
        Err(_) => NO_DETAILS.to_string(),
    };
    ApiError::Rejected { status, message }
}

const NO_DETAILS: &str = "no details";

/// Prefer the backend's `error` field, then DRF's `detail`.
fn rejection_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error.or(body.detail))
        .unwrap_or_else(|| NO_DETAILS.to_string())
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
