use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    answer: String,
}

/// Why a reply could not be fetched. Users only ever see the locale's
/// fixed error text; the detail goes to the log.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("chat endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("could not decode chat reply: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the `/api/chat` endpoint
#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    pub async fn ask(&self, message: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(ChatError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let reply: ChatResponse = response.json().await.map_err(ChatError::Decode)?;
        Ok(reply.answer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Reply with the user's own text
    Echo,
    /// Ask the remote chat endpoint
    #[default]
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Echo => "echo",
            BackendKind::Remote => "remote",
        }
    }
}

/// Where replies come from
#[derive(Clone, Debug)]
pub enum Backend {
    Echo,
    Remote(ChatClient),
}

impl Backend {
    pub fn new(kind: BackendKind, base_url: &str) -> Self {
        match kind {
            BackendKind::Echo => Backend::Echo,
            BackendKind::Remote => Backend::Remote(ChatClient::new(base_url)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Echo => BackendKind::Echo,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    /// Short description for the header bar
    pub fn display_name(&self) -> String {
        match self {
            Backend::Echo => "echo".to_string(),
            Backend::Remote(client) => client.base_url().to_string(),
        }
    }

    pub async fn reply(&self, message: &str) -> Result<String, ChatError> {
        match self {
            Backend::Echo => Ok(message.to_string()),
            Backend::Remote(client) => client.ask(message).await,
        }
    }
}
