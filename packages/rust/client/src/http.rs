//! `reqwest` implementation of [`DemoBackend`].
//!
//! Talks to the site's API routes: multipart upload to `/api/documents`,
//! JSON to `/api/documents/process` and `/api/demo/chat`. Response bodies
//! have drifted between deployments (`{ data: { id } }` vs `{ document: { id } }`,
//! wrapped vs flat chat answers), so decoding accepts each known shape.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use botdemo_shared::{ChatSource, ClientConfig, DemoError, Result};

use crate::{
    CHAT_PATH, ChatReply, ChatRequest, DemoBackend, DocumentId, PROCESS_PATH, RawFile,
    UPLOAD_PATH,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("BotDemo/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the demo API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpBackend {
    /// Create a backend for the given configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            DemoError::config(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        // Endpoints join relative to the base path, so `https://host/site`
        // must be treated as the directory `/site/`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DemoError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| DemoError::config(format!("cannot join {path} onto base URL: {e}")))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder> {
        let request = self.client.post(self.endpoint(path)?);
        Ok(match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }
}

/// Send a request and turn transport failures and non-2xx statuses into errors.
async fn send(request: RequestBuilder, path: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| DemoError::Network(format!("{path}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        warn!(path, status = status.as_u16(), "backend returned an error status");
        return Err(DemoError::http(path, status.as_u16()));
    }

    Ok(response)
}

async fn read_json(response: Response, path: &str) -> Result<Value> {
    response
        .json::<Value>()
        .await
        .map_err(|e| DemoError::Decode(format!("{path}: {e}")))
}

#[async_trait]
impl DemoBackend for HttpBackend {
    #[instrument(skip_all, fields(file = %file.name, size = file.size()))]
    async fn upload_document(&self, file: &RawFile) -> Result<DocumentId> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| {
                DemoError::validation(format!("invalid MIME type '{}': {e}", file.mime_type))
            })?;
        let form = Form::new().part("file", part);

        let response = send(self.post(UPLOAD_PATH)?.multipart(form), UPLOAD_PATH).await?;
        let body = read_json(response, UPLOAD_PATH).await?;

        let id = document_id_from(&body).ok_or_else(|| {
            DemoError::Decode(format!("{UPLOAD_PATH}: response carries no document id"))
        })?;
        debug!(document_id = %id, "document uploaded");
        Ok(id)
    }

    #[instrument(skip_all, fields(document_id = %id))]
    async fn process_document(&self, id: &DocumentId) -> Result<()> {
        let body = serde_json::json!({ "documentId": id.0 });
        send(self.post(PROCESS_PATH)?.json(&body), PROCESS_PATH).await?;
        debug!("document processed");
        Ok(())
    }

    #[instrument(skip_all, fields(message_len = request.message.len()))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = send(self.post(CHAT_PATH)?.json(request), CHAT_PATH).await?;
        let envelope: ChatEnvelope = response
            .json()
            .await
            .map_err(|e| DemoError::Decode(format!("{CHAT_PATH}: {e}")))?;
        Ok(envelope.into_reply())
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Find the document id in an upload response.
fn document_id_from(body: &Value) -> Option<DocumentId> {
    let candidates = [
        body.pointer("/data/id"),
        body.pointer("/document/id"),
        body.get("documentId"),
        body.get("id"),
    ];

    candidates.into_iter().flatten().find_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(DocumentId(s.clone())),
        Value::Number(n) => Some(DocumentId(n.to_string())),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatEnvelope {
    Wrapped { data: ChatBody },
    Flat(ChatBody),
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    response: String,
    #[serde(default)]
    sources: Vec<WireSource>,
}

/// A cited source as the various chat routes report it.
#[derive(Debug, Deserialize)]
struct WireSource {
    title: Option<String>,
    topic: Option<String>,
    question: Option<String>,
    content: Option<String>,
    relevance: Option<f64>,
    score: Option<f64>,
}

impl ChatEnvelope {
    fn into_reply(self) -> ChatReply {
        let body = match self {
            Self::Wrapped { data } => data,
            Self::Flat(body) => body,
        };
        ChatReply {
            response: body.response,
            sources: body.sources.into_iter().map(WireSource::into_source).collect(),
        }
    }
}

impl WireSource {
    fn into_source(self) -> ChatSource {
        ChatSource {
            title: self
                .title
                .or(self.topic)
                .or(self.question)
                .unwrap_or_else(|| "Untitled source".to_string()),
            content: self.content,
            relevance: self.relevance.or(self.score),
        }
    }
}
