//! HTTP implementation of [`ThoughtRepository`].
//!
//! # Responsibility
//! - Speak the REST surface (`/thoughts/` plus per-id and link routes)
//!   over a blocking client, translating wire payloads to validated
//!   records.
//!
//! # Invariants
//! - Collection routes keep their trailing slash.
//! - A 404 on `get` reads as absence; a 404 on `remove` reads as already
//!   deleted; every other non-2xx status surfaces as
//!   [`RepositoryError::Http`] with the response body attached.
//! - Payloads that decode but fail validation surface as `InvalidData`,
//!   never as a panic or a silently accepted record.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

use super::thought_repo::{RepoResult, RepositoryError, ThoughtRepository};
use crate::config::CoreConfig;
use crate::model::thought::{
    format_timestamp, parse_timestamp, Thought, ThoughtDraft, ThoughtPatch, ValidationError,
    DEFAULT_TITLE,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireThought {
    id: String,
    title: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
    created_at: String,
    updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    title: String,
    content: String,
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct WirePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

fn encode_draft(draft: &ThoughtDraft) -> WireDraft {
    WireDraft {
        id: draft.id.clone(),
        title: draft
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        content: draft.content.clone(),
        tags: draft.tags.clone(),
        links: draft.links.clone(),
        created_at: draft.created_at.as_ref().map(format_timestamp),
        updated_at: draft.updated_at.as_ref().map(format_timestamp),
    }
}

fn encode_patch(patch: &ThoughtPatch) -> WirePatch {
    WirePatch {
        title: patch.title.clone(),
        content: patch.content.clone(),
        tags: patch.tags.clone(),
        links: patch.links.clone(),
        updated_at: patch.updated_at.as_ref().map(format_timestamp),
    }
}

fn decode_thought(body: &str) -> RepoResult<Thought> {
    let wire: WireThought = serde_json::from_str(body).map_err(invalid_data)?;
    wire_to_thought(wire)
}

fn decode_thoughts(body: &str) -> RepoResult<Vec<Thought>> {
    let wires: Vec<WireThought> = serde_json::from_str(body).map_err(invalid_data)?;
    wires.into_iter().map(wire_to_thought).collect()
}

fn wire_to_thought(wire: WireThought) -> RepoResult<Thought> {
    let created_at = parse_timestamp("created_at", &wire.created_at).map_err(invalid_data)?;
    let updated_at = parse_timestamp("updated_at", &wire.updated_at).map_err(invalid_data)?;
    let thought = Thought {
        id: wire.id,
        title: wire.title,
        content: wire.content,
        tags: wire.tags,
        links: wire.links,
        created_at,
        updated_at,
    };
    thought.normalized().map_err(invalid_data)
}

fn invalid_data(err: impl Display) -> RepositoryError {
    RepositoryError::InvalidData(err.to_string())
}

fn transport(err: reqwest::Error) -> RepositoryError {
    RepositoryError::Transport(err.to_string())
}

fn http_error(status: StatusCode, body: String) -> RepositoryError {
    RepositoryError::Http {
        status: status.as_u16(),
        body,
    }
}

pub struct HttpThoughtRepository {
    base_url: String,
    client: Client,
}

impl HttpThoughtRepository {
    pub fn new(config: &CoreConfig) -> RepoResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            base_url: config.api_base_url().to_string(),
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/thoughts/", self.base_url)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/thoughts/{id}", self.base_url)
    }

    fn link_url(&self, source: &str, target: &str) -> String {
        format!("{}/thoughts/{source}/links/{target}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> RepoResult<(StatusCode, String)> {
        let response = request.send().map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;
        Ok((status, body))
    }
}

impl ThoughtRepository for HttpThoughtRepository {
    fn create(&mut self, draft: ThoughtDraft) -> RepoResult<Thought> {
        let (status, body) = self.send(
            self.client
                .post(self.collection_url())
                .json(&encode_draft(&draft)),
        )?;
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thought(&body)
    }

    fn update(&mut self, id: &str, patch: ThoughtPatch) -> RepoResult<Thought> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        let (status, body) = self.send(
            self.client
                .patch(self.item_url(id))
                .json(&encode_patch(&patch)),
        )?;
        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thought(&body)
    }

    fn get(&self, id: &str) -> RepoResult<Option<Thought>> {
        let (status, body) = self.send(self.client.get(self.item_url(id)))?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thought(&body).map(Some)
    }

    fn list(&self) -> RepoResult<Vec<Thought>> {
        let (status, body) = self.send(self.client.get(self.collection_url()))?;
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thoughts(&body)
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Thought>> {
        let (status, body) = self.send(
            self.client
                .get(self.collection_url())
                .query(&[("search", query)]),
        )?;
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thoughts(&body)
    }

    fn link(&mut self, source: &str, target: &str) -> RepoResult<Thought> {
        if source == target {
            return Err(ValidationError::SelfLink(source.to_string()).into());
        }
        let (status, body) = self.send(self.client.post(self.link_url(source, target)))?;
        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound(source.to_string()));
        }
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thought(&body)
    }

    fn unlink(&mut self, source: &str, target: &str) -> RepoResult<Thought> {
        let (status, body) = self.send(self.client.delete(self.link_url(source, target)))?;
        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound(source.to_string()));
        }
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        decode_thought(&body)
    }

    fn remove(&mut self, id: &str) -> RepoResult<()> {
        let (status, body) = self.send(self.client.delete(self.item_url(id)))?;
        if status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        Ok(())
    }
}
