//! Request/reply contracts for the compile, render, and flush exchanges.
//!
//! Field names are camelCase on the wire. Failed replies carry both a
//! human-readable `message` and a machine-readable `failure` tag.

use serde::{Deserialize, Serialize};

use crate::domain::{FailureKind, RenderData, TemplateFailure, TemplateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub template_id: TemplateId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl CompileReply {
    pub fn ok(id: &TemplateId) -> Self {
        Self {
            status: ReplyStatus::Ok,
            message: Some(format!("successfully compiled {id}")),
            failure: None,
        }
    }

    pub fn failed(failure: &TemplateFailure) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: Some(failure.public_message()),
            failure: Some(failure.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub template_id: TemplateId,
    #[serde(default)]
    pub data: RenderData,
}

impl RenderRequest {
    pub fn new(template_id: impl Into<TemplateId>, data: RenderData) -> Self {
        Self {
            template_id: template_id.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl RenderReply {
    pub fn ok(output: String) -> Self {
        Self {
            status: ReplyStatus::Ok,
            output: Some(output),
            message: None,
            failure: None,
        }
    }

    pub fn failed(failure: &TemplateFailure) -> Self {
        Self {
            status: ReplyStatus::Error,
            output: None,
            message: Some(failure.public_message()),
            failure: Some(failure.kind()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReply {
    pub status: ReplyStatus,
}

impl FlushReply {
    pub fn ok() -> Self {
        Self {
            status: ReplyStatus::Ok,
        }
    }
}

/// All three operations behind one address, selected by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    Compile(CompileRequest),
    Render(RenderRequest),
    Flush(FlushRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Compile(CompileReply),
    Render(RenderReply),
    Flush(FlushReply),
}

impl Reply {
    pub fn status(&self) -> ReplyStatus {
        match self {
            Reply::Compile(reply) => reply.status,
            Reply::Render(reply) => reply.status,
            Reply::Flush(reply) => reply.status,
        }
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Reply::Compile(reply) => reply.failure,
            Reply::Render(reply) => reply.failure,
            Reply::Flush(_) => None,
        }
    }
}
