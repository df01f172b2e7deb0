//! Core data models shared by the store, matcher, and service layers.

use serde::{Deserialize, Serialize};

use crate::error::{QaError, Result};

/// A stored question/answer pair with the embedding computed at insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

/// A question/answer pair without its embedding, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgePair {
    pub question: String,
    pub answer: String,
}

impl From<&KnowledgeEntry> for KnowledgePair {
    fn from(entry: &KnowledgeEntry) -> Self {
        Self {
            question: entry.question.clone(),
            answer: entry.answer.clone(),
        }
    }
}

/// One row of the append-only interaction log.
///
/// Answered questions carry the delivered `answer`; feedback rows carry a
/// `feedback` rating. The timestamp is assigned by the log backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    pub user_id: String,
    pub question: String,
    pub answer: Option<String>,
    pub feedback: Option<Rating>,
}

/// A user rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(QaError::InvalidRating(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Access level of the caller, resolved by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

/// The identity on whose behalf an operation runs.
///
/// The core never consults an allow-list itself; it trusts the role it is
/// handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with [`QaError::Unauthorized`] unless the principal is an admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(QaError::Unauthorized(self.id.clone()))
        }
    }
}

/// Which text an entry's embedding is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedTextPolicy {
    /// The question alone. Queries phrased like the stored question match
    /// with similarity close to 1.0.
    #[default]
    Question,
    /// `"{question} {answer}"`.
    QuestionAndAnswer,
}

impl EmbedTextPolicy {
    /// Build the canonical text for an entry under this policy.
    pub fn canonical_text(self, question: &str, answer: &str) -> String {
        match self {
            EmbedTextPolicy::Question => question.to_string(),
            EmbedTextPolicy::QuestionAndAnswer => format!("{} {}", question, answer),
        }
    }
}

/// How many rows `remove` deletes when several share the same question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovePolicy {
    /// Every row whose question matches exactly.
    #[default]
    All,
    /// Only the earliest inserted matching row.
    First,
}
