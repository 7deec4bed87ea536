//! Domain entities mirrored from storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// A stored document together with the logins currently granted access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub name: String,
    pub mime: String,
    /// Whether the document carries uploaded bytes rather than metadata only.
    pub file: bool,
    pub public: bool,
    pub created_at: OffsetDateTime,
    pub grants: Vec<String>,
    pub path: String,
}

impl DocumentRecord {
    pub fn is_granted_to(&self, login: &str) -> bool {
        self.grants.iter().any(|grant| grant == login)
    }

    /// Public documents are readable by anyone; the rest only by grantees.
    pub fn is_readable_by(&self, login: &str) -> bool {
        self.public || self.is_granted_to(login)
    }
}

/// Caller-supplied fields of a document that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub mime: String,
    pub file: bool,
    pub public: bool,
    pub grants: Vec<String>,
    /// Uploaded bytes. Required when `file` is set, ignored otherwise.
    pub content: Option<Vec<u8>>,
}
