//! In-process document storage.

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{DocumentsRepo, RepoError};
use crate::domain::documents::DocumentFilter;
use crate::domain::entities::DocumentRecord;

/// Documents and known user logins held in memory.
///
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    documents: Arc<DashMap<Uuid, DocumentRecord>>,
    users: Arc<DashSet<String>>,
}

impl InMemoryRepositories {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repos = Self::default();
        for login in users {
            repos.users.insert(login.into());
        }
        repos
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl DocumentsRepo for InMemoryRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRecord>, RepoError> {
        Ok(self.documents.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, RepoError> {
        let mut documents: Vec<DocumentRecord> = self
            .documents
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        documents.sort_by_key(|document| (Reverse(document.created_at), document.id));
        documents.truncate(filter.limit as usize);
        Ok(documents)
    }

    async fn create_document(&self, document: &DocumentRecord) -> Result<(), RepoError> {
        if let Some(login) = document
            .grants
            .iter()
            .find(|login| !self.users.contains(login.as_str()))
        {
            return Err(RepoError::integrity(format!(
                "grant references unknown user `{login}`"
            )));
        }

        match self.documents.entry(document.id) {
            Entry::Occupied(_) => Err(RepoError::integrity(format!(
                "document `{}` already exists",
                document.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(document.clone());
                debug!(document_id = %document.id, "Stored document");
                Ok(())
            }
        }
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), RepoError> {
        match self.documents.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::domain::documents::FilterField;

    fn document(name: &str, age_secs: i64, grants: &[&str]) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            mime: if name.ends_with(".png") {
                "image/png".to_string()
            } else {
                "text/plain".to_string()
            },
            file: true,
            public: false,
            created_at: OffsetDateTime::now_utc() - Duration::seconds(age_secs),
            grants: grants.iter().map(|login| login.to_string()).collect(),
            path: format!("uploads/{name}"),
        }
    }

    #[tokio::test]
    async fn unknown_grantee_is_an_integrity_error() {
        let repos = InMemoryRepositories::new(["alice"]);

        let err = repos
            .create_document(&document("a.txt", 0, &["mallory"]))
            .await
            .expect_err("unknown user");

        assert!(matches!(err, RepoError::Integrity { .. }));
        assert_eq!(repos.document_count(), 0);
    }

    #[tokio::test]
    async fn list_filters_orders_and_limits() {
        let repos = InMemoryRepositories::new(["alice", "bob"]);
        let old = document("old.png", 30, &["alice"]);
        let new = document("new.png", 10, &["alice"]);
        let text = document("notes.txt", 5, &["alice"]);
        let other = document("other.png", 1, &["bob"]);
        for doc in [&old, &new, &text, &other] {
            repos.create_document(doc).await.expect("create");
        }

        let filter = DocumentFilter::default()
            .with_login("alice")
            .with_field(FilterField::Mime, "image/png");
        let listed = repos.list_documents(&filter).await.expect("list");
        assert_eq!(listed, vec![new.clone(), old.clone()]);

        let limited = repos
            .list_documents(&DocumentFilter::default().with_limit(2))
            .await
            .expect("list");
        assert_eq!(limited, vec![other, text]);
    }

    #[tokio::test]
    async fn delete_unknown_document_is_not_found() {
        let repos = InMemoryRepositories::new(["alice"]);
        let doc = document("a.txt", 0, &["alice"]);
        repos.create_document(&doc).await.expect("create");

        repos.delete_document(doc.id).await.expect("delete");
        assert!(matches!(
            repos.delete_document(doc.id).await,
            Err(RepoError::NotFound)
        ));
        assert_eq!(repos.find_by_id(doc.id).await.expect("find"), None);
    }
}
