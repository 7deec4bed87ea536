//! Cache key and tag derivation.
//!
//! Keys identify a cached read; tags name the attributes that read depends
//! on, so a write can reach every entry it affects without knowing its key.

use std::borrow::Borrow;
use std::fmt;

use uuid::Uuid;

use crate::domain::documents::{DocumentFilter, FilterField};
use crate::domain::entities::DocumentRecord;

/// String classifier attached to cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn document(id: Uuid) -> Self {
        Self(format!("doc:{id}"))
    }

    pub fn file_name(name: &str) -> Self {
        Self(format!("fileName:{name}"))
    }

    pub fn mime(mime: &str) -> Self {
        Self(format!("mime:{mime}"))
    }

    pub fn is_file(file: bool) -> Self {
        Self(format!("isFile:{file}"))
    }

    pub fn user_login(login: &str) -> Self {
        Self(format!("userLogin:{login}"))
    }

    /// Tag describing the field/value part of a list query. A query without a
    /// field filter maps to `filter::`.
    pub fn filter(filter: &DocumentFilter) -> Self {
        match &filter.field {
            Some(field) => Self::filter_field(field.field, &field.value),
            None => Self::unfiltered(),
        }
    }

    pub fn filter_field(field: FilterField, value: &str) -> Self {
        Self(format!("filter:{field}:{value}"))
    }

    pub fn unfiltered() -> Self {
        Self("filter::".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Key of a cached read.
///
/// Two list reads share a key exactly when login, filter field, filter value
/// and limit all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Document(Uuid),
    DocumentList(DocumentFilter),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Document(id) => write!(f, "doc:{id}"),
            CacheKey::DocumentList(filter) => {
                let login = filter.login.as_deref().unwrap_or_default();
                let (field, value) = filter
                    .field
                    .as_ref()
                    .map(|field| (field.field.as_str(), field.value.as_str()))
                    .unwrap_or_default();
                write!(f, "docs:{login}:{field}:{value}:{}", filter.limit)
            }
        }
    }
}

/// Tags of a single cached document.
pub fn document_tags(document: &DocumentRecord) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(4 + document.grants.len());
    push_document_tags(&mut tags, document);
    tags
}

/// Tags to invalidate after `document` was written.
///
/// Besides the document's own tags this names every list filter the
/// document satisfies, so a list that should now gain or lose the document
/// is evicted even when none of its current members share a tag with it.
pub fn document_write_tags(document: &DocumentRecord) -> Vec<Tag> {
    let mut tags = document_tags(document);
    tags.push(Tag::unfiltered());
    tags.extend(FilterField::ALL.into_iter().filter_map(|field| {
        field
            .value_of(document)
            .map(|value| Tag::filter_field(field, &value))
    }));
    tags
}

/// Tags of a cached list result: the filter tag plus the tags of every
/// document in the result, so a write to any listed document reaches it.
///
/// A login-filtered list also carries that login's tag, so a document newly
/// granted to the login evicts the list even when the list was empty.
pub fn document_list_tags(filter: &DocumentFilter, documents: &[DocumentRecord]) -> Vec<Tag> {
    let mut tags = vec![Tag::filter(filter)];
    if let Some(login) = &filter.login {
        tags.push(Tag::user_login(login));
    }
    for document in documents {
        push_document_tags(&mut tags, document);
    }
    tags
}

fn push_document_tags(tags: &mut Vec<Tag>, document: &DocumentRecord) {
    tags.push(Tag::document(document.id));
    tags.push(Tag::file_name(&document.name));
    tags.push(Tag::mime(&document.mime));
    tags.push(Tag::is_file(document.file));
    tags.extend(document.grants.iter().map(|login| Tag::user_login(login)));
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::documents::FilterField;

    fn document(name: &str, mime: &str, grants: &[&str]) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            mime: mime.to_string(),
            file: true,
            public: false,
            created_at: OffsetDateTime::now_utc(),
            grants: grants.iter().map(|login| login.to_string()).collect(),
            path: format!("uploads/{name}"),
        }
    }

    #[test]
    fn document_tags_cover_every_attribute() {
        let doc = document("cat.png", "image/png", &["alice", "bob"]);
        let tags = document_tags(&doc);

        assert!(tags.contains(&Tag::document(doc.id)));
        assert!(tags.contains(&Tag::new("fileName:cat.png")));
        assert!(tags.contains(&Tag::new("mime:image/png")));
        assert!(tags.contains(&Tag::new("isFile:true")));
        assert!(tags.contains(&Tag::new("userLogin:alice")));
        assert!(tags.contains(&Tag::new("userLogin:bob")));
        assert_eq!(tags.len(), 6);
    }

    #[test]
    fn list_tags_include_filter_and_members() {
        let filter = DocumentFilter::default()
            .with_login("alice")
            .with_field(FilterField::Mime, "image/png");
        let a = document("a.png", "image/png", &["alice"]);
        let b = document("b.txt", "text/plain", &["alice", "carol"]);

        let tags = document_list_tags(&filter, &[a.clone(), b.clone()]);

        assert_eq!(tags[0], Tag::new("filter:mime:image/png"));
        assert!(tags.contains(&Tag::document(a.id)));
        assert!(tags.contains(&Tag::document(b.id)));
        assert!(tags.contains(&Tag::new("mime:text/plain")));
        assert!(tags.contains(&Tag::new("userLogin:carol")));
    }

    #[test]
    fn empty_login_list_still_tracks_login() {
        let filter = DocumentFilter::default().with_login("dave");
        let tags = document_list_tags(&filter, &[]);

        assert_eq!(tags, vec![Tag::new("filter::"), Tag::new("userLogin:dave")]);
    }

    #[test]
    fn write_tags_reach_every_matching_list_filter() {
        let doc = document("cat.png", "image/png", &["alice"]);
        let write_tags = document_write_tags(&doc);

        for tag in document_tags(&doc) {
            assert!(write_tags.contains(&tag));
        }
        assert!(write_tags.contains(&Tag::new("filter::")));
        assert!(write_tags.contains(&Tag::new("filter:mime:image/png")));
        assert!(write_tags.contains(&Tag::new("filter:name:cat.png")));
        assert!(write_tags.contains(&Tag::new("filter:file:true")));
        assert!(write_tags.contains(&Tag::new("filter:public:false")));
        assert!(write_tags.contains(&Tag::filter_field(FilterField::Id, &doc.id.to_string())));

        for value in ["image/png", "IMAGE/PNG"] {
            let filter = DocumentFilter::default().with_field(FilterField::Mime, value);
            let matches = filter.matches(&doc);
            assert_eq!(write_tags.contains(&Tag::filter(&filter)), matches);
        }
    }

    #[test]
    fn canonical_query_values_share_the_write_tag() {
        let doc = document("cat.png", "image/png", &[]);
        let filter = DocumentFilter::parse(None, Some("file"), Some("1"), None).expect("valid");

        assert!(document_write_tags(&doc).contains(&Tag::filter(&filter)));
    }

    #[test]
    fn unfiltered_list_uses_empty_filter_tag() {
        assert_eq!(
            Tag::filter(&DocumentFilter::default()),
            Tag::new("filter::")
        );
    }

    #[test]
    fn list_key_renders_all_dimensions() {
        let filter = DocumentFilter::default()
            .with_login("alice")
            .with_field(FilterField::Name, "a.png")
            .with_limit(25);
        let key = CacheKey::DocumentList(filter);
        assert_eq!(key.to_string(), "docs:alice:name:a.png:25");

        let empty = CacheKey::DocumentList(DocumentFilter::default());
        assert_eq!(empty.to_string(), "docs::::10");
    }

    #[test]
    fn list_keys_differ_on_any_dimension() {
        let base = DocumentFilter::default().with_login("alice");
        let other_limit = base.clone().with_limit(11);
        let other_login = DocumentFilter::default().with_login("bob");

        assert_ne!(
            CacheKey::DocumentList(base.clone()),
            CacheKey::DocumentList(other_limit)
        );
        assert_ne!(
            CacheKey::DocumentList(base),
            CacheKey::DocumentList(other_login)
        );
    }
}
