//! Document list filtering rules.

use std::fmt;
use std::str::FromStr;

use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::domain::entities::{DocumentRecord, NewDocument};
use crate::domain::error::DomainError;

/// Number of documents returned by a list query that does not name a limit.
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Document fields a list query may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Name,
    Id,
    Mime,
    File,
    Public,
    CreatedAt,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::Name,
        FilterField::Id,
        FilterField::Mime,
        FilterField::File,
        FilterField::Public,
        FilterField::CreatedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::Name => "name",
            FilterField::Id => "id",
            FilterField::Mime => "mime",
            FilterField::File => "file",
            FilterField::Public => "public",
            FilterField::CreatedAt => "created_at",
        }
    }
}

impl FilterField {
    /// This field of `document`, rendered the way filter values are compared.
    pub fn value_of(self, document: &DocumentRecord) -> Option<String> {
        match self {
            FilterField::Name => Some(document.name.clone()),
            FilterField::Id => Some(document.id.to_string()),
            FilterField::Mime => Some(document.mime.clone()),
            FilterField::File => Some(document.file.to_string()),
            FilterField::Public => Some(document.public.to_string()),
            FilterField::CreatedAt => format_timestamp(document.created_at),
        }
    }

    /// Rewrite a query value into the rendering used by [`value_of`].
    ///
    /// Values that don't parse for this field are kept as given; they match
    /// no document.
    ///
    /// [`value_of`]: FilterField::value_of
    pub fn canonical_value(self, raw: &str) -> String {
        let canonical = match self {
            FilterField::Name | FilterField::Mime => None,
            FilterField::Id => Uuid::parse_str(raw).ok().map(|id| id.to_string()),
            FilterField::File | FilterField::Public => parse_flag(raw).map(|flag| flag.to_string()),
            FilterField::CreatedAt => OffsetDateTime::parse(raw, &Rfc3339)
                .ok()
                .and_then(format_timestamp),
        };
        canonical.unwrap_or_else(|| raw.to_string())
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> Option<String> {
    timestamp.to_offset(UtcOffset::UTC).format(&Rfc3339).ok()
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterField {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "name" => Ok(FilterField::Name),
            "id" => Ok(FilterField::Id),
            "mime" => Ok(FilterField::Mime),
            "file" => Ok(FilterField::File),
            "public" => Ok(FilterField::Public),
            "created_at" => Ok(FilterField::CreatedAt),
            other => Err(DomainError::invalid_filter(format!(
                "unknown filter key `{other}`"
            ))),
        }
    }
}

/// A single `field = value` restriction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldFilter {
    pub field: FilterField,
    pub value: String,
}

impl FieldFilter {
    /// Restriction of `field` to `value`, stored in canonical form.
    pub fn new(field: FilterField, value: &str) -> Self {
        Self {
            field,
            value: field.canonical_value(value),
        }
    }

    /// Whether `document` satisfies this restriction.
    pub fn matches(&self, document: &DocumentRecord) -> bool {
        self.field
            .value_of(document)
            .is_some_and(|value| value == self.value)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Parameters of a document list query.
///
/// Two filters are equal exactly when they would be cached under the same
/// key. An empty login is normalized to no login filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentFilter {
    pub login: Option<String>,
    pub field: Option<FieldFilter>,
    pub limit: u32,
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            login: None,
            field: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl DocumentFilter {
    /// Build a filter from raw query parameters.
    pub fn parse(
        login: Option<&str>,
        key: Option<&str>,
        value: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Self, DomainError> {
        let key = key.filter(|key| !key.is_empty());
        let value = value.filter(|value| !value.is_empty());

        let field = match (key, value) {
            (Some(key), Some(value)) => Some(FieldFilter::new(key.parse()?, value)),
            (Some(_), None) => {
                return Err(DomainError::invalid_filter("filter value can't be empty"));
            }
            (None, Some(_)) => return Err(DomainError::invalid_filter("missing filter key")),
            (None, None) => None,
        };

        let limit = match limit.filter(|limit| !limit.is_empty()) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| DomainError::invalid_limit(raw))?,
            None => DEFAULT_LIST_LIMIT,
        };

        Ok(Self {
            login: normalize_login(login),
            field,
            limit,
        })
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = normalize_login(Some(&login.into()));
        self
    }

    pub fn with_field(mut self, field: FilterField, value: &str) -> Self {
        self.field = Some(FieldFilter::new(field, value));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `document` belongs in the result set, ignoring the limit.
    pub fn matches(&self, document: &DocumentRecord) -> bool {
        let login_ok = self
            .login
            .as_ref()
            .is_none_or(|login| document.is_granted_to(login));
        let field_ok = self
            .field
            .as_ref()
            .is_none_or(|field| field.matches(document));
        login_ok && field_ok
    }
}

fn normalize_login(login: Option<&str>) -> Option<String> {
    login
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .map(str::to_string)
}

/// Check the caller-supplied fields of a new document.
pub fn validate_new_document(document: &NewDocument) -> Result<(), DomainError> {
    if document.name.trim().is_empty() {
        return Err(DomainError::invalid_document("name can't be empty"));
    }
    if document.mime.trim().is_empty() {
        return Err(DomainError::invalid_document("mime can't be empty"));
    }
    if document.grants.iter().any(|login| login.trim().is_empty()) {
        return Err(DomainError::invalid_document("grant login can't be empty"));
    }
    if document.file && document.content.as_ref().is_none_or(|bytes| bytes.is_empty()) {
        return Err(DomainError::invalid_document("file content can't be empty"));
    }
    Ok(())
}
