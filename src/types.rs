use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

/// Kind of content a suggestion asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Movies,
    #[serde(rename = "TV Shows")]
    TvShows,
    Audiobooks,
    Music,
    Other,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Movies,
        ContentType::TvShows,
        ContentType::Audiobooks,
        ContentType::Music,
        ContentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movies => "Movies",
            ContentType::TvShows => "TV Shows",
            ContentType::Audiobooks => "Audiobooks",
            ContentType::Music => "Music",
            ContentType::Other => "Other",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match norm.as_str() {
            "movies" | "movie" => Ok(ContentType::Movies),
            "tv shows" | "tv show" | "tv" => Ok(ContentType::TvShows),
            "audiobooks" | "audiobook" => Ok(ContentType::Audiobooks),
            "music" => Ok(ContentType::Music),
            "other" => Ok(ContentType::Other),
            _ => Err(StoreError::Validation(format!("unknown content type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Added,
}

impl Status {
    pub fn toggled(self) -> Self {
        match self {
            Status::Pending => Status::Added,
            Status::Added => Status::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Added => "added",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "added" => Ok(Status::Added),
            other => Err(StoreError::Validation(format!("unknown status: {other}"))),
        }
    }
}

/// A persisted suggestion. `id` and `created_at` are assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub status: Status,
    // Older local slots stored the timestamp as `date`.
    #[serde(alias = "date", deserialize_with = "timestamp_assume_utc")]
    pub created_at: DateTime<Utc>,
}

/// User input from the submission form, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionDraft {
    pub kind: Option<ContentType>,
    pub title: String,
    pub details: Option<String>,
}

/// A draft that passed validation; the only thing backends accept for inserts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub details: Option<String>,
    pub status: Status,
}

impl SuggestionDraft {
    pub fn new(kind: Option<ContentType>, title: impl Into<String>, details: Option<String>) -> Self {
        Self { kind, title: title.into(), details }
    }

    /// Parse the loosely typed form fields. An empty type string means "unset".
    pub fn from_form(kind: &str, title: &str, details: &str) -> Result<Self, StoreError> {
        let kind = if kind.trim().is_empty() { None } else { Some(kind.parse()?) };
        Ok(Self::new(kind, title, Some(details.to_string())))
    }

    pub fn validate(&self) -> Result<ValidDraft, StoreError> {
        let title = self.title.trim();
        let kind = match self.kind {
            Some(k) if !title.is_empty() => k,
            _ => {
                return Err(StoreError::Validation(
                    "Please fill in all required fields".to_string(),
                ))
            }
        };
        let details = self
            .details
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        Ok(ValidDraft { title: title.to_string(), kind, details, status: Status::Pending })
    }
}

/// Newest first. Stable, so equal timestamps keep their relative order.
pub fn sort_newest_first(list: &mut [Suggestion]) {
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn id_from_string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(de)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(f) => format!("{f}"),
    })
}

fn blank_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.filter(|d| !d.trim().is_empty()))
}

// `timestamp` columns come back without an offset; those are taken as UTC.
fn timestamp_assume_utc<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| de::Error::custom(format!("invalid created_at timestamp: {raw}")))
}
