use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// A document the pipeline has seen, in any stage of processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i64,
    /// Display name, derived from the file stem.
    pub name: String,
    /// Path of the source PDF at ingestion time.
    pub path: String,
    /// Vector collection generation serving this document, set once
    /// indexing finishes.
    pub collection: Option<String>,
    pub status: DocumentStatus,
    pub chunk_count: i64,
    /// Cached outline, generated once per ingestion.
    pub outline: Option<String>,
    pub error_message: Option<String>,
    pub created_date: NaiveDateTime,
    pub completed_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Extracting,
    Indexing,
    Outlining,
    Completed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DocumentStatus::Pending => write!(f, "Pending"),
            DocumentStatus::Extracting => write!(f, "Extracting"),
            DocumentStatus::Indexing => write!(f, "Indexing"),
            DocumentStatus::Outlining => write!(f, "Outlining"),
            DocumentStatus::Completed => write!(f, "Completed"),
            DocumentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl DocumentStatus {
    pub(crate) fn as_db_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Extracting => "extracting",
            DocumentStatus::Indexing => "indexing",
            DocumentStatus::Outlining => "outlining",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentUpdate {
    pub status: Option<DocumentStatus>,
    pub collection: Option<String>,
    pub chunk_count: Option<i64>,
    pub outline: Option<String>,
    pub error_message: Option<String>,
    pub completed_date: Option<NaiveDateTime>,
}

impl Document {
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == DocumentStatus::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.status == DocumentStatus::Failed
    }
}
