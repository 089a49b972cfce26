use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LibraryId, UserId};

/// イベント：書籍が貸出された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookIssued {
    pub book_id: BookId,
    pub library_id: LibraryId,
    pub issued_to: UserId,
    pub issued_by: UserId,
    pub issued_at: DateTime<Utc>,
}

/// イベント：書籍が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReturned {
    pub book_id: BookId,
    pub library_id: LibraryId,
    pub previous_holder: UserId,
    pub returned_at: DateTime<Utc>,
}
