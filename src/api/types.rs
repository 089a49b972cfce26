use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Book, IssueRequest};

/// 書籍作成リクエスト（POST /libraries/:id/books）
#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
}

/// 既存書籍追加リクエスト（POST /libraries/:id/books/existing）
#[derive(Debug, Deserialize)]
pub struct AddExistingBooksRequest {
    pub user_id: Uuid,
    pub book_ids: Vec<Uuid>,
}

/// 貸出リクエスト（POST /books/:id/issue）
#[derive(Debug, Deserialize)]
pub struct IssueBookRequest {
    pub to_user_id: Uuid,
    pub staff_id: Uuid,
}

/// 貸出リクエスト作成リクエスト（POST /libraries/:id/issue-requests）
#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    pub user_id: Uuid,
    pub book_id: Uuid,
}

/// 書籍レスポンス
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub library_id: Uuid,
    pub title: String,
    pub description: String,
    pub added_by: Uuid,
    pub added_at: DateTime<Utc>,
    pub issued_to: Option<Uuid>,
    pub issued_by: Option<Uuid>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issue_due_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.value(),
            library_id: book.library_id.value(),
            title: book.title,
            description: book.description,
            added_by: book.added_by.value(),
            added_at: book.added_at,
            issued_to: book.issued_to.map(|u| u.value()),
            issued_by: book.issued_by.map(|u| u.value()),
            issued_at: book.issued_at,
            issue_due_date: book.issue_due_date,
            returned_at: book.returned_at,
        }
    }
}

/// 貸出リクエストレスポンス
#[derive(Debug, Serialize)]
pub struct IssueRequestResponse {
    pub id: Uuid,
    pub library_id: Uuid,
    pub book_id: Uuid,
    pub requesting_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<IssueRequest> for IssueRequestResponse {
    fn from(request: IssueRequest) -> Self {
        Self {
            id: request.id.value(),
            library_id: request.library_id.value(),
            book_id: request.book_id.value(),
            requesting_user_id: request.requesting_user_id.value(),
            created_at: request.created_at,
        }
    }
}

/// 削除系レスポンス
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
