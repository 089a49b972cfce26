use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BookIssued, BookReturned, IssueBookError, LibraryId, ReturnBookError, UserId};

/// 書籍エンティティ - 貸出ライフサイクルの対象
///
/// 貸出状態はissued_toの有無で表現される：
/// - `issued_to.is_some()` ⟺ 貸出中（Issued）
/// - `returned_at` は返却遷移でのみ設定され、その際にissued_to系フィールドはクリアされる
///
/// 書籍は所属ライブラリ間を移動しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub library_id: LibraryId,

    pub title: String,
    pub description: String,

    // 登録情報
    pub added_by: UserId,
    pub added_at: DateTime<Utc>,

    // 貸出情報（貸出中のみ設定される）
    pub issued_to: Option<UserId>,
    pub issued_by: Option<UserId>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issue_due_date: Option<DateTime<Utc>>,

    // 直近の返却日時
    pub returned_at: Option<DateTime<Utc>>,
}

/// 書籍の貸出ステータス
///
/// Requestedは派生状態：貸出可能かつ未処理リクエストが1件以上ある場合。
/// 書籍単体からはAvailable/Issuedのみ決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CirculationStatus {
    /// 貸出可能
    Available,
    /// 貸出可能だが未処理リクエストあり
    Requested,
    /// 貸出中
    Issued,
}

impl Book {
    /// 新しい書籍を作成する
    ///
    /// IDと登録日時は呼び出し側（サーバー側）が権威を持つ。
    pub fn create(
        library_id: LibraryId,
        added_by: UserId,
        title: impl Into<String>,
        description: impl Into<String>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookId::new(),
            library_id,
            title: title.into(),
            description: description.into(),
            added_by,
            added_at,
            issued_to: None,
            issued_by: None,
            issued_at: None,
            issue_due_date: None,
            returned_at: None,
        }
    }

    /// 貸出中か
    pub fn is_issued(&self) -> bool {
        self.issued_to.is_some()
    }

    /// 貸出ステータスを導出する
    ///
    /// `has_pending_requests` は未処理リクエストの有無（台帳から判定）。
    pub fn circulation_status(&self, has_pending_requests: bool) -> CirculationStatus {
        if self.is_issued() {
            CirculationStatus::Issued
        } else if has_pending_requests {
            CirculationStatus::Requested
        } else {
            CirculationStatus::Available
        }
    }
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 貸出可能な書籍のみ貸出できる（issued_toが未設定）
/// - 貸出時にissued_to / issued_by / issued_atを設定する
/// - 返却期限はサーバー側が権威を持つため、ここでは設定しない
///
/// 副作用なし。新しいBookとイベントを返す。
pub fn issue_book(
    book: &Book,
    to: UserId,
    by: UserId,
    issued_at: DateTime<Utc>,
) -> Result<(Book, BookIssued), IssueBookError> {
    if book.is_issued() {
        return Err(IssueBookError::AlreadyIssued);
    }

    let new_book = Book {
        issued_to: Some(to),
        issued_by: Some(by),
        issued_at: Some(issued_at),
        issue_due_date: None,
        returned_at: None,
        ..book.clone()
    };

    let event = BookIssued {
        book_id: book.id,
        library_id: book.library_id,
        issued_to: to,
        issued_by: by,
        issued_at,
    };

    Ok((new_book, event))
}

/// 純粋関数：書籍を返却済みにする
///
/// ビジネスルール：
/// - 貸出中の書籍のみ返却できる
/// - 返却時にreturned_atを設定し、issued_to系フィールドをすべてクリアする
///
/// 副作用なし。新しいBookとイベントを返す。
pub fn mark_returned(
    book: &Book,
    returned_at: DateTime<Utc>,
) -> Result<(Book, BookReturned), ReturnBookError> {
    let holder = book.issued_to.ok_or(ReturnBookError::NotIssued)?;

    let new_book = Book {
        issued_to: None,
        issued_by: None,
        issued_at: None,
        issue_due_date: None,
        returned_at: Some(returned_at),
        ..book.clone()
    };

    let event = BookReturned {
        book_id: book.id,
        library_id: book.library_id,
        previous_holder: holder,
        returned_at,
    };

    Ok((new_book, event))
}
