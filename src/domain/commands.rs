use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, RequestId, UserId};

/// コマンド：貸出リクエストを作成する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIssue {
    pub book_id: BookId,
    pub requester_id: UserId,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：貸出リクエストを取り下げる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub request_id: RequestId,
    pub user_id: UserId,
}

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBook {
    pub book_id: BookId,
    pub to_user_id: UserId,
    pub staff_id: UserId,
    pub issued_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
///
/// 返却日時はサーバー側が権威を持つため含まない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub book_id: BookId,
    pub actor_id: UserId,
}

/// コマンド：書籍を削除する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBook {
    pub book_id: BookId,
    pub actor_id: UserId,
}

/// コマンド：新しい書籍を作成する
///
/// IDと登録日時はサーバー側が権威を持つため含まない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub description: String,
    pub created_by: UserId,
}

/// コマンド：既存の書籍をライブラリに追加する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddExistingBooks {
    pub book_ids: Vec<BookId>,
    pub added_by: UserId,
}
