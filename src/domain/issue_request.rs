use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, LibraryId, RequestId, UserId};

/// 貸出リクエスト - 一般ユーザーによる貸出可能書籍への申請
///
/// 不変条件：(book_id, requesting_user_id) の組に対して未処理リクエストは最大1件。
/// 貸出済み書籍を参照するリクエストはstale（取り下げ・無視のみ可、承認不可）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub id: RequestId,
    pub library_id: LibraryId,
    pub book_id: BookId,
    pub requesting_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl IssueRequest {
    /// 楽観的レコードを作成する
    ///
    /// IDはクライアント側の仮のもので、サーバー確認後に権威あるレコードで置き換えられる。
    pub fn pending(
        library_id: LibraryId,
        book_id: BookId,
        requesting_user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            library_id,
            book_id,
            requesting_user_id,
            created_at,
        }
    }

    /// リクエストがstaleか判定する
    ///
    /// 参照先の書籍が存在しない、または貸出可能でない場合はstale。
    pub fn is_stale(&self, book: Option<&Book>) -> bool {
        match book {
            Some(book) => book.is_issued(),
            None => true,
        }
    }
}
