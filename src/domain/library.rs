use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{BookId, LibraryId, UserId};

/// ライブラリエンティティ（読み取り専用の外部入力）
///
/// 貸出管理コンテキストは管理者・司書・蔵書のID集合のみを参照する。
/// メンバー招待やライブラリ作成は別コンテキストの責務。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub admins: HashSet<UserId>,
    pub librarians: HashSet<UserId>,
    pub books: HashSet<BookId>,
}

impl Library {
    /// ユーザーがスタッフ（管理者または司書）か
    pub fn is_staff(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id) || self.librarians.contains(&user_id)
    }
}

/// 純粋関数：ユーザーがライブラリを管理できるか
///
/// 管理者集合と司書集合の和集合への所属で判定する。
/// 副作用なし、キャッシュなし。
pub fn can_edit_library(user_id: UserId, library: &Library) -> bool {
    library.is_staff(user_id)
}
