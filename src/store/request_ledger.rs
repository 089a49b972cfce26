use std::collections::HashMap;

use super::BookStore;
use crate::domain::{BookId, IssueRequest, LibraryId, RequestId, UserId};

/// 貸出リクエスト台帳
///
/// 選択中ライブラリの未処理リクエストをリクエストIDで保持する純粋なインメモリマップ。
/// 遷移ロジックは持たず、State MachineとCoordinatorの検証済みストレージとしてのみ使われる。
///
/// staleリクエストの不変条件：貸出可能でなくなった書籍を参照するリクエストは
/// 読み取りのたびにlist()で除外される（結果整合性に頼らない）。
#[derive(Debug, Clone)]
pub struct RequestLedger {
    library_id: LibraryId,
    requests: HashMap<RequestId, IssueRequest>,
}

impl RequestLedger {
    pub fn new(library_id: LibraryId) -> Self {
        Self {
            library_id,
            requests: HashMap::new(),
        }
    }

    /// サーバーから取得したリクエスト一覧で台帳を構築する
    pub fn from_requests(library_id: LibraryId, requests: Vec<IssueRequest>) -> Self {
        let mut ledger = Self::new(library_id);
        for request in requests {
            ledger.add(request);
        }
        ledger
    }

    pub fn library_id(&self) -> LibraryId {
        self.library_id
    }

    pub fn add(&mut self, request: IssueRequest) {
        self.requests.insert(request.id, request);
    }

    /// リクエストを削除する
    ///
    /// 既に削除済みのIDに対しては何もしない（冪等）。
    pub fn remove(&mut self, request_id: RequestId) -> Option<IssueRequest> {
        self.requests.remove(&request_id)
    }

    /// 指定書籍の全リクエストを削除する
    ///
    /// 貸出承認時に使用される：1件の承認で兄弟リクエストはすべてstaleになり、
    /// 暗黙に取り下げられたものとして刈り取る。
    pub fn remove_for_book(&mut self, book_id: BookId) -> usize {
        let before = self.requests.len();
        self.requests.retain(|_, r| r.book_id != book_id);
        before - self.requests.len()
    }

    pub fn get(&self, request_id: RequestId) -> Option<&IssueRequest> {
        self.requests.get(&request_id)
    }

    /// 指定の(書籍, ユーザー)組の未処理リクエストを検索する
    pub fn find_by_book_and_user(&self, book_id: BookId, user_id: UserId) -> Option<&IssueRequest> {
        self.requests
            .values()
            .find(|r| r.book_id == book_id && r.requesting_user_id == user_id)
    }

    /// 指定書籍に未処理リクエストがあるか
    pub fn has_request_for_book(&self, book_id: BookId) -> bool {
        self.requests.values().any(|r| r.book_id == book_id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// 有効なリクエストの一覧
    ///
    /// staleなリクエスト（参照先の書籍が存在しない、または貸出中）は
    /// ここで除外される。作成日時順に返す。
    pub fn list(&self, books: &BookStore) -> Vec<IssueRequest> {
        let mut requests: Vec<IssueRequest> = self
            .requests
            .values()
            .filter(|r| !r.is_stale(books.get(r.book_id)))
            .cloned()
            .collect();
        requests.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.value().cmp(&b.id.value()))
        });
        requests
    }
}
