use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::{self, Book, BookId, IssueRequest, LibraryId, RequestId, UserId};
use crate::ports::library_gateway::{LibraryGateway as LibraryGatewayTrait, Result};

/// 貸出期間（日数）- サーバー側ポリシー
pub const ISSUE_PERIOD_DAYS: i64 = 14;

/// 失敗注入の対象操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    CreateBook,
    RemoveBook,
    AddExistingBooks,
    IssueBook,
    ReturnBook,
    CreateIssueRequest,
    WithdrawIssueRequest,
    GetIssueRequests,
    GetBooks,
}

struct State {
    /// ライブラリ所属の書籍（サーバー側の権威あるレコード）
    books: HashMap<BookId, Book>,
    /// どのライブラリにも属さない既存書籍（add_existing_booksの取り込み元）
    catalog: HashMap<BookId, Book>,
    requests: HashMap<RequestId, IssueRequest>,
    /// 次の1回だけ失敗させる操作の集合
    fail_next: HashSet<GatewayOp>,
}

/// LibraryGatewayのインメモリ実装
///
/// ドキュメントストアを伴うサーバーの権威ある振る舞いを再現する：
/// IDと日時はサーバー採番、返却期限はサーバーが計算する。
/// 貸出には書籍状態をキーとしたcompare-and-setガードがあり、
/// 同じ書籍への2件目の貸出は失敗する（last-write-winsにしない）。
///
/// 観測された設計と同じく、貸出済み書籍のstaleリクエストは
/// サーバー側では刈り取らない。
///
/// fail_nextで次の1回の操作を失敗させられるため、
/// ロールバック経路の状態を持ったテストをサポートする。
pub struct LibraryGateway {
    state: Mutex<State>,
}

impl LibraryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                books: HashMap::new(),
                catalog: HashMap::new(),
                requests: HashMap::new(),
                fail_next: HashSet::new(),
            }),
        }
    }

    /// テスト用に書籍をライブラリへ登録
    pub fn seed_book(&self, book: Book) {
        self.state.lock().unwrap().books.insert(book.id, book);
    }

    /// テスト用に未所属の既存書籍を登録
    pub fn seed_catalog_book(&self, book: Book) {
        self.state.lock().unwrap().catalog.insert(book.id, book);
    }

    /// テスト用に貸出リクエストを登録
    pub fn seed_request(&self, request: IssueRequest) {
        self.state
            .lock()
            .unwrap()
            .requests
            .insert(request.id, request);
    }

    /// 次の1回の指定操作を失敗させる
    pub fn fail_next(&self, op: GatewayOp) {
        self.state.lock().unwrap().fail_next.insert(op);
    }

    /// サーバー側の書籍レコードを取得（テスト検証用）
    pub fn server_book(&self, book_id: BookId) -> Option<Book> {
        self.state.lock().unwrap().books.get(&book_id).cloned()
    }

    /// サーバー側のリクエスト件数（テスト検証用）
    pub fn server_request_count(&self, library_id: LibraryId) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .values()
            .filter(|r| r.library_id == library_id)
            .count()
    }

    fn take_failure(state: &mut State, op: GatewayOp) -> Result<()> {
        if state.fail_next.remove(&op) {
            return Err(format!("injected failure for {:?}", op).into());
        }
        Ok(())
    }
}

impl Default for LibraryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LibraryGatewayTrait for LibraryGateway {
    /// サーバー採番のIDと登録日時で書籍を作成する
    async fn create_book(
        &self,
        library_id: LibraryId,
        user_id: UserId,
        title: &str,
        description: &str,
    ) -> Result<Book> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::CreateBook)?;

        let book = Book::create(library_id, user_id, title, description, Utc::now());
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn remove_book(&self, library_id: LibraryId, book_id: BookId) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::RemoveBook)?;

        match state.books.get(&book_id) {
            Some(book) if book.library_id == library_id => {
                state.books.remove(&book_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_existing_books(
        &self,
        book_ids: Vec<BookId>,
        library_id: LibraryId,
        user_id: UserId,
    ) -> Result<Vec<Book>> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::AddExistingBooks)?;

        let added_at = Utc::now();
        let mut added = Vec::new();
        for book_id in book_ids {
            let Some(existing) = state.catalog.remove(&book_id) else {
                continue;
            };
            let book = Book {
                library_id,
                added_by: user_id,
                added_at,
                ..existing
            };
            state.books.insert(book.id, book.clone());
            added.push(book);
        }
        Ok(added)
    }

    /// 書籍状態をキーとしたcompare-and-setガード付きの貸出
    async fn issue_book(
        &self,
        book_id: BookId,
        to_user_id: UserId,
        staff_id: UserId,
    ) -> Result<Book> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::IssueBook)?;

        let book = state
            .books
            .get(&book_id)
            .ok_or_else(|| format!("book {} not found", book_id.value()))?;

        let issued_at = Utc::now();
        let (mut issued, _event) =
            domain::book::issue_book(book, to_user_id, staff_id, issued_at)
                .map_err(|e| format!("issue rejected: {:?}", e))?;
        issued.issue_due_date = Some(issued_at + Duration::days(ISSUE_PERIOD_DAYS));

        state.books.insert(book_id, issued.clone());
        Ok(issued)
    }

    async fn return_book(&self, book_id: BookId) -> Result<Book> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::ReturnBook)?;

        let book = state
            .books
            .get(&book_id)
            .ok_or_else(|| format!("book {} not found", book_id.value()))?;

        let (returned, _event) = domain::book::mark_returned(book, Utc::now())
            .map_err(|e| format!("return rejected: {:?}", e))?;

        state.books.insert(book_id, returned.clone());
        Ok(returned)
    }

    /// サーバー採番のIDでリクエストを保存する
    ///
    /// 重複チェックはクライアント側の責務（観測された設計のまま）。
    async fn create_issue_request(
        &self,
        library_id: LibraryId,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<IssueRequest> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::CreateIssueRequest)?;

        let request = IssueRequest::pending(library_id, book_id, user_id, Utc::now());
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn withdraw_issue_request(&self, request_id: RequestId) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::WithdrawIssueRequest)?;

        Ok(state.requests.remove(&request_id).is_some())
    }

    async fn get_issue_requests(&self, library_id: LibraryId) -> Result<Vec<IssueRequest>> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::GetIssueRequests)?;

        Ok(state
            .requests
            .values()
            .filter(|r| r.library_id == library_id)
            .cloned()
            .collect())
    }

    async fn get_books(&self, library_id: LibraryId) -> Result<Vec<Book>> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, GatewayOp::GetBooks)?;

        Ok(state
            .books
            .values()
            .filter(|b| b.library_id == library_id)
            .cloned()
            .collect())
    }
}
