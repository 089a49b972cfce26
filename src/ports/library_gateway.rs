use crate::domain::{Book, BookId, IssueRequest, LibraryId, RequestId, UserId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// リモートミューテーションゲートウェイポート
///
/// クライアントコアとサーバーの境界を抽象化する。実装はGraphQL/HTTPなどの
/// トランスポートを担い、コアは型付きリクエスト/レスポンスのみを知る。
///
/// 読み取り系（get_books, get_issue_requests）以外は冪等ではない。
/// 失敗したミューテーションを自動リトライしてはならない：失敗はその試行で
/// 終端であり、ユーザーへ通知して手動リトライに委ねる。
#[async_trait]
pub trait LibraryGateway: Send + Sync {
    /// 新しい書籍を作成する
    ///
    /// IDと登録日時はサーバーが権威を持つ。
    async fn create_book(
        &self,
        library_id: LibraryId,
        user_id: UserId,
        title: &str,
        description: &str,
    ) -> Result<Book>;

    /// 書籍を削除する
    async fn remove_book(&self, library_id: LibraryId, book_id: BookId) -> Result<bool>;

    /// 既存の書籍をライブラリに追加する
    ///
    /// 追加された各書籍の権威あるレコードを返す。
    async fn add_existing_books(
        &self,
        book_ids: Vec<BookId>,
        library_id: LibraryId,
        user_id: UserId,
    ) -> Result<Vec<Book>>;

    /// 書籍をユーザーに貸し出す
    ///
    /// 返却期限を含む権威あるレコードを返す。
    async fn issue_book(
        &self,
        book_id: BookId,
        to_user_id: UserId,
        staff_id: UserId,
    ) -> Result<Book>;

    /// 書籍を返却する
    ///
    /// 貸出フィールドがクリアされた完全なレコードを返す。
    async fn return_book(&self, book_id: BookId) -> Result<Book>;

    /// 貸出リクエストを作成する
    ///
    /// サーバー採番のIDを持つレコードを返す。
    async fn create_issue_request(
        &self,
        library_id: LibraryId,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<IssueRequest>;

    /// 貸出リクエストを取り下げる
    async fn withdraw_issue_request(&self, request_id: RequestId) -> Result<bool>;

    /// ライブラリの貸出リクエスト一覧を取得する（純粋な読み取り）
    async fn get_issue_requests(&self, library_id: LibraryId) -> Result<Vec<IssueRequest>>;

    /// ライブラリの書籍一覧を取得する（純粋な読み取り）
    ///
    /// ライブラリ選択時のBook Entity Storeの初期化に使用される。
    async fn get_books(&self, library_id: LibraryId) -> Result<Vec<Book>>;
}
