use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::domain::{
    self, Book, BookAction, BookId, CirculationStatus, IssueRequest, Library, TransitionError,
    UserId, commands::*,
};
use crate::ports::{LibraryGateway, Notice, Notifier};
use crate::store::{BookStore, RequestLedger};

use super::errors::{CirculationError, OperationClass, Result};

/// セッションの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct SessionDependencies {
    pub gateway: Arc<dyn LibraryGateway>,
    pub notifier: Arc<dyn Notifier>,
}

/// 選択中ライブラリのコンテキスト
///
/// 書籍ストアとリクエスト台帳を排他的に所有する。ライフサイクルは
/// 「ライブラリ選択〜選択解除」に一致し、切り替え時は破棄して再取得する。
/// プロセス全体のグローバル可変状態は持たない。
struct LibraryContext {
    library: Library,
    books: BookStore,
    ledger: RequestLedger,
    /// 実行中のリモートミューテーション（書籍ID × 操作クラス）
    in_flight: HashSet<(Option<BookId>, OperationClass)>,
}

impl LibraryContext {
    /// 実行中ガードを取得する
    ///
    /// 同じ(書籍, 操作クラス)の二重送信を拒否する。
    fn begin(&mut self, book_id: Option<BookId>, op: OperationClass) -> Result<()> {
        if !self.in_flight.insert((book_id, op)) {
            return Err(CirculationError::MutationInFlight(op));
        }
        Ok(())
    }

    fn finish(&mut self, book_id: Option<BookId>, op: OperationClass) {
        self.in_flight.remove(&(book_id, op));
    }
}

/// 貸出セッション - Mutation Coordinatorの実体
///
/// ユーザーの意図を受け取り、State Machineで検証し、ゲートウェイ経由で
/// リモートミューテーションを送信し、権威あるレスポンスでローカルストアを
/// 整合させる（失敗時はロールバック）。
///
/// 単一書き込み者の規律：ストアを変更するのはこのモジュールの操作関数のみ。
/// UI層はスナップショットを読むだけで直接書き込まない。
///
/// ロックは`.await`をまたいで保持しない：検証と楽観的更新をロック内で行い、
/// ロックを手放してからリモート呼び出しを待ち、再ロックして整合させる。
/// ミューテーション中にライブラリが切り替わった場合、遅延して到着した
/// レスポンスはライブラリIDの比較で無視される（キャンセルではなくフェイルセーフ）。
pub struct CirculationSession {
    deps: SessionDependencies,
    context: Mutex<Option<LibraryContext>>,
}

impl CirculationSession {
    pub fn new(deps: SessionDependencies) -> Self {
        Self {
            deps,
            context: Mutex::new(None),
        }
    }

    /// ライブラリの選択を解除し、ローカル状態を破棄する
    pub fn deselect_library(&self) {
        let mut guard = self.context.lock().unwrap();
        if let Some(ctx) = guard.take() {
            tracing::debug!(library_id = %ctx.library.id.value(), "library deselected, local state discarded");
        }
    }

    /// 選択中のライブラリ
    pub fn selected_library(&self) -> Option<Library> {
        self.context
            .lock()
            .unwrap()
            .as_ref()
            .map(|ctx| ctx.library.clone())
    }

    /// 書籍一覧のスナップショット（登録日時順）
    pub fn books(&self) -> Result<Vec<Book>> {
        let guard = self.context.lock().unwrap();
        let ctx = guard.as_ref().ok_or(CirculationError::NoLibrarySelected)?;
        Ok(ctx.books.list())
    }

    /// 書籍のスナップショット
    pub fn book(&self, book_id: BookId) -> Result<Option<Book>> {
        let guard = self.context.lock().unwrap();
        let ctx = guard.as_ref().ok_or(CirculationError::NoLibrarySelected)?;
        Ok(ctx.books.get(book_id).cloned())
    }

    /// 有効な貸出リクエスト一覧のスナップショット
    ///
    /// staleなリクエストは台帳の読み取り時フィルタで除外される。
    pub fn issue_requests(&self) -> Result<Vec<IssueRequest>> {
        let guard = self.context.lock().unwrap();
        let ctx = guard.as_ref().ok_or(CirculationError::NoLibrarySelected)?;
        Ok(ctx.ledger.list(&ctx.books))
    }

    /// 指定ユーザーの指定書籍への未処理リクエスト
    pub fn find_request(&self, book_id: BookId, user_id: UserId) -> Result<Option<IssueRequest>> {
        let guard = self.context.lock().unwrap();
        let ctx = guard.as_ref().ok_or(CirculationError::NoLibrarySelected)?;
        Ok(ctx.ledger.find_by_book_and_user(book_id, user_id).cloned())
    }

    /// 書籍の貸出ステータス（リクエスト有無を加味した派生状態）
    pub fn status_of(&self, book_id: BookId) -> Result<Option<CirculationStatus>> {
        let guard = self.context.lock().unwrap();
        let ctx = guard.as_ref().ok_or(CirculationError::NoLibrarySelected)?;
        Ok(ctx
            .books
            .get(book_id)
            .map(|book| book.circulation_status(ctx.ledger.has_request_for_book(book_id))))
    }

    /// 閲覧ユーザーに提示すべき操作の集合
    pub fn actions_for(&self, book_id: BookId, viewer: UserId) -> Result<Vec<BookAction>> {
        let guard = self.context.lock().unwrap();
        let ctx = guard.as_ref().ok_or(CirculationError::NoLibrarySelected)?;
        let Some(book) = ctx.books.get(book_id) else {
            return Ok(Vec::new());
        };
        let own_request = ctx.ledger.find_by_book_and_user(book_id, viewer);
        Ok(domain::circulation::available_actions(
            book,
            viewer,
            &ctx.library,
            own_request,
        ))
    }

    /// 通知を配信する（配信失敗は操作の成否に影響させない）
    async fn notify(&self, notice: Notice) {
        if let Err(e) = self.deps.notifier.notify(notice).await {
            tracing::warn!(error = %e, "failed to deliver notice");
        }
    }
}

/// ライブラリを選択し、ローカルストアをサーバーから初期化する
///
/// 書籍一覧とリクエスト一覧を並行に取得する。取得に失敗した場合は
/// コンテキストを設置せず、RefreshFailedを通知する。
/// 既存の選択は成功時に破棄される（遅延レスポンスはID比較で無視される）。
pub async fn select_library(session: &CirculationSession, library: Library) -> Result<()> {
    // 1. サーバーから両ストアの内容を並行取得
    let fetched = futures::try_join!(
        session.deps.gateway.get_books(library.id),
        session.deps.gateway.get_issue_requests(library.id),
    );

    let (books, requests) = match fetched {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(library_id = %library.id.value(), error = %e, "failed to load library");
            session.notify(Notice::RefreshFailed).await;
            return Err(CirculationError::Remote {
                operation: OperationClass::Refresh,
                source: e,
            });
        }
    };

    tracing::debug!(
        library_id = %library.id.value(),
        books = books.len(),
        requests = requests.len(),
        "library selected"
    );

    // 2. 新しいコンテキストを設置（旧コンテキストは破棄）
    let mut guard = session.context.lock().unwrap();
    let library_id = library.id;
    *guard = Some(LibraryContext {
        books: BookStore::from_books(library_id, books),
        ledger: RequestLedger::from_requests(library_id, requests),
        library,
        in_flight: HashSet::new(),
    });

    Ok(())
}

/// 貸出リクエストを作成する
///
/// ビジネスルール：
/// - スタッフはリクエストを作成できない
/// - 貸出可能な書籍のみ
/// - 同一ユーザーの未処理リクエストは1件まで
///
/// 楽観的に仮レコードを台帳へ入れ、サーバー確認後に権威あるレコードで
/// 置き換える。失敗時は仮レコードを破棄してRequestFailedを通知する。
///
/// 対象書籍がローカルに存在しない場合は並行削除が整合済みとみなし、
/// 何もせずOk(None)を返す。
pub async fn request_issue(
    session: &CirculationSession,
    cmd: RequestIssue,
) -> Result<Option<IssueRequest>> {
    // 1. 検証と楽観的追加（ロック内、リモート呼び出しなし）
    let (library_id, placeholder) = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        let Some(book) = ctx.books.get(cmd.book_id) else {
            tracing::debug!(book_id = %cmd.book_id.value(), "request for unknown book ignored");
            return Ok(None);
        };

        let existing = ctx
            .ledger
            .find_by_book_and_user(cmd.book_id, cmd.requester_id);
        domain::circulation::validate_request_issue(book, cmd.requester_id, &ctx.library, existing)
            .map_err(TransitionError::from)?;

        ctx.begin(Some(cmd.book_id), OperationClass::RequestIssue)?;

        let placeholder = IssueRequest::pending(
            ctx.library.id,
            cmd.book_id,
            cmd.requester_id,
            cmd.requested_at,
        );
        ctx.ledger.add(placeholder.clone());
        (ctx.library.id, placeholder)
    };

    // 2. リモートミューテーション送信
    let result = session
        .deps
        .gateway
        .create_issue_request(library_id, cmd.requester_id, cmd.book_id)
        .await;

    // 3. 整合（成功：権威あるレコードへ置換 / 失敗：仮レコードを破棄）
    match result {
        Ok(confirmed) => {
            let applied = {
                let mut guard = session.context.lock().unwrap();
                match guard.as_mut() {
                    Some(ctx) if ctx.library.id == library_id => {
                        ctx.finish(Some(cmd.book_id), OperationClass::RequestIssue);
                        ctx.ledger.remove(placeholder.id);
                        ctx.ledger.add(confirmed.clone());
                        true
                    }
                    _ => false,
                }
            };

            if applied {
                session.notify(Notice::RequestCreated).await;
                Ok(Some(confirmed))
            } else {
                tracing::debug!("issue request response for stale library context ignored");
                Ok(None)
            }
        }
        Err(e) => {
            {
                let mut guard = session.context.lock().unwrap();
                if let Some(ctx) = guard.as_mut() {
                    if ctx.library.id == library_id {
                        ctx.finish(Some(cmd.book_id), OperationClass::RequestIssue);
                        ctx.ledger.remove(placeholder.id);
                    }
                }
            }
            tracing::warn!(book_id = %cmd.book_id.value(), error = %e, "issue request failed, optimistic record discarded");
            session.notify(Notice::RequestFailed).await;
            Err(CirculationError::Remote {
                operation: OperationClass::RequestIssue,
                source: e,
            })
        }
    }
}

/// 貸出リクエストを取り下げる
///
/// ローカルレコードは即座に削除し、リモート取り下げは投げっぱなし
/// （失敗はログのみ、ユーザーへは通知しない）。
/// 既に削除済みのIDに対しては何もしない（冪等）。
pub async fn withdraw_request(session: &CirculationSession, cmd: WithdrawRequest) -> Result<()> {
    // 1. 検証とローカル削除（冪等）
    let removed = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        match ctx.ledger.get(cmd.request_id) {
            None => None,
            Some(request) => {
                domain::circulation::validate_withdraw(request, cmd.user_id)
                    .map_err(TransitionError::from)?;
                ctx.ledger.remove(cmd.request_id)
            }
        }
    };

    let Some(request) = removed else {
        return Ok(());
    };

    // 2. リモート取り下げ（投げっぱなし）
    if let Err(e) = session
        .deps
        .gateway
        .withdraw_issue_request(request.id)
        .await
    {
        tracing::warn!(request_id = %request.id.value(), error = %e, "remote withdraw not confirmed");
    }

    session.notify(Notice::RequestWithdrawn).await;
    Ok(())
}

/// 書籍をユーザーに貸し出す（スタッフのみ）
///
/// 楽観的に貸出状態へ遷移させ、サーバー確認後に返却期限を含む権威ある
/// レコードで置き換える。承認された時点でこの書籍への全リクエストは
/// staleになるため台帳から刈り取る。失敗時は元の状態へ戻してIssueFailedを通知する。
pub async fn issue_book(session: &CirculationSession, cmd: IssueBook) -> Result<Option<Book>> {
    // 1. 検証と楽観的遷移（ロック内）
    let (library_id, original) = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        let Some(book) = ctx.books.get(cmd.book_id).cloned() else {
            tracing::debug!(book_id = %cmd.book_id.value(), "issue for unknown book ignored");
            return Ok(None);
        };

        domain::circulation::validate_issue(&book, cmd.staff_id, &ctx.library)
            .map_err(TransitionError::from)?;

        let (optimistic, event) =
            domain::book::issue_book(&book, cmd.to_user_id, cmd.staff_id, cmd.issued_at)
                .map_err(TransitionError::from)?;

        ctx.begin(Some(cmd.book_id), OperationClass::IssueBook)?;
        ctx.books.upsert(optimistic);
        tracing::debug!(
            book_id = %event.book_id.value(),
            issued_to = %event.issued_to.value(),
            "optimistic issue applied"
        );
        (ctx.library.id, book)
    };

    // 2. リモートミューテーション送信
    let result = session
        .deps
        .gateway
        .issue_book(cmd.book_id, cmd.to_user_id, cmd.staff_id)
        .await;

    // 3. 整合
    match result {
        Ok(confirmed) => {
            let applied = {
                let mut guard = session.context.lock().unwrap();
                match guard.as_mut() {
                    Some(ctx) if ctx.library.id == library_id => {
                        ctx.finish(Some(cmd.book_id), OperationClass::IssueBook);
                        ctx.books.upsert(confirmed.clone());
                        // 兄弟リクエストは暗黙に取り下げられたものとして刈り取る
                        let pruned = ctx.ledger.remove_for_book(cmd.book_id);
                        if pruned > 0 {
                            tracing::debug!(book_id = %cmd.book_id.value(), pruned, "stale issue requests pruned");
                        }
                        true
                    }
                    _ => false,
                }
            };

            if applied {
                session.notify(Notice::BookIssued).await;
                Ok(Some(confirmed))
            } else {
                tracing::debug!("issue response for stale library context ignored");
                Ok(None)
            }
        }
        Err(e) => {
            {
                let mut guard = session.context.lock().unwrap();
                if let Some(ctx) = guard.as_mut() {
                    if ctx.library.id == library_id {
                        ctx.finish(Some(cmd.book_id), OperationClass::IssueBook);
                        ctx.books.upsert(original);
                    }
                }
            }
            tracing::warn!(book_id = %cmd.book_id.value(), error = %e, "issue failed, optimistic transition reverted");
            session.notify(Notice::IssueFailed).await;
            Err(CirculationError::Remote {
                operation: OperationClass::IssueBook,
                source: e,
            })
        }
    }
}

/// 書籍を返却する（借り手本人またはスタッフ）
///
/// 楽観的更新は行わない：確認前のローカル変更より、誤った返却表示の
/// リスクの方が大きい。成功時のみ権威あるレコードで置き換え、
/// 失敗時はローカル上も貸出中のままReturnFailedを通知する。
pub async fn return_book(session: &CirculationSession, cmd: ReturnBook) -> Result<Option<Book>> {
    // 1. 検証のみ（ローカル状態は変更しない）
    let library_id = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        let Some(book) = ctx.books.get(cmd.book_id) else {
            tracing::debug!(book_id = %cmd.book_id.value(), "return for unknown book ignored");
            return Ok(None);
        };

        domain::circulation::validate_return(book, cmd.actor_id, &ctx.library)
            .map_err(TransitionError::from)?;

        ctx.begin(Some(cmd.book_id), OperationClass::ReturnBook)?;
        ctx.library.id
    };

    // 2. リモートミューテーション送信
    let result = session.deps.gateway.return_book(cmd.book_id).await;

    // 3. 整合
    match result {
        Ok(confirmed) => {
            let applied = {
                let mut guard = session.context.lock().unwrap();
                match guard.as_mut() {
                    Some(ctx) if ctx.library.id == library_id => {
                        ctx.finish(Some(cmd.book_id), OperationClass::ReturnBook);
                        ctx.books.upsert(confirmed.clone());
                        true
                    }
                    _ => false,
                }
            };

            if applied {
                session.notify(Notice::BookReturned).await;
                Ok(Some(confirmed))
            } else {
                tracing::debug!("return response for stale library context ignored");
                Ok(None)
            }
        }
        Err(e) => {
            {
                let mut guard = session.context.lock().unwrap();
                if let Some(ctx) = guard.as_mut() {
                    if ctx.library.id == library_id {
                        ctx.finish(Some(cmd.book_id), OperationClass::ReturnBook);
                    }
                }
            }
            tracing::warn!(book_id = %cmd.book_id.value(), error = %e, "return failed, book remains issued locally");
            session.notify(Notice::ReturnFailed).await;
            Err(CirculationError::Remote {
                operation: OperationClass::ReturnBook,
                source: e,
            })
        }
    }
}

/// 書籍を削除する（スタッフのみ）
///
/// 楽観的にストアから取り除き、リモート削除が失敗した場合は元のフィールドの
/// まま再挿入してRemoveFailedを通知する（一瞬の再出現はUI側で許容される）。
pub async fn remove_book(session: &CirculationSession, cmd: RemoveBook) -> Result<bool> {
    // 1. 検証と楽観的削除（ロック内）
    let (library_id, original) = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        domain::circulation::validate_remove(cmd.actor_id, &ctx.library)
            .map_err(TransitionError::from)?;

        let Some(original) = ctx.books.get(cmd.book_id).cloned() else {
            tracing::debug!(book_id = %cmd.book_id.value(), "remove for unknown book ignored");
            return Ok(false);
        };

        ctx.begin(Some(cmd.book_id), OperationClass::RemoveBook)?;
        ctx.books.remove(cmd.book_id);
        (ctx.library.id, original)
    };

    // 2. リモートミューテーション送信
    let result = session
        .deps
        .gateway
        .remove_book(library_id, cmd.book_id)
        .await;

    // 3. 整合
    match result {
        Ok(_) => {
            // サーバー側でも消えている（既に無かった場合も同じ結末）
            let mut guard = session.context.lock().unwrap();
            if let Some(ctx) = guard.as_mut() {
                if ctx.library.id == library_id {
                    ctx.finish(Some(cmd.book_id), OperationClass::RemoveBook);
                }
            }
            drop(guard);
            session.notify(Notice::BookRemoved).await;
            Ok(true)
        }
        Err(e) => {
            {
                let mut guard = session.context.lock().unwrap();
                if let Some(ctx) = guard.as_mut() {
                    if ctx.library.id == library_id {
                        ctx.finish(Some(cmd.book_id), OperationClass::RemoveBook);
                        ctx.books.upsert(original);
                    }
                }
            }
            tracing::warn!(book_id = %cmd.book_id.value(), error = %e, "remove failed, book restored");
            session.notify(Notice::RemoveFailed).await;
            Err(CirculationError::Remote {
                operation: OperationClass::RemoveBook,
                source: e,
            })
        }
    }
}

/// 新しい書籍を作成する（スタッフのみ）
///
/// IDと登録日時はサーバーが権威を持つため楽観的挿入は行わず、
/// 成功後にのみストアへ反映する（失敗時に巻き戻すものが無い）。
pub async fn create_book(session: &CirculationSession, cmd: CreateBook) -> Result<Option<Book>> {
    // 1. 検証のみ
    let library_id = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        domain::circulation::validate_create(cmd.created_by, &ctx.library)
            .map_err(TransitionError::from)?;

        ctx.begin(None, OperationClass::CreateBook)?;
        ctx.library.id
    };

    // 2. リモートミューテーション送信
    let result = session
        .deps
        .gateway
        .create_book(library_id, cmd.created_by, &cmd.title, &cmd.description)
        .await;

    // 3. 整合
    match result {
        Ok(created) => {
            let applied = {
                let mut guard = session.context.lock().unwrap();
                match guard.as_mut() {
                    Some(ctx) if ctx.library.id == library_id => {
                        ctx.finish(None, OperationClass::CreateBook);
                        ctx.books.upsert(created.clone());
                        true
                    }
                    _ => false,
                }
            };

            if applied {
                session
                    .notify(Notice::BookCreated {
                        title: created.title.clone(),
                    })
                    .await;
                Ok(Some(created))
            } else {
                tracing::debug!("create response for stale library context ignored");
                Ok(None)
            }
        }
        Err(e) => {
            {
                let mut guard = session.context.lock().unwrap();
                if let Some(ctx) = guard.as_mut() {
                    if ctx.library.id == library_id {
                        ctx.finish(None, OperationClass::CreateBook);
                    }
                }
            }
            tracing::warn!(error = %e, "create book failed");
            session.notify(Notice::CreateFailed).await;
            Err(CirculationError::Remote {
                operation: OperationClass::CreateBook,
                source: e,
            })
        }
    }
}

/// 既存の書籍をライブラリに追加する（スタッフのみ）
///
/// サーバーが返す権威あるレコード群を成功後にストアへ反映する。
pub async fn add_existing_books(
    session: &CirculationSession,
    cmd: AddExistingBooks,
) -> Result<Option<Vec<Book>>> {
    // 1. 検証のみ
    let library_id = {
        let mut guard = session.context.lock().unwrap();
        let ctx = guard.as_mut().ok_or(CirculationError::NoLibrarySelected)?;

        domain::circulation::validate_create(cmd.added_by, &ctx.library)
            .map_err(TransitionError::from)?;

        ctx.begin(None, OperationClass::AddExistingBooks)?;
        ctx.library.id
    };

    // 2. リモートミューテーション送信
    let result = session
        .deps
        .gateway
        .add_existing_books(cmd.book_ids.clone(), library_id, cmd.added_by)
        .await;

    // 3. 整合
    match result {
        Ok(added) => {
            let applied = {
                let mut guard = session.context.lock().unwrap();
                match guard.as_mut() {
                    Some(ctx) if ctx.library.id == library_id => {
                        ctx.finish(None, OperationClass::AddExistingBooks);
                        for book in &added {
                            ctx.books.upsert(book.clone());
                        }
                        true
                    }
                    _ => false,
                }
            };

            if applied {
                session
                    .notify(Notice::BooksAdded { count: added.len() })
                    .await;
                Ok(Some(added))
            } else {
                tracing::debug!("add books response for stale library context ignored");
                Ok(None)
            }
        }
        Err(e) => {
            {
                let mut guard = session.context.lock().unwrap();
                if let Some(ctx) = guard.as_mut() {
                    if ctx.library.id == library_id {
                        ctx.finish(None, OperationClass::AddExistingBooks);
                    }
                }
            }
            tracing::warn!(error = %e, "add existing books failed");
            session.notify(Notice::AddBooksFailed).await;
            Err(CirculationError::Remote {
                operation: OperationClass::AddExistingBooks,
                source: e,
            })
        }
    }
}
