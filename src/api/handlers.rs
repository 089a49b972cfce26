use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{BookId, LibraryId, RequestId, UserId};
use crate::ports::LibraryGateway;

use super::{
    error::ApiError,
    types::{
        AddExistingBooksRequest, BookResponse, CreateBookRequest, CreateIssueRequest,
        IssueBookRequest, IssueRequestResponse, RemovedResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn LibraryGateway>,
}

// ============================================================================
// Command handlers (POST/DELETE)
// ============================================================================

/// POST /libraries/:library_id/books - 書籍を作成
///
/// IDと登録日時はサーバーが採番して完全なレコードを返す。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let book = state
        .gateway
        .create_book(
            LibraryId::from_uuid(library_id),
            UserId::from_uuid(req.user_id),
            &req.title,
            &req.description,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// DELETE /libraries/:library_id/books/:book_id - 書籍を削除
pub async fn remove_book(
    State(state): State<Arc<AppState>>,
    Path((library_id, book_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state
        .gateway
        .remove_book(LibraryId::from_uuid(library_id), BookId::from_uuid(book_id))
        .await?;

    Ok(Json(RemovedResponse { removed }))
}

/// POST /libraries/:library_id/books/existing - 既存書籍をライブラリに追加
pub async fn add_existing_books(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
    Json(req): Json<AddExistingBooksRequest>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let book_ids = req.book_ids.into_iter().map(BookId::from_uuid).collect();
    let added = state
        .gateway
        .add_existing_books(
            book_ids,
            LibraryId::from_uuid(library_id),
            UserId::from_uuid(req.user_id),
        )
        .await?;

    Ok(Json(added.into_iter().map(BookResponse::from).collect()))
}

/// POST /books/:book_id/issue - 書籍を貸し出す
///
/// 返却期限を含む権威あるレコードを返す。
/// 既に貸出中の場合は失敗する（書籍状態のcompare-and-set）。
pub async fn issue_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<IssueBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state
        .gateway
        .issue_book(
            BookId::from_uuid(book_id),
            UserId::from_uuid(req.to_user_id),
            UserId::from_uuid(req.staff_id),
        )
        .await?;

    Ok(Json(BookResponse::from(book)))
}

/// POST /books/:book_id/return - 書籍を返却
///
/// 貸出フィールドがクリアされた完全なレコードを返す。
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state.gateway.return_book(BookId::from_uuid(book_id)).await?;

    Ok(Json(BookResponse::from(book)))
}

/// POST /libraries/:library_id/issue-requests - 貸出リクエストを作成
pub async fn create_issue_request(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
    Json(req): Json<CreateIssueRequest>,
) -> Result<(StatusCode, Json<IssueRequestResponse>), ApiError> {
    let request = state
        .gateway
        .create_issue_request(
            LibraryId::from_uuid(library_id),
            UserId::from_uuid(req.user_id),
            BookId::from_uuid(req.book_id),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueRequestResponse::from(request)),
    ))
}

/// DELETE /issue-requests/:request_id - 貸出リクエストを取り下げる
pub async fn withdraw_issue_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state
        .gateway
        .withdraw_issue_request(RequestId::from_uuid(request_id))
        .await?;

    Ok(Json(RemovedResponse { removed }))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /libraries/:library_id/books - ライブラリの書籍一覧
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = state
        .gateway
        .get_books(LibraryId::from_uuid(library_id))
        .await?;

    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /libraries/:library_id/issue-requests - ライブラリの貸出リクエスト一覧
pub async fn list_issue_requests(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
) -> Result<Json<Vec<IssueRequestResponse>>, ApiError> {
    let requests = state
        .gateway
        .get_issue_requests(LibraryId::from_uuid(library_id))
        .await?;

    Ok(Json(
        requests
            .into_iter()
            .map(IssueRequestResponse::from)
            .collect(),
    ))
}
