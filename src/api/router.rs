use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, add_existing_books, create_book, create_issue_request, issue_book,
    list_books, list_issue_requests, remove_book, return_book, withdraw_issue_request,
};

/// Creates the API router with all circulation endpoints
///
/// Command endpoints (Write operations):
/// - POST /libraries/:library_id/books - Create a new book
/// - POST /libraries/:library_id/books/existing - Add existing books
/// - DELETE /libraries/:library_id/books/:book_id - Remove a book
/// - POST /books/:book_id/issue - Issue a book to a user
/// - POST /books/:book_id/return - Return a book
/// - POST /libraries/:library_id/issue-requests - Create an issue request
/// - DELETE /issue-requests/:request_id - Withdraw an issue request
///
/// Query endpoints (Read operations):
/// - GET /libraries/:library_id/books - List library books
/// - GET /libraries/:library_id/issue-requests - List library issue requests
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Book catalog endpoints
        .route(
            "/libraries/:library_id/books",
            get(list_books).post(create_book),
        )
        .route(
            "/libraries/:library_id/books/existing",
            post(add_existing_books),
        )
        .route(
            "/libraries/:library_id/books/:book_id",
            delete(remove_book),
        )
        // Circulation endpoints
        .route("/books/:book_id/issue", post(issue_book))
        .route("/books/:book_id/return", post(return_book))
        .route(
            "/libraries/:library_id/issue-requests",
            get(list_issue_requests).post(create_issue_request),
        )
        .route(
            "/issue-requests/:request_id",
            delete(withdraw_issue_request),
        )
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
