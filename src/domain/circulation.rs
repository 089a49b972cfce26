use super::{
    Book, CreateBookError, IssueBookError, IssueRequest, Library, RemoveBookError,
    RequestIssueError, ReturnBookError, UserId, WithdrawRequestError, can_edit_library,
};

/// 書籍に対してユーザーに提示できる操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookAction {
    /// 貸出リクエストを作成する（一般ユーザー）
    RequestIssue,
    /// 自分の貸出リクエストを取り下げる（一般ユーザー）
    WithdrawRequest,
    /// 書籍を返却する（借り手本人またはスタッフ）
    ReturnBook,
    /// 書籍を貸し出す（スタッフ）
    IssueBook,
    /// 書籍を削除する（スタッフ）
    RemoveBook,
}

/// 純粋関数：貸出リクエスト作成のバリデーション
///
/// ビジネスルール：
/// - スタッフはリクエストを作成しない（直接貸出するため）
/// - 貸出可能な書籍のみリクエストできる
/// - 同一ユーザーの未処理リクエストは1件まで
pub fn validate_request_issue(
    book: &Book,
    requester: UserId,
    library: &Library,
    existing: Option<&IssueRequest>,
) -> Result<(), RequestIssueError> {
    if can_edit_library(requester, library) {
        return Err(RequestIssueError::StaffCannotRequest);
    }
    if book.is_issued() {
        return Err(RequestIssueError::BookNotAvailable);
    }
    if existing.is_some() {
        return Err(RequestIssueError::DuplicateRequest);
    }
    Ok(())
}

/// 純粋関数：リクエスト取り下げのバリデーション
///
/// 取り下げはリクエスト作成者本人のみ。スタッフであっても他人のリクエストは
/// 取り下げない（承認時の刈り取りは別経路）。
pub fn validate_withdraw(
    request: &IssueRequest,
    actor: UserId,
) -> Result<(), WithdrawRequestError> {
    if request.requesting_user_id != actor {
        return Err(WithdrawRequestError::NotRequester);
    }
    Ok(())
}

/// 純粋関数：貸出のバリデーション
///
/// ビジネスルール：
/// - スタッフのみが貸出できる
/// - 貸出可能な書籍のみ貸出できる
pub fn validate_issue(book: &Book, staff: UserId, library: &Library) -> Result<(), IssueBookError> {
    if !can_edit_library(staff, library) {
        return Err(IssueBookError::NotStaff);
    }
    if book.is_issued() {
        return Err(IssueBookError::AlreadyIssued);
    }
    Ok(())
}

/// 純粋関数：返却のバリデーション
///
/// ビジネスルール：
/// - 貸出中の書籍のみ返却できる
/// - 借り手本人、またはスタッフによる代理返却のみ許可
pub fn validate_return(book: &Book, actor: UserId, library: &Library) -> Result<(), ReturnBookError> {
    match book.issued_to {
        None => Err(ReturnBookError::NotIssued),
        Some(holder) if holder == actor => Ok(()),
        Some(_) if can_edit_library(actor, library) => Ok(()),
        Some(_) => Err(ReturnBookError::NotHolder),
    }
}

/// 純粋関数：書籍削除のバリデーション
///
/// 削除は貸出状態に関わらずスタッフのみ実行できる。
pub fn validate_remove(actor: UserId, library: &Library) -> Result<(), RemoveBookError> {
    if !can_edit_library(actor, library) {
        return Err(RemoveBookError::NotStaff);
    }
    Ok(())
}

/// 純粋関数：書籍作成・追加のバリデーション
///
/// 蔵書への追加は貸出状態に依存せず、スタッフであることのみを要求する。
pub fn validate_create(actor: UserId, library: &Library) -> Result<(), CreateBookError> {
    if !can_edit_library(actor, library) {
        return Err(CreateBookError::NotStaff);
    }
    Ok(())
}

/// 純粋関数：閲覧ユーザーに提示すべき操作の集合を計算する
///
/// ビジネスルール：
/// - 借り手本人には役割に関わらず常に返却操作を提示する
/// - 一般ユーザーには、自分が借りていない書籍に対して
///   RequestIssueとWithdrawRequestのどちらか一方のみを提示する（両方は決して提示しない）
/// - 一般ユーザーに貸出・削除操作は提示しない
/// - スタッフにリクエスト系操作は提示しない（リクエストキューを経由せず直接貸出する）
pub fn available_actions(
    book: &Book,
    viewer: UserId,
    library: &Library,
    own_request: Option<&IssueRequest>,
) -> Vec<BookAction> {
    let mut actions = Vec::new();

    if book.issued_to == Some(viewer) {
        actions.push(BookAction::ReturnBook);
    }

    if can_edit_library(viewer, library) {
        if !book.is_issued() {
            actions.push(BookAction::IssueBook);
        }
        actions.push(BookAction::RemoveBook);
    } else if !book.is_issued() {
        match own_request {
            None => actions.push(BookAction::RequestIssue),
            Some(_) => actions.push(BookAction::WithdrawRequest),
        }
    }

    actions
}
