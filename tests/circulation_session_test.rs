use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rusty_circulation::adapters::memory::{
    GatewayOp, LibraryGateway as MemoryLibraryGateway, RecordingNotifier,
};
use rusty_circulation::application::circulation::{
    CirculationError, CirculationSession, SessionDependencies, add_existing_books, create_book,
    issue_book, remove_book, request_issue, return_book, select_library, withdraw_request,
};
use rusty_circulation::domain::commands::*;
use rusty_circulation::domain::value_objects::*;
use rusty_circulation::domain::{Book, BookAction, CirculationStatus, Library, TransitionError};
use rusty_circulation::ports::Notice;

// ============================================================================
// テスト用セットアップ
// ============================================================================

struct Fixture {
    gateway: Arc<MemoryLibraryGateway>,
    notifier: Arc<RecordingNotifier>,
    session: CirculationSession,
    library: Library,
    staff: UserId,
    member: UserId,
}

/// ゲートウェイ・通知・セッションを組み立てる
///
/// スタッフ1名を管理者に持つライブラリを用意する。
fn fixture() -> Fixture {
    let staff = UserId::new();
    let member = UserId::new();
    let library = Library {
        id: LibraryId::new(),
        name: "City Library".to_string(),
        admins: [staff].into_iter().collect(),
        librarians: HashSet::new(),
        books: HashSet::new(),
    };

    let gateway = Arc::new(MemoryLibraryGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let session = CirculationSession::new(SessionDependencies {
        gateway: gateway.clone(),
        notifier: notifier.clone(),
    });

    Fixture {
        gateway,
        notifier,
        session,
        library,
        staff,
        member,
    }
}

/// サーバー側に貸出可能な書籍を登録する
fn seed_book(f: &Fixture, title: &str) -> Book {
    let book = Book::create(f.library.id, f.staff, title, "", Utc::now());
    f.gateway.seed_book(book.clone());
    book
}

// ============================================================================
// ライブラリ選択
// ============================================================================

#[tokio::test]
async fn test_select_library_populates_stores() {
    let f = fixture();
    let book = seed_book(&f, "The Rust Programming Language");

    select_library(&f.session, f.library.clone()).await.unwrap();

    let books = f.session.books().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, book.id);
    assert!(f.session.issue_requests().unwrap().is_empty());
}

#[tokio::test]
async fn test_select_library_failure_installs_no_context() {
    let f = fixture();
    f.gateway.fail_next(GatewayOp::GetBooks);

    let result = select_library(&f.session, f.library.clone()).await;

    assert!(matches!(result, Err(CirculationError::Remote { .. })));
    assert!(matches!(
        f.session.books(),
        Err(CirculationError::NoLibrarySelected)
    ));
    assert!(f.notifier.contains(&Notice::RefreshFailed));
}

#[tokio::test]
async fn test_deselect_library_discards_state() {
    let f = fixture();
    seed_book(&f, "SICP");
    select_library(&f.session, f.library.clone()).await.unwrap();

    f.session.deselect_library();

    assert!(matches!(
        f.session.books(),
        Err(CirculationError::NoLibrarySelected)
    ));
}

// ============================================================================
// シナリオ：リクエスト作成 → スタッフが承認
// ============================================================================

#[tokio::test]
async fn test_request_then_approve() {
    let f = fixture();
    let book = seed_book(&f, "Designing Data-Intensive Applications");
    select_library(&f.session, f.library.clone()).await.unwrap();

    // 一般ユーザーがリクエスト作成 → 台帳に1件
    let request = request_issue(
        &f.session,
        RequestIssue {
            book_id: book.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap()
    .expect("request should be applied");

    assert_eq!(request.book_id, book.id);
    assert_eq!(request.requesting_user_id, f.member);
    assert_eq!(f.session.issue_requests().unwrap().len(), 1);
    assert_eq!(
        f.session.status_of(book.id).unwrap(),
        Some(CirculationStatus::Requested)
    );

    // スタッフが承認（貸出） → 書籍は貸出中、台帳は空
    let issued = issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap()
    .expect("issue should be applied");

    assert_eq!(issued.issued_to, Some(f.member));
    assert!(issued.issue_due_date.is_some());
    assert_eq!(
        f.session.status_of(book.id).unwrap(),
        Some(CirculationStatus::Issued)
    );
    assert!(f.session.issue_requests().unwrap().is_empty());
    assert!(
        f.session
            .find_request(book.id, f.member)
            .unwrap()
            .is_none()
    );
    assert!(f.notifier.contains(&Notice::BookIssued));
}

#[tokio::test]
async fn test_issue_prunes_all_sibling_requests() {
    let f = fixture();
    let book = seed_book(&f, "TAPL");
    let other_member = UserId::new();
    select_library(&f.session, f.library.clone()).await.unwrap();

    for member in [f.member, other_member] {
        request_issue(
            &f.session,
            RequestIssue {
                book_id: book.id,
                requester_id: member,
                requested_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }
    assert_eq!(f.session.issue_requests().unwrap().len(), 2);

    // どちらか一方を承認すると兄弟リクエストもすべて消える
    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    assert!(f.session.issue_requests().unwrap().is_empty());
    assert!(
        f.session
            .find_request(book.id, other_member)
            .unwrap()
            .is_none()
    );
}

// ============================================================================
// シナリオ：重複リクエストの拒否
// ============================================================================

#[tokio::test]
async fn test_duplicate_request_rejected_without_remote_call() {
    let f = fixture();
    let book = seed_book(&f, "Clean Architecture");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let cmd = RequestIssue {
        book_id: book.id,
        requester_id: f.member,
        requested_at: Utc::now(),
    };
    request_issue(&f.session, cmd.clone()).await.unwrap();
    assert_eq!(f.gateway.server_request_count(f.library.id), 1);

    // 2件目はバリデーションで拒否され、リモート呼び出しも台帳変更も起きない
    let result = request_issue(&f.session, cmd).await;

    assert!(matches!(
        result,
        Err(CirculationError::Validation(TransitionError::Request(_)))
    ));
    assert_eq!(f.session.issue_requests().unwrap().len(), 1);
    assert_eq!(f.gateway.server_request_count(f.library.id), 1);
}

#[tokio::test]
async fn test_staff_cannot_request_issue() {
    let f = fixture();
    let book = seed_book(&f, "Refactoring");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let result = request_issue(
        &f.session,
        RequestIssue {
            book_id: book.id,
            requester_id: f.staff,
            requested_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::Validation(_))));
    assert_eq!(f.gateway.server_request_count(f.library.id), 0);
}

// ============================================================================
// シナリオ：楽観的リクエストのロールバック
// ============================================================================

#[tokio::test]
async fn test_request_failure_restores_exact_ledger() {
    let f = fixture();
    let book1 = seed_book(&f, "Book One");
    let book2 = seed_book(&f, "Book Two");
    select_library(&f.session, f.library.clone()).await.unwrap();

    // 既存のリクエストを1件作っておく
    request_issue(
        &f.session,
        RequestIssue {
            book_id: book1.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let ids_before: Vec<RequestId> = f
        .session
        .issue_requests()
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();

    // リモート失敗 → 仮レコードは破棄され、台帳は呼び出し前と完全に同じ
    f.gateway.fail_next(GatewayOp::CreateIssueRequest);
    let result = request_issue(
        &f.session,
        RequestIssue {
            book_id: book2.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::Remote { .. })));

    let ids_after: Vec<RequestId> = f
        .session
        .issue_requests()
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids_before, ids_after);
    assert!(f.notifier.contains(&Notice::RequestFailed));
}

// ============================================================================
// シナリオ：リクエスト取り下げ（冪等）
// ============================================================================

#[tokio::test]
async fn test_withdraw_request_is_idempotent() {
    let f = fixture();
    let book = seed_book(&f, "The Pragmatic Programmer");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let request = request_issue(
        &f.session,
        RequestIssue {
            book_id: book.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap()
    .unwrap();

    let cmd = WithdrawRequest {
        request_id: request.id,
        user_id: f.member,
    };
    withdraw_request(&f.session, cmd.clone()).await.unwrap();
    assert!(f.session.issue_requests().unwrap().is_empty());

    // 2回目は何も起きない
    withdraw_request(&f.session, cmd).await.unwrap();
    assert!(f.session.issue_requests().unwrap().is_empty());
}

#[tokio::test]
async fn test_withdraw_by_other_user_rejected() {
    let f = fixture();
    let book = seed_book(&f, "Working Effectively with Legacy Code");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let request = request_issue(
        &f.session,
        RequestIssue {
            book_id: book.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap()
    .unwrap();

    let result = withdraw_request(
        &f.session,
        WithdrawRequest {
            request_id: request.id,
            user_id: UserId::new(),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(CirculationError::Validation(TransitionError::Withdraw(_)))
    ));
    assert_eq!(f.session.issue_requests().unwrap().len(), 1);
}

#[tokio::test]
async fn test_withdraw_remote_failure_is_fire_and_forget() {
    let f = fixture();
    let book = seed_book(&f, "Domain-Driven Design");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let request = request_issue(
        &f.session,
        RequestIssue {
            book_id: book.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap()
    .unwrap();

    // リモート取り下げが失敗してもローカル削除は維持され、エラーにならない
    f.gateway.fail_next(GatewayOp::WithdrawIssueRequest);
    withdraw_request(
        &f.session,
        WithdrawRequest {
            request_id: request.id,
            user_id: f.member,
        },
    )
    .await
    .unwrap();

    assert!(f.session.issue_requests().unwrap().is_empty());
}

// ============================================================================
// シナリオ：借り手による返却
// ============================================================================

#[tokio::test]
async fn test_return_by_holder() {
    let f = fixture();
    let book = seed_book(&f, "Programming Rust");
    select_library(&f.session, f.library.clone()).await.unwrap();

    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let returned = return_book(
        &f.session,
        ReturnBook {
            book_id: book.id,
            actor_id: f.member,
        },
    )
    .await
    .unwrap()
    .expect("return should be applied");

    assert_eq!(returned.issued_to, None);
    assert!(returned.returned_at.is_some());
    assert_eq!(
        f.session.status_of(book.id).unwrap(),
        Some(CirculationStatus::Available)
    );
    assert!(f.notifier.contains(&Notice::BookReturned));
}

#[tokio::test]
async fn test_return_by_non_holder_rejected() {
    let f = fixture();
    let book = seed_book(&f, "Effective Java");
    select_library(&f.session, f.library.clone()).await.unwrap();

    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let result = return_book(
        &f.session,
        ReturnBook {
            book_id: book.id,
            actor_id: UserId::new(),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(CirculationError::Validation(TransitionError::Return(_)))
    ));
}

#[tokio::test]
async fn test_return_failure_keeps_book_issued_locally() {
    let f = fixture();
    let book = seed_book(&f, "The Mythical Man-Month");
    select_library(&f.session, f.library.clone()).await.unwrap();

    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    // 返却は楽観的更新をしないため、失敗してもローカルは貸出中のまま
    f.gateway.fail_next(GatewayOp::ReturnBook);
    let result = return_book(
        &f.session,
        ReturnBook {
            book_id: book.id,
            actor_id: f.member,
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::Remote { .. })));
    let local = f.session.book(book.id).unwrap().unwrap();
    assert_eq!(local.issued_to, Some(f.member));
    assert!(f.notifier.contains(&Notice::ReturnFailed));
}

// ============================================================================
// シナリオ：削除失敗時のロールバック
// ============================================================================

#[tokio::test]
async fn test_remove_with_rollback() {
    let f = fixture();
    let book = seed_book(&f, "Code Complete");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let original = f.session.book(book.id).unwrap().unwrap();

    f.gateway.fail_next(GatewayOp::RemoveBook);
    let result = remove_book(
        &f.session,
        RemoveBook {
            book_id: book.id,
            actor_id: f.staff,
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::Remote { .. })));

    // 元のフィールドのまま再挿入されている
    let restored = f.session.book(book.id).unwrap().unwrap();
    assert_eq!(restored, original);
    assert!(f.notifier.contains(&Notice::RemoveFailed));
}

#[tokio::test]
async fn test_remove_book_success() {
    let f = fixture();
    let book = seed_book(&f, "Gödel, Escher, Bach");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let removed = remove_book(
        &f.session,
        RemoveBook {
            book_id: book.id,
            actor_id: f.staff,
        },
    )
    .await
    .unwrap();

    assert!(removed);
    assert!(f.session.book(book.id).unwrap().is_none());
    assert!(f.gateway.server_book(book.id).is_none());
    assert!(f.notifier.contains(&Notice::BookRemoved));
}

#[tokio::test]
async fn test_remove_by_non_staff_rejected() {
    let f = fixture();
    let book = seed_book(&f, "Structure and Interpretation");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let result = remove_book(
        &f.session,
        RemoveBook {
            book_id: book.id,
            actor_id: f.member,
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(CirculationError::Validation(TransitionError::Remove(_)))
    ));
    assert!(f.session.book(book.id).unwrap().is_some());
}

// ============================================================================
// シナリオ：書籍作成（楽観的挿入なし）
// ============================================================================

#[tokio::test]
async fn test_create_book_populates_store_after_success() {
    let f = fixture();
    select_library(&f.session, f.library.clone()).await.unwrap();

    let created = create_book(
        &f.session,
        CreateBook {
            title: "Rust for Rustaceans".to_string(),
            description: "Intermediate Rust".to_string(),
            created_by: f.staff,
        },
    )
    .await
    .unwrap()
    .expect("create should be applied");

    // サーバー採番のIDでストアに反映される
    let local = f.session.book(created.id).unwrap().unwrap();
    assert_eq!(local.title, "Rust for Rustaceans");
    assert_eq!(local.added_by, f.staff);
    assert!(f.notifier.contains(&Notice::BookCreated {
        title: "Rust for Rustaceans".to_string()
    }));
}

#[tokio::test]
async fn test_create_book_failure_leaves_store_unchanged() {
    let f = fixture();
    select_library(&f.session, f.library.clone()).await.unwrap();

    f.gateway.fail_next(GatewayOp::CreateBook);
    let result = create_book(
        &f.session,
        CreateBook {
            title: "Never Created".to_string(),
            description: String::new(),
            created_by: f.staff,
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::Remote { .. })));
    assert!(f.session.books().unwrap().is_empty());
    assert!(f.notifier.contains(&Notice::CreateFailed));
}

#[tokio::test]
async fn test_add_existing_books_populates_store() {
    let f = fixture();
    select_library(&f.session, f.library.clone()).await.unwrap();

    // どのライブラリにも属していない既存書籍
    let orphan = Book::create(LibraryId::new(), UserId::new(), "Orphan Book", "", Utc::now());
    f.gateway.seed_catalog_book(orphan.clone());

    let added = add_existing_books(
        &f.session,
        AddExistingBooks {
            book_ids: vec![orphan.id],
            added_by: f.staff,
        },
    )
    .await
    .unwrap()
    .expect("add should be applied");

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].library_id, f.library.id);
    assert_eq!(added[0].added_by, f.staff);
    let local = f.session.book(orphan.id).unwrap().unwrap();
    assert_eq!(local.library_id, f.library.id);
    assert!(f.notifier.contains(&Notice::BooksAdded { count: 1 }));
}

// ============================================================================
// 不変条件と並行編集
// ============================================================================

#[tokio::test]
async fn test_issued_to_invariant_after_every_transition() {
    let f = fixture();
    let book = seed_book(&f, "Invariant Book");
    select_library(&f.session, f.library.clone()).await.unwrap();

    let check = |b: &Book| assert_eq!(b.is_issued(), b.issued_to.is_some());

    check(&f.session.book(book.id).unwrap().unwrap());

    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    let issued = f.session.book(book.id).unwrap().unwrap();
    check(&issued);
    assert!(issued.is_issued());

    return_book(
        &f.session,
        ReturnBook {
            book_id: book.id,
            actor_id: f.member,
        },
    )
    .await
    .unwrap();
    let returned = f.session.book(book.id).unwrap().unwrap();
    check(&returned);
    assert!(!returned.is_issued());
}

#[tokio::test]
async fn test_concurrent_issue_loses_to_server_state() {
    // 2つのクライアントが同じ書籍を同時に貸し出そうとするケース。
    // サーバーのcompare-and-setにより後者は失敗し、楽観的遷移は巻き戻される。
    let f = fixture();
    let book = seed_book(&f, "Contended Book");

    let other_session = CirculationSession::new(SessionDependencies {
        gateway: f.gateway.clone(),
        notifier: Arc::new(RecordingNotifier::new()),
    });

    select_library(&f.session, f.library.clone()).await.unwrap();
    select_library(&other_session, f.library.clone())
        .await
        .unwrap();

    // 先行クライアントが貸出に成功
    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    // 後発クライアントはローカルでは貸出可能に見えるが、サーバーが拒否する
    let loser = UserId::new();
    let result = issue_book(
        &other_session,
        IssueBook {
            book_id: book.id,
            to_user_id: loser,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::Remote { .. })));
    // 楽観的遷移は巻き戻され、サーバー側の権威ある状態は先行クライアントの結果のまま
    let local = other_session.book(book.id).unwrap().unwrap();
    assert_eq!(local.issued_to, None);
    let server = f.gateway.server_book(book.id).unwrap();
    assert_eq!(server.issued_to, Some(f.member));
}

#[tokio::test]
async fn test_actions_follow_circulation_state() {
    let f = fixture();
    let book = seed_book(&f, "Actions Book");
    select_library(&f.session, f.library.clone()).await.unwrap();
    assert_eq!(f.session.selected_library().map(|l| l.id), Some(f.library.id));

    // 貸出可能：一般ユーザーにはリクエスト作成のみ
    let actions = f.session.actions_for(book.id, f.member).unwrap();
    assert_eq!(actions, vec![BookAction::RequestIssue]);

    // リクエスト作成後：取り下げのみ
    request_issue(
        &f.session,
        RequestIssue {
            book_id: book.id,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    let actions = f.session.actions_for(book.id, f.member).unwrap();
    assert_eq!(actions, vec![BookAction::WithdrawRequest]);

    // 貸出後：借り手には返却のみ、スタッフには削除のみ
    issue_book(
        &f.session,
        IssueBook {
            book_id: book.id,
            to_user_id: f.member,
            staff_id: f.staff,
            issued_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    let actions = f.session.actions_for(book.id, f.member).unwrap();
    assert_eq!(actions, vec![BookAction::ReturnBook]);
    let actions = f.session.actions_for(book.id, f.staff).unwrap();
    assert_eq!(actions, vec![BookAction::RemoveBook]);
}

// ============================================================================
// staleリファレンスは静かに無視される
// ============================================================================

#[tokio::test]
async fn test_stale_book_reference_is_silent_noop() {
    let f = fixture();
    select_library(&f.session, f.library.clone()).await.unwrap();

    let ghost = BookId::new();

    let requested = request_issue(
        &f.session,
        RequestIssue {
            book_id: ghost,
            requester_id: f.member,
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    assert!(requested.is_none());

    let returned = return_book(
        &f.session,
        ReturnBook {
            book_id: ghost,
            actor_id: f.member,
        },
    )
    .await
    .unwrap();
    assert!(returned.is_none());

    let removed = remove_book(
        &f.session,
        RemoveBook {
            book_id: ghost,
            actor_id: f.staff,
        },
    )
    .await
    .unwrap();
    assert!(!removed);
}
