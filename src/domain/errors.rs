/// 貸出リクエスト作成のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIssueError {
    /// スタッフはリクエストを経由せず直接貸出する
    StaffCannotRequest,
    /// 書籍が貸出可能状態ではない
    BookNotAvailable,
    /// 同一ユーザーの未処理リクエストが既に存在する
    DuplicateRequest,
}

/// 貸出（issue）のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueBookError {
    /// スタッフのみが貸出できる
    NotStaff,
    /// 既に貸出中
    AlreadyIssued,
}

/// 返却のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnBookError {
    /// 貸出中ではない
    NotIssued,
    /// 借り手本人でもスタッフでもない
    NotHolder,
}

/// リクエスト取り下げのエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawRequestError {
    /// リクエスト作成者本人のみが取り下げできる
    NotRequester,
}

/// 書籍削除のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveBookError {
    /// スタッフのみが削除できる
    NotStaff,
}

/// 書籍作成・追加のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateBookError {
    /// スタッフのみが蔵書に追加できる
    NotStaff,
}

/// 状態遷移バリデーションの統合エラー型
///
/// リモート呼び出し前に拒否されるバリデーション失敗。
/// この時点ではローカル状態は一切変更されていない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Request(RequestIssueError),
    Withdraw(WithdrawRequestError),
    Issue(IssueBookError),
    Return(ReturnBookError),
    Remove(RemoveBookError),
    Create(CreateBookError),
}

impl From<RequestIssueError> for TransitionError {
    fn from(err: RequestIssueError) -> Self {
        TransitionError::Request(err)
    }
}

impl From<WithdrawRequestError> for TransitionError {
    fn from(err: WithdrawRequestError) -> Self {
        TransitionError::Withdraw(err)
    }
}

impl From<IssueBookError> for TransitionError {
    fn from(err: IssueBookError) -> Self {
        TransitionError::Issue(err)
    }
}

impl From<ReturnBookError> for TransitionError {
    fn from(err: ReturnBookError) -> Self {
        TransitionError::Return(err)
    }
}

impl From<RemoveBookError> for TransitionError {
    fn from(err: RemoveBookError) -> Self {
        TransitionError::Remove(err)
    }
}

impl From<CreateBookError> for TransitionError {
    fn from(err: CreateBookError) -> Self {
        TransitionError::Create(err)
    }
}
