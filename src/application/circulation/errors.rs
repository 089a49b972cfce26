use thiserror::Error;

use crate::domain::TransitionError;

/// リモートミューテーションの操作クラス
///
/// 実行中ガードのキー（書籍ID × 操作クラス）と失敗分類の両方に使われる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    CreateBook,
    AddExistingBooks,
    RemoveBook,
    IssueBook,
    ReturnBook,
    RequestIssue,
    Refresh,
}

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CirculationError {
    /// ライブラリが選択されていない
    #[error("No library selected")]
    NoLibrarySelected,

    /// 同一書籍への同種ミューテーションが既に実行中
    ///
    /// クライアントが強制する唯一の並行性制御。トリガーした操作が
    /// 完了するまで同じ(書籍, 操作クラス)の再送信は拒否される。
    #[error("{0:?} mutation already in flight for this target")]
    MutationInFlight(OperationClass),

    /// 状態遷移バリデーション失敗
    ///
    /// リモート呼び出しの前に拒否され、ローカル状態は一切変更されていない。
    #[error("Validation failed: {0:?}")]
    Validation(TransitionError),

    /// リモートミューテーション失敗
    ///
    /// 楽観的変更はロールバック済みで、ユーザー通知も送出済み。
    /// 自動リトライはしない：失敗はこの試行で終端。
    #[error("Remote {operation:?} mutation failed")]
    Remote {
        operation: OperationClass,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<TransitionError> for CirculationError {
    fn from(err: TransitionError) -> Self {
        CirculationError::Validation(err)
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationError>;
