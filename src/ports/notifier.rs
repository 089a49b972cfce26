use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 通知の重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Success,
    Error,
}

/// ユーザーへの一時的な通知
///
/// 成功確認と分類済み失敗の両方を運ぶ。表示方法（トースト等）は
/// プレゼンテーション層の責務であり、コアは種別のみを決める。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    BookCreated { title: String },
    BooksAdded { count: usize },
    BookRemoved,
    BookIssued,
    BookReturned,
    RequestCreated,
    RequestWithdrawn,

    CreateFailed,
    AddBooksFailed,
    RemoveFailed,
    IssueFailed,
    ReturnFailed,
    RequestFailed,
    RefreshFailed,
}

impl Notice {
    pub fn severity(&self) -> NoticeSeverity {
        match self {
            Notice::BookCreated { .. }
            | Notice::BooksAdded { .. }
            | Notice::BookRemoved
            | Notice::BookIssued
            | Notice::BookReturned
            | Notice::RequestCreated
            | Notice::RequestWithdrawn => NoticeSeverity::Success,

            Notice::CreateFailed
            | Notice::AddBooksFailed
            | Notice::RemoveFailed
            | Notice::IssueFailed
            | Notice::ReturnFailed
            | Notice::RequestFailed
            | Notice::RefreshFailed => NoticeSeverity::Error,
        }
    }

    /// 表示用メッセージ
    pub fn message(&self) -> String {
        match self {
            Notice::BookCreated { title } => format!("Book \"{}\" created!", title),
            Notice::BooksAdded { count } => format!("{} book(s) added!", count),
            Notice::BookRemoved => "Book removed!".to_string(),
            Notice::BookIssued => "Book issued!".to_string(),
            Notice::BookReturned => "Book returned successfully!".to_string(),
            Notice::RequestCreated => "Issue request created!".to_string(),
            Notice::RequestWithdrawn => "Issue request removed!".to_string(),
            Notice::CreateFailed => "Error creating book...".to_string(),
            Notice::AddBooksFailed => "Error adding books...".to_string(),
            Notice::RemoveFailed => "Error removing book...".to_string(),
            Notice::IssueFailed => "Error issuing book...".to_string(),
            Notice::ReturnFailed => "Error returning book...".to_string(),
            Notice::RequestFailed => "Error creating issue request...".to_string(),
            Notice::RefreshFailed => "Error loading library...".to_string(),
        }
    }
}

/// 通知サービスポート
///
/// ユーザーへの通知配信メカニズムを抽象化する。
/// リモートミューテーションの各失敗経路には補償処理とともに必ず通知が伴う。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 通知を配信する
    async fn notify(&self, notice: Notice) -> Result<()>;
}
