use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::notifier::{Notice, NoticeSeverity, Notifier as NotifierTrait, Result};

/// Notifierの記録実装
///
/// 配信された通知を保持し、テストからの検証をサポートする。
/// 併せてtracing経由でログにも出す。
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
        }
    }

    /// これまでに配信された通知
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    /// 指定の通知が配信されたか
    pub fn contains(&self, notice: &Notice) -> bool {
        self.notices.lock().unwrap().contains(notice)
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifierTrait for RecordingNotifier {
    async fn notify(&self, notice: Notice) -> Result<()> {
        match notice.severity() {
            NoticeSeverity::Success => tracing::info!(message = %notice.message(), "notice"),
            NoticeSeverity::Error => tracing::warn!(message = %notice.message(), "notice"),
        }
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}
