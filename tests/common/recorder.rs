//! Reply channel that records calls instead of talking to Telegram

#![allow(dead_code)]

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;
use vidrelay::telegram::{ReplyChannel, StatusMessage};
use vidrelay::{AppError, AppResult};

/// One call made on the reply channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyCall {
    SendText(String),
    SendVideo(String),
    EditStatus(i32, String),
    DeleteStatus(i32),
}

/// Records every call; individual operations can be made to fail.
#[derive(Default)]
pub struct RecordingReply {
    calls: Mutex<Vec<ReplyCall>>,
    next_id: AtomicI32,
    pub fail_video: bool,
    pub fail_edit: bool,
}

impl RecordingReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_video() -> Self {
        Self {
            fail_video: true,
            ..Self::default()
        }
    }

    pub fn failing_edit() -> Self {
        Self {
            fail_edit: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ReplyCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: ReplyCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ReplyChannel for RecordingReply {
    async fn send_text(&self, text: &str) -> AppResult<StatusMessage> {
        self.push(ReplyCall::SendText(text.to_string()));
        Ok(StatusMessage(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn send_video(&self, url: &Url) -> AppResult<()> {
        self.push(ReplyCall::SendVideo(url.to_string()));
        if self.fail_video {
            return Err(AppError::Validation("Bad Request: wrong file identifier/HTTP URL specified".to_string()));
        }
        Ok(())
    }

    async fn edit_status(&self, status: StatusMessage, text: &str) -> AppResult<()> {
        self.push(ReplyCall::EditStatus(status.0, text.to_string()));
        if self.fail_edit {
            return Err(AppError::Validation("Bad Request: message to edit not found".to_string()));
        }
        Ok(())
    }

    async fn delete_status(&self, status: StatusMessage) -> AppResult<()> {
        self.push(ReplyCall::DeleteStatus(status.0));
        Ok(())
    }
}
