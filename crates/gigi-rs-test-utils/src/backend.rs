use async_trait::async_trait;
use gigi_rs_core::backend::{BackendClient, BackendError};
use gigi_rs_protocol::{ChatRequest, ChatResponse, ReportRequest, TtsRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Backend that always answers chat with the same reply.
pub struct FixedBackend {
    reply: String,
    fail_tts: AtomicBool,
    fail_reports: AtomicBool,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub tts_requests: Mutex<Vec<TtsRequest>>,
    pub report_requests: Mutex<Vec<ReportRequest>>,
}

impl FixedBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail_tts: AtomicBool::new(false),
            fail_reports: AtomicBool::new(false),
            chat_requests: Mutex::new(Vec::new()),
            tts_requests: Mutex::new(Vec::new()),
            report_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_tts(self) -> Self {
        self.fail_tts.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    pub fn chat_count(&self) -> usize {
        self.chat_requests.lock().len()
    }

    pub fn tts_count(&self) -> usize {
        self.tts_requests.lock().len()
    }

    pub fn report_count(&self) -> usize {
        self.report_requests.lock().len()
    }
}

#[async_trait]
impl BackendClient for FixedBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_requests.lock().push(request);
        Ok(ChatResponse {
            reply: Some(self.reply.clone()),
            error: None,
        })
    }

    async fn synthesize(&self, request: TtsRequest) -> Result<Vec<u8>, BackendError> {
        self.tts_requests.lock().push(request);
        if self.fail_tts.load(Ordering::SeqCst) {
            return Err(BackendError::Status(503));
        }
        Ok(vec![0u8; 16])
    }

    async fn report(&self, request: ReportRequest) -> Result<(), BackendError> {
        self.report_requests.lock().push(request);
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Backend where every request fails at the transport level.
#[derive(Default)]
pub struct FailingBackend {
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub report_requests: Mutex<Vec<ReportRequest>>,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackendClient for FailingBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_requests.lock().push(request);
        Err(BackendError::Transport("connection reset".to_string()))
    }

    async fn synthesize(&self, _request: TtsRequest) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::Transport("connection reset".to_string()))
    }

    async fn report(&self, request: ReportRequest) -> Result<(), BackendError> {
        self.report_requests.lock().push(request);
        Err(BackendError::Transport("connection reset".to_string()))
    }
}

/// One scripted chat outcome.
pub enum ChatScript {
    Reply(String),
    ServerError(String),
    Transport,
    Status(u16),
    Malformed,
}

/// Backend driven by scripted chat and report outcomes, in order.
pub struct ScriptedBackend {
    chat_script: Mutex<VecDeque<ChatScript>>,
    report_script: Mutex<VecDeque<Result<(), BackendError>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub report_requests: Mutex<Vec<ReportRequest>>,
}

impl ScriptedBackend {
    pub fn new(chat_script: Vec<ChatScript>) -> Self {
        Self {
            chat_script: Mutex::new(chat_script.into()),
            report_script: Mutex::new(VecDeque::new()),
            chat_requests: Mutex::new(Vec::new()),
            report_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_report_script(self, outcomes: Vec<Result<(), BackendError>>) -> Self {
        *self.report_script.lock() = outcomes.into();
        self
    }

    pub fn report_count(&self) -> usize {
        self.report_requests.lock().len()
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_requests.lock().push(request);
        match self.chat_script.lock().pop_front() {
            Some(ChatScript::Reply(reply)) => Ok(ChatResponse {
                reply: Some(reply),
                error: None,
            }),
            Some(ChatScript::ServerError(error)) => Ok(ChatResponse {
                reply: None,
                error: Some(error),
            }),
            Some(ChatScript::Transport) => {
                Err(BackendError::Transport("connection reset".to_string()))
            }
            Some(ChatScript::Status(code)) => Err(BackendError::Status(code)),
            Some(ChatScript::Malformed) => Ok(ChatResponse::default()),
            None => Err(BackendError::Transport("script exhausted".to_string())),
        }
    }

    async fn synthesize(&self, _request: TtsRequest) -> Result<Vec<u8>, BackendError> {
        Ok(vec![0u8; 16])
    }

    async fn report(&self, request: ReportRequest) -> Result<(), BackendError> {
        self.report_requests.lock().push(request);
        self.report_script.lock().pop_front().unwrap_or(Ok(()))
    }
}

/// Backend whose chat call blocks until the test releases it, so tests can
/// observe ledger state while a request is in flight.
pub struct GatedBackend {
    reply: String,
    pub entered: Arc<Notify>,
    pub gate: Arc<Notify>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

impl GatedBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
            chat_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl BackendClient for GatedBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_requests.lock().push(request);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(ChatResponse {
            reply: Some(self.reply.clone()),
            error: None,
        })
    }

    async fn synthesize(&self, _request: TtsRequest) -> Result<Vec<u8>, BackendError> {
        Ok(vec![0u8; 16])
    }

    async fn report(&self, _request: ReportRequest) -> Result<(), BackendError> {
        Ok(())
    }
}
