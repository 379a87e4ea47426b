//! Session conversation engine.
//!
//! Orchestrates the ledger, audio cache, playback coordinator, and retry
//! queue: sends messages with an optimistic insert, settles or fails them
//! when the request resolves, schedules optional voice playback, and decides
//! between queueing a retry and surfacing an error. All state changes are
//! published through the event sink; the engine never touches presentation.

use crate::audio::{AudioCache, AudioSink, CachedAudio, PlaybackCoordinator};
use crate::backend::{BackendClient, BackendError};
use crate::error::GigiCoreError;
use crate::format;
use crate::ledger::MessageLedger;
use crate::store::{PrefStore, Preferences, RetryEntry, RetryKind, RetryQueue};
use crate::types::{Message, Session};
use gigi_rs_config::GigiConfig;
use gigi_rs_protocol::{
    ChatRequest, ChatResponse, EventMsg, EventPayload, EventSink, MessageId, MessageState,
    RejectReason, ReportRequest, Role, SessionId, TtsRequest,
};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of a send or retry action.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Input rejected before any request was issued.
    Rejected(RejectReason),
    /// The response settled into the ledger (reply or apology).
    Delivered {
        user_id: MessageId,
        assistant_id: MessageId,
    },
    /// Transport failure; the user message is failed and retryable.
    Failed { message_id: MessageId },
}

/// The client-side conversational session engine.
///
/// Cheap to clone; clones share all state. Methods take `&self` and are
/// safe to call from spawned tasks.
#[derive(Clone)]
pub struct SessionEngine {
    config: Arc<GigiConfig>,
    backend: Arc<dyn BackendClient>,
    audio_sink: Arc<dyn AudioSink>,
    events: Arc<dyn EventSink>,
    ledger: MessageLedger,
    cache: AudioCache,
    coordinator: PlaybackCoordinator,
    retry_queue: Arc<RetryQueue>,
    pref_store: Arc<PrefStore>,
    session: Arc<RwLock<Session>>,
    prefs: Arc<RwLock<Preferences>>,
    online: Arc<AtomicBool>,
    sending: Arc<AtomicBool>,
}

impl SessionEngine {
    /// Create an engine using the configured storage root.
    pub fn new(
        config: GigiConfig,
        backend: Arc<dyn BackendClient>,
        audio_sink: Arc<dyn AudioSink>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let root = config.storage.root().unwrap_or_else(|| {
            warn!("no user data directory available, storing under the temp dir");
            std::env::temp_dir().join("gigi")
        });
        Self::with_storage_root(config, backend, audio_sink, events, root)
    }

    /// Create an engine with an explicit storage root.
    pub fn with_storage_root(
        config: GigiConfig,
        backend: Arc<dyn BackendClient>,
        audio_sink: Arc<dyn AudioSink>,
        events: Arc<dyn EventSink>,
        root: impl AsRef<Path>,
    ) -> Self {
        let pref_store = PrefStore::new(&root);
        let retry_queue = RetryQueue::new(&root);
        let prefs = pref_store.load(Preferences {
            voice_enabled: config.voice.enabled_by_default,
            ..Preferences::default()
        });
        let session = Session::new(prefs.voice_enabled);
        info!(
            "session engine initialized (session_id={}, voice_enabled={})",
            session.session_id, prefs.voice_enabled
        );
        let cache = AudioCache::new(config.cache.max_entries, config.cache.evict_batch);
        Self {
            config: Arc::new(config),
            backend,
            audio_sink,
            events,
            ledger: MessageLedger::new(),
            cache,
            coordinator: PlaybackCoordinator::new(),
            retry_queue: Arc::new(retry_queue),
            pref_store: Arc::new(pref_store),
            session: Arc::new(RwLock::new(session)),
            prefs: Arc::new(RwLock::new(prefs)),
            online: Arc::new(AtomicBool::new(true)),
            sending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current session identifier.
    pub fn session_id(&self) -> SessionId {
        self.session.read().session_id
    }

    /// Snapshot of the current session record.
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Snapshot of the ledger in insertion order.
    pub fn messages(&self) -> Vec<Message> {
        self.ledger.snapshot()
    }

    /// Whether voice playback is enabled.
    pub fn voice_enabled(&self) -> bool {
        self.session.read().voice_enabled
    }

    /// Current theme preference.
    pub fn theme(&self) -> String {
        self.prefs.read().theme.clone()
    }

    /// Whether first-run onboarding has been completed.
    pub fn onboarded(&self) -> bool {
        self.prefs.read().onboarded
    }

    /// Connectivity state as last reported by the embedding shell.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Send a user message through the chat endpoint.
    ///
    /// The pending user message is appended to the ledger before the
    /// request is issued; `message_count` counts attempts, not successes.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, GigiCoreError> {
        let text = text.trim();
        if text.is_empty() {
            self.emit(EventPayload::InputRejected {
                reason: RejectReason::Empty,
            });
            return Ok(SendOutcome::Rejected(RejectReason::Empty));
        }
        if text.chars().count() > self.config.chat.max_message_length {
            self.emit(EventPayload::InputRejected {
                reason: RejectReason::TooLong,
            });
            return Ok(SendOutcome::Rejected(RejectReason::TooLong));
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return Ok(SendOutcome::Rejected(RejectReason::Busy));
        }
        self.emit(EventPayload::SendLocked { locked: true });

        let user = self
            .ledger
            .insert_pending(Role::User, text.to_string(), text.to_string());
        self.session.write().message_count += 1;
        self.emit(EventPayload::MessageAppended {
            message_id: user.id.clone(),
            role: Role::User,
            state: MessageState::Pending,
        });
        self.emit(EventPayload::TypingChanged { active: true });

        let request = ChatRequest {
            session_id: self.session_id(),
            message: text.to_string(),
        };
        let result = self.backend.chat(request).await;
        let outcome = self.conclude_chat(&user.id, result, false);

        self.emit(EventPayload::TypingChanged { active: false });
        self.emit(EventPayload::SendLocked { locked: false });
        self.sending.store(false, Ordering::SeqCst);
        outcome
    }

    /// Re-issue the identical payload for a failed message.
    ///
    /// On success the failed entry is removed and replaced with a fresh
    /// settled user message; on renewed failure the single failed entry
    /// remains with its retry affordance re-enabled.
    pub async fn retry_message(&self, message_id: &MessageId) -> Result<SendOutcome, GigiCoreError> {
        let failed = self
            .ledger
            .get(message_id)
            .ok_or_else(|| GigiCoreError::UnknownMessage(message_id.clone()))?;
        if failed.state != MessageState::Failed {
            return Err(GigiCoreError::NotRetryable(message_id.clone()));
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return Ok(SendOutcome::Rejected(RejectReason::Busy));
        }
        info!("retrying message (message_id={})", message_id);
        self.emit(EventPayload::SendLocked { locked: true });
        self.emit(EventPayload::TypingChanged { active: true });

        let request = ChatRequest {
            session_id: self.session_id(),
            message: failed.plain_text.clone(),
        };
        let result = self.backend.chat(request).await;
        let outcome = self.conclude_chat(message_id, result, true);

        self.emit(EventPayload::TypingChanged { active: false });
        self.emit(EventPayload::SendLocked { locked: false });
        self.sending.store(false, Ordering::SeqCst);
        outcome
    }

    /// Play (or toggle off) audio for a ledger message.
    ///
    /// Synthesis and playback failures degrade to a non-blocking notice;
    /// they never fail the surrounding chat flow.
    pub async fn play_message(&self, message_id: &MessageId) -> Result<(), GigiCoreError> {
        let message = self
            .ledger
            .get(message_id)
            .ok_or_else(|| GigiCoreError::UnknownMessage(message_id.clone()))?;

        // Whatever is playing stops first; a request for the message that
        // was playing is a stop, not a re-trigger.
        if let Some(stopped) = self.coordinator.stop() {
            self.emit(EventPayload::PlaybackStopped {
                message_id: stopped.clone(),
            });
            if &stopped == message_id {
                return Ok(());
            }
        }

        let handle = match self.cache.get(message_id, &message.plain_text) {
            Some(handle) => {
                debug!("audio cache hit (message_id={})", message_id);
                handle
            }
            None => {
                let request = TtsRequest {
                    text: message.plain_text.clone(),
                    voice: self.config.voice.voice.clone(),
                    speed: self.config.voice.speed,
                    use_cache: self.config.voice.use_cache,
                };
                let audio = match self.backend.synthesize(request).await {
                    Ok(audio) => audio,
                    Err(err) => {
                        warn!("speech synthesis failed (message_id={}): {err}", message_id);
                        self.emit(EventPayload::PlaybackFailed {
                            message_id: message_id.clone(),
                            message: err.to_string(),
                        });
                        return Ok(());
                    }
                };
                let handle = match self.audio_sink.load(message_id, &audio) {
                    Ok(handle) => handle,
                    Err(err) => {
                        warn!("audio load failed (message_id={}): {err}", message_id);
                        self.emit(EventPayload::PlaybackFailed {
                            message_id: message_id.clone(),
                            message: err.to_string(),
                        });
                        return Ok(());
                    }
                };
                self.cache.insert(CachedAudio {
                    message_id: message_id.clone(),
                    handle: handle.clone(),
                    source_text: message.plain_text.clone(),
                });
                handle
            }
        };

        match self.coordinator.begin(message_id.clone(), handle) {
            Ok(()) => self.emit(EventPayload::PlaybackStarted {
                message_id: message_id.clone(),
            }),
            Err(err) => {
                warn!("playback start failed (message_id={}): {err}", message_id);
                self.emit(EventPayload::PlaybackFailed {
                    message_id: message_id.clone(),
                    message: err.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Stop any active playback.
    pub fn stop_playback(&self) {
        if let Some(stopped) = self.coordinator.stop() {
            self.emit(EventPayload::PlaybackStopped {
                message_id: stopped,
            });
        }
    }

    /// Report that a resource finished playing (natural end or element
    /// error). The control is reset to idle either way.
    pub fn notify_playback_finished(&self, message_id: &MessageId) {
        if self.coordinator.finished(message_id) {
            self.emit(EventPayload::PlaybackStopped {
                message_id: message_id.clone(),
            });
        }
    }

    /// Toggle the global voice preference; disabling stops active audio.
    pub fn set_voice_enabled(&self, enabled: bool) {
        self.session.write().voice_enabled = enabled;
        {
            let mut prefs = self.prefs.write();
            prefs.voice_enabled = enabled;
            self.pref_store.save(&prefs);
        }
        self.emit(EventPayload::VoiceChanged { enabled });
        if !enabled {
            self.stop_playback();
        }
    }

    /// Persist a new theme preference.
    pub fn set_theme(&self, theme: &str) {
        {
            let mut prefs = self.prefs.write();
            prefs.theme = theme.to_string();
            self.pref_store.save(&prefs);
        }
        self.emit(EventPayload::ThemeChanged {
            theme: theme.to_string(),
        });
    }

    /// Persist the first-run onboarding flag.
    pub fn set_onboarded(&self, onboarded: bool) {
        let mut prefs = self.prefs.write();
        prefs.onboarded = onboarded;
        self.pref_store.save(&prefs);
    }

    /// Record connectivity reported by the embedding shell. The transition
    /// from offline to online triggers one retry-queue drain.
    pub async fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        self.emit(EventPayload::ConnectivityChanged { online });
        if online && !was_online {
            self.drain_retry_queue().await;
        }
    }

    /// Submit a report; failures while offline are queued for silent
    /// replay, failures while online surface as an error event.
    pub async fn submit_report(&self, report: ReportRequest) {
        match self.backend.report(report.clone()).await {
            Ok(()) => {
                info!("report submitted");
                self.emit(EventPayload::ReportSubmitted);
            }
            Err(err) if !self.is_online() => {
                warn!("report failed while offline, queueing for replay: {err}");
                match self.retry_queue.enqueue(&RetryEntry::report(report)) {
                    Ok(queued) => self.emit(EventPayload::ReportQueued { queued }),
                    Err(store_err) => {
                        warn!("failed to queue report: {store_err}");
                        self.emit(EventPayload::ReportFailed {
                            message: err.to_string(),
                        });
                    }
                }
            }
            Err(err) => {
                warn!("report submission failed: {err}");
                self.emit(EventPayload::ReportFailed {
                    message: err.to_string(),
                });
            }
        }
    }

    /// Replay the whole retry queue once, best-effort, then leave it empty
    /// regardless of individual outcomes.
    pub async fn drain_retry_queue(&self) {
        let entries = match self.retry_queue.take_all() {
            Ok(entries) => entries,
            Err(err) => {
                warn!("failed to read retry queue: {err}");
                return;
            }
        };
        if entries.is_empty() {
            return;
        }
        let attempted = entries.len();
        let mut succeeded = 0;
        for entry in entries {
            match entry.kind {
                RetryKind::Report => match self.backend.report(entry.payload).await {
                    Ok(()) => succeeded += 1,
                    Err(err) => warn!("retry replay failed: {err}"),
                },
            }
        }
        info!("retry queue drained (attempted={attempted}, succeeded={succeeded})");
        self.emit(EventPayload::RetryQueueDrained {
            attempted,
            succeeded,
        });
    }

    /// Reset the conversation: new session id, empty ledger, released
    /// audio cache, idle playback. Voice preference carries over.
    pub fn reset(&self) {
        self.stop_playback();
        self.cache.clear();
        self.ledger.clear();
        let session = Session::new(self.voice_enabled());
        let session_id = session.session_id;
        *self.session.write() = session;
        info!("session reset (session_id={})", session_id);
        self.emit(EventPayload::SessionReset { session_id });
    }

    /// Tab-hidden lifecycle hook: audio must not keep playing.
    pub fn handle_hidden(&self) {
        self.stop_playback();
    }

    /// Before-unload lifecycle hook.
    pub fn handle_unload(&self) {
        self.stop_playback();
    }

    /// Resolve a finished chat request into ledger state and an outcome.
    fn conclude_chat(
        &self,
        user_id: &MessageId,
        result: Result<ChatResponse, BackendError>,
        is_retry: bool,
    ) -> Result<SendOutcome, GigiCoreError> {
        match result {
            Ok(response) => {
                if let Some(reply) = response.reply {
                    let user_id = self.settle_user(user_id, is_retry)?;
                    let assistant = self.append_assistant(&reply)?;
                    if self.voice_enabled() {
                        self.spawn_autoplay(assistant.id.clone());
                    }
                    Ok(SendOutcome::Delivered {
                        user_id,
                        assistant_id: assistant.id,
                    })
                } else if let Some(error) = response.error {
                    // Server-acknowledged errors are terminal, not requeued.
                    warn!("server-acknowledged chat error: {error}");
                    let user_id = self.settle_user(user_id, is_retry)?;
                    let apology = self.config.chat.apology_message.clone();
                    let assistant = self.append_assistant(&apology)?;
                    Ok(SendOutcome::Delivered {
                        user_id,
                        assistant_id: assistant.id,
                    })
                } else {
                    warn!("chat response carried neither reply nor error");
                    self.fail_user(user_id)?;
                    Ok(SendOutcome::Failed {
                        message_id: user_id.clone(),
                    })
                }
            }
            Err(err) => {
                warn!("chat request failed (message_id={}): {err}", user_id);
                self.fail_user(user_id)?;
                Ok(SendOutcome::Failed {
                    message_id: user_id.clone(),
                })
            }
        }
    }

    /// Settle the outbound user message. For a retry the failed entry is
    /// removed and replaced by a fresh entry carrying the same text.
    fn settle_user(&self, user_id: &MessageId, is_retry: bool) -> Result<MessageId, GigiCoreError> {
        if !is_retry {
            self.ledger.settle(user_id)?;
            self.emit(EventPayload::MessageSettled {
                message_id: user_id.clone(),
            });
            return Ok(user_id.clone());
        }
        let failed = self.ledger.remove(user_id)?;
        self.emit(EventPayload::MessageRemoved {
            message_id: user_id.clone(),
        });
        let replacement =
            self.ledger
                .insert_pending(Role::User, failed.content, failed.plain_text);
        self.ledger.settle(&replacement.id)?;
        self.emit(EventPayload::MessageAppended {
            message_id: replacement.id.clone(),
            role: Role::User,
            state: MessageState::Settled,
        });
        Ok(replacement.id)
    }

    /// Mark the outbound user message failed and expose the retry action.
    /// A renewed retry failure leaves the already-failed entry untouched.
    fn fail_user(&self, user_id: &MessageId) -> Result<(), GigiCoreError> {
        let state = self
            .ledger
            .get(user_id)
            .map(|message| message.state)
            .ok_or_else(|| GigiCoreError::UnknownMessage(user_id.clone()))?;
        if state == MessageState::Pending {
            self.ledger.fail(user_id)?;
        }
        self.emit(EventPayload::MessageFailed {
            message_id: user_id.clone(),
        });
        Ok(())
    }

    /// Append an assistant reply, rendered and stripped, already settled.
    fn append_assistant(&self, reply: &str) -> Result<Message, GigiCoreError> {
        let message = self.ledger.insert_pending(
            Role::Assistant,
            format::render_html(reply),
            format::plain_text(reply),
        );
        self.ledger.settle(&message.id)?;
        self.emit(EventPayload::MessageAppended {
            message_id: message.id.clone(),
            role: Role::Assistant,
            state: MessageState::Settled,
        });
        Ok(Message {
            state: MessageState::Settled,
            ..message
        })
    }

    /// Schedule fire-and-forget playback for a settled assistant reply.
    fn spawn_autoplay(&self, message_id: MessageId) {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(err) = engine.play_message(&message_id).await {
                warn!("auto-play failed (message_id={}): {err}", message_id);
            }
        });
    }

    /// Wrap a payload in an envelope for the current session and emit it.
    fn emit(&self, payload: EventPayload) {
        self.events.emit(EventMsg::new(self.session_id(), payload));
    }
}
