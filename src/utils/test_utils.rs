//! Fakes shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{ChatMessage, ChatRequest, ModelInfo};
use crate::core::preferences::{PreferenceContext, PreferenceSource};
use crate::core::transport::{ExchangeId, OneShotChannel, PersistentChannel, TransportFailure};

#[derive(Default)]
struct ChannelLog {
    connected: AtomicBool,
    refuse_sends: AtomicBool,
    reconnects: AtomicUsize,
    closed: AtomicBool,
    sent: Mutex<Vec<(ExchangeId, ChatRequest)>>,
}

/// Scriptable [`PersistentChannel`]. Keep a [`ChannelMonitor`] to inspect it
/// after handing the channel to a selector.
pub struct FakeChannel {
    log: Arc<ChannelLog>,
}

#[derive(Clone)]
pub struct ChannelMonitor {
    log: Arc<ChannelLog>,
}

impl FakeChannel {
    pub fn connected() -> Self {
        let channel = Self {
            log: Arc::new(ChannelLog::default()),
        };
        channel.log.connected.store(true, Ordering::SeqCst);
        channel
    }

    pub fn disconnected() -> Self {
        Self {
            log: Arc::new(ChannelLog::default()),
        }
    }

    pub fn refusing_sends(self) -> Self {
        self.log.refuse_sends.store(true, Ordering::SeqCst);
        self
    }

    pub fn monitor(&self) -> ChannelMonitor {
        ChannelMonitor {
            log: Arc::clone(&self.log),
        }
    }
}

impl ChannelMonitor {
    pub fn set_connected(&self, connected: bool) {
        self.log.connected.store(connected, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(ExchangeId, ChatRequest)> {
        self.log.sent.lock().unwrap().clone()
    }

    pub fn reconnects(&self) -> usize {
        self.log.reconnects.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.log.closed.load(Ordering::SeqCst)
    }
}

impl PersistentChannel for FakeChannel {
    fn is_connected(&self) -> bool {
        self.log.connected.load(Ordering::SeqCst)
    }

    fn send(
        &mut self,
        exchange: ExchangeId,
        request: &ChatRequest,
    ) -> Result<(), TransportFailure> {
        if self.log.refuse_sends.load(Ordering::SeqCst) {
            return Err(TransportFailure::disconnected("fake refused"));
        }
        self.log
            .sent
            .lock()
            .unwrap()
            .push((exchange, request.clone()));
        Ok(())
    }

    fn reconnect(&mut self) {
        self.log.reconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.log.closed.store(true, Ordering::SeqCst);
        self.log.connected.store(false, Ordering::SeqCst);
    }
}

/// One-shot channel returning a canned outcome and recording requests.
pub struct FakeOneShot {
    outcome: Result<String, TransportFailure>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeOneShot {
    pub fn replying(content: &str) -> Self {
        Self {
            outcome: Ok(content.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: TransportFailure) -> Self {
        Self {
            outcome: Err(failure),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OneShotChannel for FakeOneShot {
    async fn exchange(&self, request: ChatRequest) -> Result<String, TransportFailure> {
        self.requests.lock().unwrap().push(request);
        self.outcome.clone()
    }
}

/// Preference source whose snapshot can be edited between sends.
#[derive(Clone, Default)]
pub struct SharedPreferences(pub Arc<Mutex<PreferenceContext>>);

impl SharedPreferences {
    pub fn set(&self, context: PreferenceContext) {
        *self.0.lock().unwrap() = context;
    }
}

impl PreferenceSource for SharedPreferences {
    fn snapshot(&self) -> PreferenceContext {
        self.0.lock().unwrap().clone()
    }
}

pub fn models(names: &[&str]) -> Vec<ModelInfo> {
    names
        .iter()
        .map(|name| ModelInfo {
            name: name.to_string(),
            size: String::new(),
        })
        .collect()
}

pub fn user(content: &str) -> ChatMessage {
    ChatMessage::new("user", content)
}

pub fn assistant(content: &str) -> ChatMessage {
    ChatMessage::new("assistant", content)
}
