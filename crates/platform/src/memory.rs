//! In-memory platform for development and testing.
//!
//! [`MemoryPlatform`] holds channels and histories in concurrent maps, records
//! every mutating call, and lets tests script failures for individual
//! operations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use dashmap::DashMap;
use forumlift_core::{
    ChannelId, ChannelInfo, MessageId, OutgoingPayload, ProxyId, RoleId, SourceMessage,
};
use tokio::time::Instant;
use tracing::debug;

use crate::error::PlatformError;
use crate::platform::{NewPost, Platform, ProxyHandle, ProxySender};

/// Scripted outcome of one proxied send.
#[derive(Debug)]
pub enum SendOutcome {
    /// Accept the message.
    Deliver,
    /// Reject the message with the given error.
    Fail(PlatformError),
    /// Panic inside the send call.
    Panic,
}

/// A message accepted through a proxy.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Proxy used.
    pub proxy: ProxyId,
    /// Post the message went into.
    pub thread: ChannelId,
    /// What was sent.
    pub payload: OutgoingPayload,
}

/// Every call a [`MemoryPlatform`] has served, in order.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    /// History page requests as `(channel, before)`.
    pub pages: Vec<(ChannelId, Option<MessageId>)>,
    /// Pinned-message requests.
    pub pin_requests: Vec<ChannelId>,
    /// Created posts as `(forum, post id, post)`.
    pub posts: Vec<(ChannelId, ChannelId, NewPost)>,
    /// Deleted channels and posts.
    pub deleted_channels: Vec<ChannelId>,
    /// Created proxies as `(container, handle)`.
    pub proxies_created: Vec<(ChannelId, ProxyHandle)>,
    /// Deleted proxies.
    pub proxies_deleted: Vec<ProxyId>,
    /// Time of every proxied send attempt, accepted or not.
    pub send_attempts: Vec<Instant>,
    /// Accepted proxied sends.
    pub sent: Vec<SentMessage>,
    /// Plain messages as `(channel, content)`.
    pub plain_messages: Vec<(ChannelId, String)>,
    /// Channel locks as `(channel, role)`.
    pub locks: Vec<(ChannelId, RoleId)>,
    /// Topic updates as `(channel, topic)`.
    pub topics: Vec<(ChannelId, String)>,
    /// Downloaded URLs.
    pub downloads: Vec<String>,
}

/// In-memory [`Platform`] and [`ProxySender`].
pub struct MemoryPlatform {
    channels: DashMap<ChannelId, ChannelInfo>,
    /// Channel id -> messages, oldest first.
    history: DashMap<ChannelId, Vec<SourceMessage>>,
    /// URL -> file contents, or the HTTP status a download fails with.
    files: DashMap<String, Result<Bytes, u16>>,
    send_script: Mutex<VecDeque<SendOutcome>>,
    history_failure: Mutex<Option<PlatformError>>,
    post_failure: Mutex<Option<PlatformError>>,
    proxy_failure: Mutex<Option<PlatformError>>,
    proxy_delete_failure: Mutex<Option<PlatformError>>,
    message_failure: Mutex<Option<PlatformError>>,
    lock_failure: Mutex<Option<PlatformError>>,
    next_id: AtomicU64,
    log: Mutex<CallLog>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            history: DashMap::new(),
            files: DashMap::new(),
            send_script: Mutex::new(VecDeque::new()),
            history_failure: Mutex::new(None),
            post_failure: Mutex::new(None),
            proxy_failure: Mutex::new(None),
            proxy_delete_failure: Mutex::new(None),
            message_failure: Mutex::new(None),
            lock_failure: Mutex::new(None),
            next_id: AtomicU64::new(900_000),
            log: Mutex::new(CallLog::default()),
        }
    }

    /// Register a channel.
    #[must_use]
    pub fn with_channel(self, info: ChannelInfo) -> Self {
        self.channels.insert(info.id, info);
        self
    }

    /// Replace the history of a channel. Messages may be given in any order.
    #[must_use]
    pub fn with_messages(self, channel: ChannelId, mut messages: Vec<SourceMessage>) -> Self {
        messages.sort_by_key(|m| m.id);
        self.history.insert(channel, messages);
        self
    }

    /// Serve `data` for downloads of `url`.
    #[must_use]
    pub fn with_file(self, url: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.files.insert(url.into(), Ok(data.into()));
        self
    }

    /// Fail downloads of `url` with the given HTTP status.
    #[must_use]
    pub fn with_failed_file(self, url: impl Into<String>, status: u16) -> Self {
        self.files.insert(url.into(), Err(status));
        self
    }

    /// Queue the outcome of the next proxied send. Sends beyond the script
    /// are delivered.
    pub fn script_send(&self, outcome: SendOutcome) {
        lock(&self.send_script).push_back(outcome);
    }

    /// Fail the next history or pins request.
    pub fn fail_history(&self, err: PlatformError) {
        *lock(&self.history_failure) = Some(err);
    }

    /// Fail the next post creation.
    pub fn fail_create_post(&self, err: PlatformError) {
        *lock(&self.post_failure) = Some(err);
    }

    /// Fail the next proxy creation.
    pub fn fail_create_proxy(&self, err: PlatformError) {
        *lock(&self.proxy_failure) = Some(err);
    }

    /// Fail the next proxy deletion.
    pub fn fail_delete_proxy(&self, err: PlatformError) {
        *lock(&self.proxy_delete_failure) = Some(err);
    }

    /// Fail the next plain message.
    pub fn fail_send_message(&self, err: PlatformError) {
        *lock(&self.message_failure) = Some(err);
    }

    /// Fail the next channel lock.
    pub fn fail_lock(&self, err: PlatformError) {
        *lock(&self.lock_failure) = Some(err);
    }

    /// Snapshot of every call served so far.
    pub fn calls(&self) -> CallLog {
        lock(&self.log).clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn take_failure(slot: &Mutex<Option<PlatformError>>) -> Result<(), PlatformError> {
        match lock(slot).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn history_of(&self, channel: ChannelId) -> Result<Vec<SourceMessage>, PlatformError> {
        if !self.channels.contains_key(&channel) {
            return Err(PlatformError::NotFound(format!("channel {channel}")));
        }
        Ok(self
            .history
            .get(&channel)
            .map(|h| h.value().clone())
            .unwrap_or_default())
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    async fn channel(&self, id: ChannelId) -> Result<ChannelInfo, PlatformError> {
        self.channels
            .get(&id)
            .map(|c| c.value().clone())
            .ok_or_else(|| PlatformError::NotFound(format!("channel {id}")))
    }

    async fn messages_before(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        lock(&self.log).pages.push((channel, before));
        Self::take_failure(&self.history_failure)?;

        let page: Vec<SourceMessage> = self
            .history_of(channel)?
            .into_iter()
            .filter(|m| before.is_none_or(|b| m.id < b))
            .rev()
            .take(usize::from(limit))
            .collect();
        debug!(%channel, count = page.len(), "served history page");
        Ok(page)
    }

    async fn pinned_messages(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        lock(&self.log).pin_requests.push(channel);
        Self::take_failure(&self.history_failure)?;

        Ok(self
            .history_of(channel)?
            .into_iter()
            .filter(|m| m.pinned)
            .rev()
            .collect())
    }

    async fn create_post(
        &self,
        forum: ChannelId,
        post: &NewPost,
    ) -> Result<ChannelId, PlatformError> {
        Self::take_failure(&self.post_failure)?;
        let id = ChannelId::new(self.next_id());
        lock(&self.log).posts.push((forum, id, post.clone()));
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        lock(&self.log).deleted_channels.push(channel);
        Ok(())
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError> {
        Self::take_failure(&self.message_failure)?;
        lock(&self.log)
            .plain_messages
            .push((channel, content.to_owned()));
        Ok(())
    }

    async fn lock_channel(&self, channel: ChannelId, role: RoleId) -> Result<(), PlatformError> {
        Self::take_failure(&self.lock_failure)?;
        lock(&self.log).locks.push((channel, role));
        Ok(())
    }

    async fn set_topic(&self, channel: ChannelId, topic: &str) -> Result<(), PlatformError> {
        lock(&self.log).topics.push((channel, topic.to_owned()));
        if let Some(mut info) = self.channels.get_mut(&channel) {
            info.topic = Some(topic.to_owned());
        }
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Bytes, PlatformError> {
        lock(&self.log).downloads.push(url.to_owned());
        match self.files.get(url).map(|f| f.value().clone()) {
            Some(Ok(data)) => Ok(data),
            Some(Err(status)) => Err(PlatformError::Api {
                status,
                message: format!("download of {url} failed"),
            }),
            None => Err(PlatformError::NotFound(url.to_owned())),
        }
    }
}

impl ProxySender for MemoryPlatform {
    async fn create_proxy(
        &self,
        container: ChannelId,
        _name: &str,
    ) -> Result<ProxyHandle, PlatformError> {
        Self::take_failure(&self.proxy_failure)?;
        let id = self.next_id();
        let handle = ProxyHandle {
            id: ProxyId::new(id),
            token: format!("token-{id}"),
        };
        lock(&self.log)
            .proxies_created
            .push((container, handle.clone()));
        Ok(handle)
    }

    async fn send_as(
        &self,
        proxy: &ProxyHandle,
        thread: ChannelId,
        payload: &OutgoingPayload,
    ) -> Result<(), PlatformError> {
        lock(&self.log).send_attempts.push(Instant::now());
        let outcome = lock(&self.send_script)
            .pop_front()
            .unwrap_or(SendOutcome::Deliver);

        match outcome {
            SendOutcome::Deliver => {
                lock(&self.log).sent.push(SentMessage {
                    proxy: proxy.id,
                    thread,
                    payload: payload.clone(),
                });
                Ok(())
            }
            SendOutcome::Fail(err) => Err(err),
            SendOutcome::Panic => panic!("scripted panic while sending through {:?}", proxy.id),
        }
    }

    async fn delete_proxy(&self, proxy: ProxyHandle) -> Result<(), PlatformError> {
        lock(&self.log).proxies_deleted.push(proxy.id);
        Self::take_failure(&self.proxy_delete_failure)
    }
}
