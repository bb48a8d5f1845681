use std::future::Future;

use bytes::Bytes;
use forumlift_core::{
    ChannelId, ChannelInfo, MessageId, OutgoingPayload, ProxyId, RoleId, SourceMessage, TagId,
};

use crate::error::PlatformError;

/// A forum post to create: title, opening message, and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Post title, already within the platform's title limit.
    pub title: String,
    /// Opening message of the post.
    pub content: String,
    /// Tags to apply.
    pub tags: Vec<TagId>,
}

/// A live send-identity proxy (webhook).
///
/// Deleting the proxy consumes the handle, so a handle can be torn down at
/// most once.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyHandle {
    /// Proxy id.
    pub id: ProxyId,
    /// Secret used to send through the proxy.
    pub token: String,
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Read and write operations on channels of the remote platform.
///
/// This trait uses native `async fn` return types and is meant to be used as a
/// generic bound; the engine is generic over its platform.
pub trait Platform: Send + Sync {
    /// Channel metadata and the caller's effective capabilities on it.
    fn channel(
        &self,
        id: ChannelId,
    ) -> impl Future<Output = Result<ChannelInfo, PlatformError>> + Send;

    /// Up to `limit` messages older than `before` (or the newest messages when
    /// `before` is `None`), newest first.
    fn messages_before(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> impl Future<Output = Result<Vec<SourceMessage>, PlatformError>> + Send;

    /// The pinned messages of a channel, newest first.
    fn pinned_messages(
        &self,
        channel: ChannelId,
    ) -> impl Future<Output = Result<Vec<SourceMessage>, PlatformError>> + Send;

    /// Create a post in a forum and return the post's thread id.
    fn create_post(
        &self,
        forum: ChannelId,
        post: &NewPost,
    ) -> impl Future<Output = Result<ChannelId, PlatformError>> + Send;

    /// Delete a channel or post.
    fn delete_channel(
        &self,
        channel: ChannelId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Send a plain message as the migrating account.
    fn send_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Deny `role` sending, reacting, and creating threads in a channel.
    fn lock_channel(
        &self,
        channel: ChannelId,
        role: RoleId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Replace a channel's topic.
    fn set_topic(
        &self,
        channel: ChannelId,
        topic: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Fetch the bytes behind a URL (attachment download).
    fn download(&self, url: &str) -> impl Future<Output = Result<Bytes, PlatformError>> + Send;
}

/// Send messages under an arbitrary display name and avatar.
///
/// A proxy is scoped to a container channel and sends into one of its posts.
pub trait ProxySender: Send + Sync {
    /// Create a proxy on `container`.
    fn create_proxy(
        &self,
        container: ChannelId,
        name: &str,
    ) -> impl Future<Output = Result<ProxyHandle, PlatformError>> + Send;

    /// Send one payload into `thread` through the proxy.
    fn send_as(
        &self,
        proxy: &ProxyHandle,
        thread: ChannelId,
        payload: &OutgoingPayload,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Delete the proxy.
    fn delete_proxy(
        &self,
        proxy: ProxyHandle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}
