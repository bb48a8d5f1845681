use std::sync::Arc;

use bytes::Bytes;
use forumlift_core::{
    ChannelId, ChannelInfo, GuildId, MessageId, OutgoingFile, OutgoingPayload, RoleId,
    SourceMessage, UserId,
};
use forumlift_platform::{NewPost, Platform, PlatformError, ProxyHandle, ProxySender};
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::multipart::Part;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::DiscordConfig;
use crate::error::DiscordError;
use crate::permissions::{LOCK_BITS, capabilities, effective_permissions};
use crate::types::{
    CreatePostBody, CreateWebhookBody, CreatedChannel, ExecuteWebhookBody, MessageBody,
    OverwriteBody, WireChannel, WireGuild, WireMember, WireMessage, WireUser, WireWebhook,
    channel_kind,
};

const USER_AGENT: &str = concat!("DiscordBot (forumlift, ", env!("CARGO_PKG_VERSION"), ")");

/// Discord REST client implementing [`Platform`] and [`ProxySender`].
///
/// Guild nicknames of message authors are resolved with one member lookup
/// per author and cached for [`DiscordConfig::nickname_ttl`].
pub struct DiscordClient {
    config: DiscordConfig,
    http: Client,
    me: OnceCell<UserId>,
    guilds: Cache<ChannelId, GuildId>,
    nicknames: Cache<(GuildId, UserId), Option<String>>,
}

impl DiscordClient {
    /// Create a client with the given configuration.
    pub fn new(config: DiscordConfig) -> Result<Self, DiscordError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DiscordError::Config(e.to_string()))?;
        Ok(Self::with_client(config, http))
    }

    /// Create a client with a custom HTTP client.
    pub fn with_client(config: DiscordConfig, http: Client) -> Self {
        let nicknames = Cache::builder()
            .max_capacity(config.nickname_capacity)
            .time_to_live(config.nickname_ttl)
            .build();
        Self {
            http,
            me: OnceCell::new(),
            guilds: Cache::new(10_000),
            nicknames,
            config,
        }
    }

    fn authed(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.config.api_base))
            .header(AUTHORIZATION, format!("Bot {}", self.config.token))
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, DiscordError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DiscordError::Timeout(self.config.timeout)
            } else {
                DiscordError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_header = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok());
        let body = response.text().await.unwrap_or_default();
        let err = DiscordError::from_status(status.as_u16(), &body, retry_header);
        if let DiscordError::RateLimited { retry_after } = &err {
            warn!(?retry_after, "Discord API rate limit hit");
        }
        Err(err)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DiscordError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DiscordError::InvalidResponse(e.to_string()))
    }

    async fn current_user(&self) -> Result<UserId, DiscordError> {
        self.me
            .get_or_try_init(|| async {
                let user: WireUser = self.json(self.authed(Method::GET, "/users/@me")).await?;
                Ok::<_, DiscordError>(user.id)
            })
            .await
            .copied()
    }

    async fn fetch_channel(&self, id: ChannelId) -> Result<WireChannel, DiscordError> {
        self.json(self.authed(Method::GET, &format!("/channels/{id}")))
            .await
    }

    async fn guild_of(&self, channel: ChannelId) -> Result<GuildId, DiscordError> {
        self.guilds
            .try_get_with(channel, async {
                self.fetch_channel(channel).await?.guild_id.ok_or_else(|| {
                    DiscordError::InvalidResponse(format!("channel {channel} is not in a guild"))
                })
            })
            .await
            .map_err(unshare)
    }

    async fn member(&self, guild: GuildId, user: UserId) -> Result<WireMember, DiscordError> {
        self.json(self.authed(Method::GET, &format!("/guilds/{guild}/members/{user}")))
            .await
    }

    /// Guild nickname of `user`. Departed members resolve to `None`; other
    /// lookup failures are not cached.
    async fn nickname(&self, guild: GuildId, user: UserId) -> Option<String> {
        let key = (guild, user);
        if let Some(nick) = self.nicknames.get(&key).await {
            return nick;
        }

        match self.member(guild, user).await {
            Ok(member) => {
                self.nicknames.insert(key, member.nick.clone()).await;
                member.nick
            }
            Err(DiscordError::Api { status: 404, .. }) => {
                self.nicknames.insert(key, None).await;
                None
            }
            Err(e) => {
                debug!(%user, error = %e, "nickname lookup failed");
                None
            }
        }
    }

    async fn convert(
        &self,
        channel: ChannelId,
        page: Vec<WireMessage>,
    ) -> Result<Vec<SourceMessage>, DiscordError> {
        if page.is_empty() {
            return Ok(Vec::new());
        }
        let guild = self.guild_of(channel).await?;
        let mut messages = Vec::with_capacity(page.len());
        for message in page {
            let nickname = self.nickname(guild, message.author.id).await;
            messages.push(message.into_source(nickname));
        }
        Ok(messages)
    }
}

fn unshare(err: Arc<DiscordError>) -> DiscordError {
    Arc::try_unwrap(err).unwrap_or_else(|shared| DiscordError::InvalidResponse(shared.to_string()))
}

impl Platform for DiscordClient {
    #[instrument(skip(self), fields(provider = "discord"))]
    async fn channel(&self, id: ChannelId) -> Result<ChannelInfo, PlatformError> {
        let channel = self.fetch_channel(id).await?;
        let guild_id = channel
            .guild_id
            .ok_or_else(|| DiscordError::InvalidResponse(format!("channel {id} is not in a guild")))?;
        self.guilds.insert(id, guild_id).await;

        let me = self.current_user().await?;
        let guild: WireGuild = self
            .json(self.authed(Method::GET, &format!("/guilds/{guild_id}")))
            .await?;
        let member = self.member(guild_id, me).await?;

        let bits = effective_permissions(&guild, &member, me, &channel);
        let caps = capabilities(bits, channel_kind(channel.kind));
        debug!(bits, ?caps, "resolved channel permissions");
        Ok(channel.into_info(guild_id, caps))
    }

    #[instrument(skip(self), fields(provider = "discord"))]
    async fn messages_before(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        let mut request = self
            .authed(Method::GET, &format!("/channels/{channel}/messages"))
            .query(&[("limit", limit.to_string())]);
        if let Some(before) = before {
            request = request.query(&[("before", before.to_string())]);
        }
        let page: Vec<WireMessage> = self.json(request).await?;
        Ok(self.convert(channel, page).await?)
    }

    #[instrument(skip(self), fields(provider = "discord"))]
    async fn pinned_messages(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        let pins: Vec<WireMessage> = self
            .json(self.authed(Method::GET, &format!("/channels/{channel}/pins")))
            .await?;
        Ok(self.convert(channel, pins).await?)
    }

    #[instrument(skip(self, post), fields(provider = "discord", title = %post.title))]
    async fn create_post(
        &self,
        forum: ChannelId,
        post: &NewPost,
    ) -> Result<ChannelId, PlatformError> {
        let body = CreatePostBody {
            name: &post.title,
            message: MessageBody::quiet(&post.content),
            applied_tags: &post.tags,
        };
        let created: CreatedChannel = self
            .json(
                self.authed(Method::POST, &format!("/channels/{forum}/threads"))
                    .json(&body),
            )
            .await?;
        info!(post = %created.id, "forum post created");
        Ok(created.id)
    }

    #[instrument(skip(self), fields(provider = "discord"))]
    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.send(self.authed(Method::DELETE, &format!("/channels/{channel}")))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, content), fields(provider = "discord"))]
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError> {
        self.send(
            self.authed(Method::POST, &format!("/channels/{channel}/messages"))
                .json(&MessageBody::quiet(content)),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(provider = "discord"))]
    async fn lock_channel(&self, channel: ChannelId, role: RoleId) -> Result<(), PlatformError> {
        let current = self.fetch_channel(channel).await?;
        let (allow, deny) = current
            .permission_overwrites
            .iter()
            .find(|o| o.kind == 0 && o.id == role.get())
            .map_or((0, 0), |o| (o.allow, o.deny));

        let body = OverwriteBody {
            kind: 0,
            allow: (allow & !LOCK_BITS).to_string(),
            deny: (deny | LOCK_BITS).to_string(),
        };
        self.send(
            self.authed(
                Method::PUT,
                &format!("/channels/{channel}/permissions/{role}"),
            )
            .json(&body),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, topic), fields(provider = "discord"))]
    async fn set_topic(&self, channel: ChannelId, topic: &str) -> Result<(), PlatformError> {
        self.send(
            self.authed(Method::PATCH, &format!("/channels/{channel}"))
                .json(&serde_json::json!({ "topic": topic })),
        )
        .await?;
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Bytes, PlatformError> {
        let response = self.send(self.http.get(url)).await?;
        let data = response.bytes().await.map_err(DiscordError::Http)?;
        debug!(url, bytes = data.len(), "attachment downloaded");
        Ok(data)
    }
}

impl ProxySender for DiscordClient {
    #[instrument(skip(self), fields(provider = "discord"))]
    async fn create_proxy(
        &self,
        container: ChannelId,
        name: &str,
    ) -> Result<ProxyHandle, PlatformError> {
        let webhook: WireWebhook = self
            .json(
                self.authed(Method::POST, &format!("/channels/{container}/webhooks"))
                    .json(&CreateWebhookBody { name }),
            )
            .await?;
        let token = webhook.token.ok_or_else(|| {
            DiscordError::InvalidResponse(format!("webhook {} has no token", webhook.id))
        })?;
        debug!(webhook = %webhook.id, "webhook created");
        Ok(ProxyHandle {
            id: webhook.id,
            token,
        })
    }

    #[instrument(
        skip(self, proxy, payload),
        fields(provider = "discord", webhook = %proxy.id, files = payload.files.len())
    )]
    async fn send_as(
        &self,
        proxy: &ProxyHandle,
        thread: ChannelId,
        payload: &OutgoingPayload,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.config.api_base, proxy.id, proxy.token
        );
        let request = self
            .http
            .post(url)
            .query(&[("wait", "true".to_owned()), ("thread_id", thread.to_string())]);
        let body = ExecuteWebhookBody::new(payload);

        let request = if payload.files.is_empty() {
            request.json(&body)
        } else {
            // Multipart: the JSON body in `payload_json` plus one `files[n]`
            // part per upload.
            let payload_json = serde_json::to_string(&body)
                .map_err(|e| DiscordError::InvalidResponse(format!("failed to encode payload: {e}")))?;
            let mut form = reqwest::multipart::Form::new().text("payload_json", payload_json);
            for (i, file) in payload.files.iter().enumerate() {
                form = form.part(format!("files[{i}]"), file_part(file));
            }
            request.multipart(form)
        };

        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, proxy), fields(provider = "discord", webhook = %proxy.id))]
    async fn delete_proxy(&self, proxy: ProxyHandle) -> Result<(), PlatformError> {
        self.send(self.authed(Method::DELETE, &format!("/webhooks/{}", proxy.id)))
            .await?;
        debug!("webhook deleted");
        Ok(())
    }
}

/// One upload part. The content type is dropped when it is not a valid MIME
/// type; the bytes are shared, not copied.
fn file_part(file: &OutgoingFile) -> Part {
    let part = || {
        Part::stream_with_length(file.data.clone(), file.data.len() as u64)
            .file_name(file.filename.clone())
    };
    match file.content_type.as_deref() {
        Some(mime) => part().mime_str(mime).unwrap_or_else(|e| {
            debug!(
                filename = %file.filename,
                content_type = mime,
                error = %e,
                "ignoring invalid content type"
            );
            part()
        }),
        None => part(),
    }
}
