//! Effective channel permissions and their mapping to engine capabilities.

use std::collections::BTreeSet;

use forumlift_core::{Capability, ChannelKind, UserId};

use crate::types::{WireChannel, WireGuild, WireMember};

/// `ADMINISTRATOR`
pub const ADMINISTRATOR: u64 = 1 << 3;
/// `ADD_REACTIONS`
pub const ADD_REACTIONS: u64 = 1 << 6;
/// `VIEW_CHANNEL`
pub const VIEW_CHANNEL: u64 = 1 << 10;
/// `SEND_MESSAGES`
pub const SEND_MESSAGES: u64 = 1 << 11;
/// `READ_MESSAGE_HISTORY`
pub const READ_MESSAGE_HISTORY: u64 = 1 << 16;
/// `MANAGE_WEBHOOKS`
pub const MANAGE_WEBHOOKS: u64 = 1 << 29;
/// `CREATE_PUBLIC_THREADS`
pub const CREATE_PUBLIC_THREADS: u64 = 1 << 35;
/// `SEND_MESSAGES_IN_THREADS`
pub const SEND_MESSAGES_IN_THREADS: u64 = 1 << 38;

/// Bits denied to `@everyone` when a source channel is archived.
pub const LOCK_BITS: u64 =
    SEND_MESSAGES | ADD_REACTIONS | CREATE_PUBLIC_THREADS | SEND_MESSAGES_IN_THREADS;

const OVERWRITE_ROLE: u8 = 0;
const OVERWRITE_MEMBER: u8 = 1;

/// Permission bits `user` holds in `channel`.
///
/// Guild owner and administrators hold everything. Otherwise the guild-level
/// role permissions are adjusted by the channel's `@everyone`, role, and
/// member overwrites, in that order.
pub fn effective_permissions(
    guild: &WireGuild,
    member: &WireMember,
    user: UserId,
    channel: &WireChannel,
) -> u64 {
    if guild.owner_id == user {
        return u64::MAX;
    }

    let everyone = guild.id.everyone_role();
    let mut base = guild
        .roles
        .iter()
        .filter(|r| r.id == everyone || member.roles.contains(&r.id))
        .fold(0, |acc, r| acc | r.permissions);
    if base & ADMINISTRATOR != 0 {
        return u64::MAX;
    }

    let overwrites = &channel.permission_overwrites;
    if let Some(ow) = overwrites
        .iter()
        .find(|o| o.kind == OVERWRITE_ROLE && o.id == everyone.get())
    {
        base = (base & !ow.deny) | ow.allow;
    }

    let (allow, deny) = overwrites
        .iter()
        .filter(|o| {
            o.kind == OVERWRITE_ROLE && member.roles.iter().any(|r| r.get() == o.id)
        })
        .fold((0, 0), |(allow, deny), o| (allow | o.allow, deny | o.deny));
    base = (base & !deny) | allow;

    if let Some(ow) = overwrites
        .iter()
        .find(|o| o.kind == OVERWRITE_MEMBER && o.id == user.get())
    {
        base = (base & !ow.deny) | ow.allow;
    }

    base
}

/// Capabilities granted by `bits` on a channel of `kind`.
///
/// Without `VIEW_CHANNEL` nothing else applies. Posting in a forum needs
/// `SEND_MESSAGES`; elsewhere it needs `CREATE_PUBLIC_THREADS`.
pub fn capabilities(bits: u64, kind: ChannelKind) -> BTreeSet<Capability> {
    let mut caps = BTreeSet::new();
    if bits & VIEW_CHANNEL == 0 {
        return caps;
    }
    caps.insert(Capability::View);

    let post_bit = if kind.is_forum_like() {
        SEND_MESSAGES
    } else {
        CREATE_PUBLIC_THREADS
    };
    for (bit, capability) in [
        (READ_MESSAGE_HISTORY, Capability::ReadHistory),
        (SEND_MESSAGES, Capability::Send),
        (MANAGE_WEBHOOKS, Capability::ManageSendProxy),
        (post_bit, Capability::CreatePost),
    ] {
        if bits & bit != 0 {
            caps.insert(capability);
        }
    }
    caps
}
