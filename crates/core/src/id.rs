use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Milliseconds between the Unix epoch and the first second of 2015, the
/// epoch that platform snowflakes count from.
pub const SNOWFLAKE_EPOCH_MS: u64 = 1_420_070_400_000;

macro_rules! newtype_snowflake {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw snowflake value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the raw snowflake value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Creation time encoded in the upper bits of the snowflake.
            #[must_use]
            pub fn created_at(self) -> DateTime<Utc> {
                snowflake_timestamp(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawSnowflake::deserialize(deserializer)?
                    .into_u64()
                    .map(Self)
                    .map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Snowflakes arrive as JSON strings from the REST API but as plain integers
/// from hand-written fixtures and TOML files.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Int(u64),
    Str(String),
}

impl RawSnowflake {
    fn into_u64(self) -> Result<u64, String> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Str(s) => s
                .parse()
                .map_err(|e| format!("invalid snowflake {s:?}: {e}")),
        }
    }
}

fn snowflake_timestamp(value: u64) -> DateTime<Utc> {
    let ms = (value >> 22) + SNOWFLAKE_EPOCH_MS;
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

newtype_snowflake!(ChannelId, "Identifies a channel, thread, or forum post.");
newtype_snowflake!(GuildId, "Identifies a guild (server).");
newtype_snowflake!(MessageId, "Identifies a single message.");
newtype_snowflake!(UserId, "Identifies a user account.");
newtype_snowflake!(RoleId, "Identifies a guild role.");
newtype_snowflake!(TagId, "Identifies a forum tag.");
newtype_snowflake!(ProxyId, "Identifies a send-identity proxy (webhook).");

impl GuildId {
    /// The default role of a guild shares the guild's id.
    #[must_use]
    pub const fn everyone_role(self) -> RoleId {
        RoleId(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_serializes_as_string() {
        let id = ChannelId::new(1_234_567_890_123);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1234567890123\"");
    }

    #[test]
    fn snowflake_deserializes_from_string_or_int() {
        let from_str: MessageId = serde_json::from_str("\"42\"").unwrap();
        let from_int: MessageId = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_int);
        assert!(serde_json::from_str::<MessageId>("\"abc\"").is_err());
    }

    #[test]
    fn snowflake_creation_time() {
        // 175928847299117063 is the example id from the platform docs.
        let id = UserId::new(175_928_847_299_117_063);
        assert_eq!(id.created_at().timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn everyone_role_matches_guild() {
        let guild = GuildId::new(99);
        assert_eq!(guild.everyone_role().get(), 99);
    }

    #[test]
    fn parse_from_str() {
        let id: ChannelId = " 77 ".parse().unwrap();
        assert_eq!(id.get(), 77);
    }
}
