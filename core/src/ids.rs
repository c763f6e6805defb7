//! Platform identifiers.
//!
//! Every entity on the chat platform is addressed by a 64-bit snowflake. The
//! persisted registry stores them as decimal strings (that is how the platform
//! hands them out), so the newtypes serialize as strings and accept either a
//! string or a bare number when reading older files.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw snowflake value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw snowflake value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(SnowflakeVisitor).map(Self)
            }
        }
    };
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a decimal string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom("snowflake must not be negative"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.trim()
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

snowflake!(
    /// A user account.
    UserId
);
snowflake!(
    /// A channel or thread. Ticket identifiers are thread channel ids.
    ChannelId
);
snowflake!(
    /// A community (guild).
    GuildId
);
snowflake!(
    /// A role inside a guild.
    RoleId
);
snowflake!(
    /// A message inside a channel.
    MessageId
);

impl UserId {
    /// Render as a platform mention (`<@id>`).
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    /// Render as a channel link (`<#id>`).
    #[must_use]
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

impl RoleId {
    /// Render as a role ping (`<@&id>`).
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@&{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    #[test]
    fn serializes_as_decimal_string() {
        let id = UserId::new(123_456_789_012_345_678);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"123456789012345678\"");
    }

    #[test]
    fn accepts_string_or_number() {
        let from_str: ChannelId = serde_json::from_str("\"42\"").unwrap();
        let from_num: ChannelId = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn works_as_map_key() {
        let mut map = HashMap::new();
        map.insert(UserId::new(7), 3_u32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "{\"7\":3}");
        let back: HashMap<UserId, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&UserId::new(7)), Some(&3));
    }

    #[test]
    fn mentions() {
        assert_eq!(UserId::new(5).mention(), "<@5>");
        assert_eq!(RoleId::new(9).mention(), "<@&9>");
        assert_eq!(ChannelId::new(1).mention(), "<#1>");
    }
}
