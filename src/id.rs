//! Newtypes around Discord IDs.
//!
//! Lavalink sends and expects snowflakes as JSON strings, so every ID here
//! serialises as a string and accepts either a string or a number on input.

use serde::{
    de::{Error as DeError, Unexpected, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

macro_rules! impl_id {
    ($Id:ident, $name:literal) => {
        impl $Id {
            /// Returns the u64 representation of this Id.
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl Display for $Id {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $Id {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$Id> for u64 {
            fn from(id: $Id) -> Self {
                id.0
            }
        }

        impl Serialize for $Id {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $Id {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer
                    .deserialize_any(SnowflakeVisitor($name))
                    .map(Self)
            }
        }
    };
}

/// ID of a Discord voice/text channel.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ChannelId(pub u64);

/// ID of a Discord guild (colloquially, "server").
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GuildId(pub u64);

/// ID of a Discord user.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct UserId(pub u64);

impl_id! {ChannelId, "a channel id"}
impl_id! {GuildId, "a guild id"}
impl_id! {UserId, "a user id"}

struct SnowflakeVisitor(&'static str);

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} as a string or integer", self.0)
    }

    fn visit_u64<E: DeError>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: DeError>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: DeError>(self, v: &str) -> Result<u64, E> {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_travel_as_strings() {
        let out = serde_json::to_string(&GuildId(81384788765712384)).unwrap();
        assert_eq!(out, "\"81384788765712384\"");
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        let a: UserId = serde_json::from_str("\"42\"").unwrap();
        let b: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(a, b);

        assert!(serde_json::from_str::<ChannelId>("\"not a number\"").is_err());
        assert!(serde_json::from_str::<ChannelId>("-1").is_err());
    }
}
