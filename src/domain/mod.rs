//! Core domain types for the participation platform.
//!
//! This module contains pure domain types with no persistence dependencies:
//! - Users and categories
//! - Events and their publication state
//! - Participation request typestate machine

/// Defines an integer identifier newtype matching a `BIGSERIAL` primary key.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                $name(id)
            }
        }

        impl std::ops::Deref for $name {
            type Target = i64;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub mod category;
pub mod event;
pub mod request;
pub mod user;

pub use category::{Category, CategoryId, NewCategory, Page};
pub use event::{
    Event, EventId, EventState, EventStateAction, EventUpdate, NewEvent, ReviewAction,
};
pub use request::{
    AnyRequest, Canceled, Confirmed, NewRequest, ParticipationRequest, Pending, Rejected,
    RequestData, RequestId, RequestState, RequestStatus,
};
pub use user::{NewUser, User, UserId};

/// Timestamp layout shared by the JSON API and the statistics service.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serde adapter for `DateTime<Utc>` rendered as `yyyy-MM-dd HH:mm:ss`.
pub mod datetime_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_TIME_FORMAT;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(DATE_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
