//! Typed UUID wrapper, parameterized by the entity it identifies and by a
//! version marker so call sites can tell a time-ordered primary-key id from
//! a purely random one at a glance.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use uuid::Uuid;

/// Version marker: ids minted with `Id::new` are UUIDv7 (time-ordered,
/// the right default for primary keys). `V4` is available for callers that
/// need an opaque, non-time-ordered id.
pub struct V7;
pub struct V4;

pub struct Id<T, V = V7> {
    value: Uuid,
    _entity: PhantomData<T>,
    _version: PhantomData<V>,
}

impl<T> Id<T, V7> {
    pub fn new() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }
}

impl<T> Id<T, V4> {
    pub fn new_v4() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }
}

impl<T, V> Id<T, V> {
    pub fn from_uuid(value: Uuid) -> Self {
        Self {
            value,
            _entity: PhantomData,
            _version: PhantomData,
        }
    }

    pub fn into_uuid(self) -> Uuid {
        self.value
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }
}

impl<T> Default for Id<T, V7> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> Clone for Id<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T, V> Copy for Id<T, V> {}

impl<T, V> fmt::Debug for Id<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T, V> fmt::Display for Id<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T, V> PartialEq for Id<T, V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T, V> Eq for Id<T, V> {}

impl<T, V> PartialOrd for Id<T, V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T, V> Ord for Id<T, V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T, V> std::hash::Hash for Id<T, V> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

impl<T, V> AsRef<Uuid> for Id<T, V> {
    fn as_ref(&self) -> &Uuid {
        &self.value
    }
}

impl<T, V> From<Uuid> for Id<T, V> {
    fn from(value: Uuid) -> Self {
        Self::from_uuid(value)
    }
}

impl<T, V> FromStr for Id<T, V> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_uuid(Uuid::parse_str(s)?))
    }
}

impl<T, V> Serialize for Id<T, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T, V> Deserialize<'de> for Id<T, V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from_uuid(Uuid::deserialize(deserializer)?))
    }
}

impl<T, V> Type<Postgres> for Id<T, V> {
    fn type_info() -> PgTypeInfo {
        <Uuid as Type<Postgres>>::type_info()
    }
}

impl<'r, T, V> Decode<'r, Postgres> for Id<T, V> {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self::from_uuid(<Uuid as Decode<Postgres>>::decode(value)?))
    }
}

impl<'q, T, V> Encode<'q, Postgres> for Id<T, V> {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Uuid as Encode<Postgres>>::encode_by_ref(&self.value, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Job;

    #[test]
    fn new_ids_are_time_ordered() {
        let a: Id<Job> = Id::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b: Id<Job> = Id::new();
        assert!(a < b);
    }

    #[test]
    fn roundtrips_through_string() {
        let a: Id<Job> = Id::new();
        let s = a.to_string();
        let b: Id<Job> = s.parse().unwrap();
        assert_eq!(a, b);
    }
}
