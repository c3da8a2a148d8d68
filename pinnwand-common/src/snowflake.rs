//! Snowflake IDs: 42 bits of milliseconds since the epoch, 5 bits of worker
//! ID, 5 bits of process ID and a 12 bit per-process increment.

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u64 = 42;
pub const WORKER_ID_BITS: u64 = 5;
pub const PROCESS_ID_BITS: u64 = 5;
pub const INCREMENT_BITS: u64 = 12;

pub const TIMESTAMP_SHIFT: u64 = WORKER_ID_BITS + PROCESS_ID_BITS + INCREMENT_BITS;
pub const WORKER_ID_SHIFT: u64 = PROCESS_ID_BITS + INCREMENT_BITS;
pub const PROCESS_ID_SHIFT: u64 = INCREMENT_BITS;

/// The instant a snowflake timestamp of zero refers to.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part out of range: {0}")]
pub struct PartOutOfRangeError(pub u64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum TimestampError {
    #[error("Time is before the snowflake epoch.")]
    BeforeEpoch,
    #[error("Timestamp does not fit in {TIMESTAMP_BITS} bits.")]
    TooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WorkerId(u8);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ProcessId(u8);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Increment(u16);

impl WorkerId {
    #[must_use]
    pub fn new(id: u8) -> Option<Self> {
        (u64::from(id) < 1 << WORKER_ID_BITS).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl ProcessId {
    #[must_use]
    pub fn new(id: u8) -> Option<Self> {
        (u64::from(id) < 1 << PROCESS_ID_BITS).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Increment {
    #[must_use]
    pub fn new(increment: u16) -> Option<Self> {
        (u64::from(increment) < 1 << INCREMENT_BITS).then_some(Self(increment))
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(((u64::from(self.0) + 1) & ((1 << INCREMENT_BITS) - 1)) as u16)
    }
}

impl TryFrom<u8> for WorkerId {
    type Error = PartOutOfRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PartOutOfRangeError(value.into()))
    }
}

impl TryFrom<u8> for ProcessId {
    type Error = PartOutOfRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PartOutOfRangeError(value.into()))
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(((self.0 >> WORKER_ID_SHIFT) & ((1 << WORKER_ID_BITS) - 1)) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(((self.0 >> PROCESS_ID_SHIFT) & ((1 << PROCESS_ID_BITS) - 1)) as u8)
    }

    #[must_use]
    pub fn increment(self) -> Increment {
        #[allow(clippy::cast_possible_truncation)]
        Increment((self.0 & ((1 << INCREMENT_BITS) - 1)) as u16)
    }
}

impl<SnowflakeEpoch: Epoch> Snowflake<SnowflakeEpoch> {
    pub fn timestamp_for(time: UtcDateTime) -> Result<u64, TimestampError> {
        let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        if millis < 0 {
            return Err(TimestampError::BeforeEpoch);
        }
        let millis = u64::try_from(millis).map_err(|_| TimestampError::TooLarge)?;
        if millis < 1 << TIMESTAMP_BITS {
            Ok(millis)
        } else {
            Err(TimestampError::TooLarge)
        }
    }

    pub fn from_parts(
        time: UtcDateTime,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: Increment,
    ) -> Result<Self, TimestampError> {
        let timestamp = Self::timestamp_for(time)?;

        Ok(Self::new(
            timestamp << TIMESTAMP_SHIFT
                | u64::from(worker_id.get()) << WORKER_ID_SHIFT
                | u64::from(process_id.get()) << PROCESS_ID_SHIFT
                | u64::from(increment.get()),
        ))
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        SnowflakeEpoch::EPOCH_TIME
            + Duration::milliseconds(
                self.timestamp_millis()
                    .try_into()
                    .unwrap_or(i64::MAX),
            )
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: Increment,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch: Epoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: Increment::default(),
            phantom_data: PhantomData,
        }
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, TimestampError> {
        let increment = self.next_increment;
        self.next_increment = increment.next();

        Snowflake::from_parts(time, self.worker_id, self.process_id, increment)
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, TimestampError> {
        self.generate_at(UtcDateTime::now())
    }
}
