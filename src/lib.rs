//! Coordination core for the StreamHub distributed data hub.
//!
//! Producers append immutable content items to named channels; replication
//! domains mirror those channels between data centers. This crate holds the
//! pieces every node shares: the ordered position model, the time-bucketing
//! policies that roll raw keys into coarser windows, the cluster-wide cursor
//! tracker that records each channel's last processed position, and the
//! validators guarding replication exclusivity and channel configuration.
//!
//! Transport, storage backends, and bootstrap wiring live elsewhere; the
//! coordination store and the replication/channel data-access layers are
//! consumed through the traits defined here.

pub mod channel;
pub mod cursor;
pub mod group;
pub mod position;
pub mod replication;
pub mod store;
pub mod time;

pub use channel::{
    ChannelConfig, ChannelDirectory, ChannelError, ChannelValidator, MAX_DESCRIPTION_BYTES,
    MAX_NAME_BYTES, MAX_TAGS,
};
pub use cursor::{AdvanceOutcome, Backoff, CappedExponential, CursorError, CursorTracker, NoPause};
pub use group::{GroupError, TimedGroup, WindowKeys, EMISSION_SKEW_SECONDS};
pub use position::{ContentKey, ContentPath};
pub use replication::{DomainSource, ReplicationDomain, ReplicationError, ReplicationValidator};
pub use store::{CoordinationStore, MemoryStore, StoreError, Versioned};
pub use time::{stable, ParseError, TimeUnit, STABLE_SECONDS};
