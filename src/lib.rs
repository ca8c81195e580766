//! Day-granular retrieval, caching and decoding of spacecraft time-series
//! archives. Requests for a `(probe, instrument, interval)` tuple are split
//! into calendar days; each day is served from the local cache or fetched,
//! unpacked and decoded, then the per-day frames are merged into one
//! time-sorted result clipped to the requested interval.

pub mod cluster;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod interval;
pub mod keymap;
pub mod messenger;
pub mod mission;
pub mod session;
pub mod store;
