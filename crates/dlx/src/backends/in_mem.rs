//! # Previously, on dlx...
//!
//! 🎬 The data server was down. The lake was down. The demo was in ten minutes.
//! Someone needed records that exist without a network and a bucket that exists
//! without a disk. That someone was this module.
//!
//! `in_mem` provides an in-memory [`Source`](super::Source) that makes up plausible
//! users and content on the spot, and an in-memory [`Sink`](super::Sink) that keeps
//! every object it is handed behind an `Arc<Mutex<...>>` so tests can look inside.
//!
//! ⚠️ This is NOT for production. If you're deploying this to prod, please also deploy a therapist.
//! ✅ No network calls. No disk I/O. Just vibes and heap memory. 🦆

mod in_mem_sink;
mod in_mem_source;

pub(crate) use in_mem_sink::InMemorySink;
pub(crate) use in_mem_source::InMemorySource;
pub use in_mem_source::InMemorySourceConfig;
