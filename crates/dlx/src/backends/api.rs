//! 📡 API Backend: the data server, seen from the client side.
//!
//! INT. DATA SERVER, PORT 9090. Two endpoints. `/users` hands out 200 people at a time
//! and tells you where to come back for more. `/content` dumps the whole catalogue
//! on the table and walks away.
//!
//! 🧠 Knowledge graph:
//! - Config co-located: `ApiSourceConfig` lives in `api_source.rs`
//! - Trait impl: `impl Source for ApiSource<E>`, generic over the envelope shape
//! - Enum variants: `SourceBackend::Users(ApiSource<UsersEnvelope>)`, `SourceBackend::Content(...)`
//! - Transport: `reqwest` GET → text → `serde_json` → typed envelope → `Page`
//! - Retries: `crate::retry::with_retry`, transient vs permanent decided here

mod api_source;

pub(crate) use api_source::ApiSource;
pub use api_source::ApiSourceConfig;
