//! 🎬 *[the part buffer is full. the sink hungers.]*
//! *["Compose me," whispers the payload. "Make me a JSON array."]*
//!
//! 🎼 The Composers module: turning a buffer of records into the bytes of one object.
//!
//! 🧠 Knowledge graph:
//! - **Pretty** (`PrettyJsonArrayComposer`): 4-space indented array, the layout the lake has always had.
//! - **Compact** (`CompactJsonArrayComposer`): one line, no whitespace, for people who pay for storage.
//! - Resolution: from `CommonSinkConfig::pretty`, same trait → impls → enum pattern as backends.
//!
//! ```text
//! SinkWorker:
//!   page → transform each record → part buffer Vec<Value> → composer.compose(&buffer) → sink.put_object(key, body)
//! ```
//!
//! 🦆 (the duck composes... symphonies? payloads? both? the duck has no comment.)

use anyhow::Result;
use serde_json::Value;

use crate::backends::CommonSinkConfig;

mod json_array;

pub(crate) use json_array::{CompactJsonArrayComposer, PrettyJsonArrayComposer};

/// 🎼 Renders a slice of records into the body of one object.
///
/// # Contract 📜
/// - Output is a single valid JSON array, in input order.
/// - An empty slice renders as `[]`. Empty collections still get an object.
pub(crate) trait Composer: std::fmt::Debug {
    fn compose(&self, records: &[Value]) -> Result<Vec<u8>>;
}

/// 🎭 The polymorphic composer. The enum is a formality. The dispatch is basically free.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ComposerBackend {
    Pretty(PrettyJsonArrayComposer),
    Compact(CompactJsonArrayComposer),
}

impl ComposerBackend {
    /// 🔧 Pretty unless the sink config says otherwise.
    pub(crate) fn from_sink_config(common_config: &CommonSinkConfig) -> Self {
        if common_config.pretty {
            Self::Pretty(PrettyJsonArrayComposer)
        } else {
            Self::Compact(CompactJsonArrayComposer)
        }
    }
}

impl Composer for ComposerBackend {
    #[inline]
    fn compose(&self, records: &[Value]) -> Result<Vec<u8>> {
        match self {
            Self::Pretty(c) => c.compose(records),
            Self::Compact(c) => c.compose(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_config_decides_how_much_whitespace_we_can_afford() {
        let pretty = CommonSinkConfig::default();
        assert!(matches!(ComposerBackend::from_sink_config(&pretty), ComposerBackend::Pretty(_)));

        let stingy = CommonSinkConfig {
            pretty: false,
            ..CommonSinkConfig::default()
        };
        assert!(matches!(ComposerBackend::from_sink_config(&stingy), ComposerBackend::Compact(_)));
    }
}
