//! 🚶 Passthrough Transform: the "I changed nothing and took credit" of data transforms 🎭
//!
//! "What did you do yesterday?" "I passed records through unchanged."
//! "Any blockers?" "No. I am the blocker. I am become passthrough, destroyer of nothing."
//!
//! The default. Records land in the lake exactly as the data server described them. 🦆

use anyhow::Result;
use serde_json::Value;

use super::Transform;

/// 🚶 Identity. When you want your data moved, not understood.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Passthrough;

impl Transform for Passthrough {
    #[inline]
    fn transform(&self, record: Value) -> Result<Value> {
        // -- 📬 Return to sender. No modification. No judgment. Just vibes.
        Ok(record)
    }
}
