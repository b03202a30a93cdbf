//! 📦 **JSON Array composers**: `[record, record, record]`, with or without room to breathe.
//!
//! 🧠 Knowledge graph:
//! - Both go through serde, so nested strings get escaped properly and nobody hand-rolls commas.
//! - Pretty uses a 4-space `PrettyFormatter`. Two spaces is serde's default. The lake disagrees.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use super::Composer;

const INDENT: &[u8] = b"    ";

/// 🎨 4-space indented JSON array. What a human would want to `cat`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrettyJsonArrayComposer;

impl Composer for PrettyJsonArrayComposer {
    fn compose(&self, records: &[Value]) -> Result<Vec<u8>> {
        // -- 🧮 vibes-based capacity. records are ~150 bytes pretty-printed, give or take a birthday.
        let mut body = Vec::with_capacity(2 + records.len() * 160);
        let mut serializer = serde_json::Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(INDENT));
        records
            .serialize(&mut serializer)
            .context("💀 A record refused to be pretty-printed")?;
        Ok(body)
    }
}

/// 🗜️ Single-line JSON array. What a storage bill would want.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompactJsonArrayComposer;

impl Composer for CompactJsonArrayComposer {
    fn compose(&self, records: &[Value]) -> Result<Vec<u8>> {
        serde_json::to_vec(records).context("💀 A record refused to be serialized")
    }
}
