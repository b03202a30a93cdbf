use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backends::Sink;

/// 📦 A sink that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// Every `(key, body)` it is handed goes into a shared Vec wrapped in a Mutex wrapped
/// in an Arc. Clone-able because tests need to peek inside after handing the sink off
/// to the pipeline. The `Arc` means everyone shares the same Vec.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    /// 🔒 The evidence locker. One entry per object, in upload order.
    pub(crate) received: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    /// 📡 Lock, push, done. Like a fax machine but for bytes.
    async fn put_object(&mut self, key: &str, body: Vec<u8>) -> Result<()> {
        // -- 🔒 The Mutex is load-bearing. Do not remove. I know it looks optional. It isn't.
        self.received.lock().await.push((key.to_string(), body));
        Ok(())
    }

    /// 🗑️ Closes the sink with all the ceremony of closing a browser tab.
    async fn close(&mut self) -> Result<()> {
        debug!("🧠 in-memory sink is holding {} object(s)", self.received.lock().await.len());
        Ok(())
    }
}
