//! 📂 File Backend: the lake, but it's a folder on your laptop.
//!
//! Same keys, same bodies, no MinIO. For the airplane, for the demo that has to
//! work without Docker, and for whoever wants to `cat` the output before it goes
//! anywhere near a bucket.
//!
//! 🚰 SinkWorker → key + body → `{root_dir}/{key}` on disk
//! 💀 Disk full → your problem now

mod file_sink;

pub(crate) use file_sink::FileSink;
pub use file_sink::FileSinkConfig;
