pub mod entry;
pub mod layer;
pub mod sink;
pub use entry::LogEntry;
pub use layer::{RecordLayer, RecordService, MAX_BODY_BYTES};
pub use sink::{LogSink, MemoryLogSink};
