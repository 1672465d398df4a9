// ── Log stream handling ──
//
// Ring buffer, scroll-aware view and the stream consumer that feeds them.

mod buffer;
mod consumer;
mod view;

pub use buffer::LogBuffer;
pub use consumer::{LogStreamConsumer, StreamState};
pub use view::{AppendOutcome, DEFAULT_LINE_HEIGHT_PX, LogView, Viewport};
