// ── Scrollable log view ──
//
// Pairs the ring buffer with a pixel viewport so auto-scroll can be
// decided without a rendering surface. Geometry follows the usual
// scroll-container model: content height is `lines * line_height`,
// and the view is at the bottom when `scroll_top` equals
// `content_height - client_height`.

use std::ops::Range;
use std::sync::Arc;

use super::buffer::LogBuffer;
use crate::model::LogEntry;

pub const DEFAULT_LINE_HEIGHT_PX: f64 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub line_height: f64,
    pub client_height: f64,
    pub scroll_top: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT_PX,
            client_height: 0.0,
            scroll_top: 0.0,
        }
    }
}

/// What one append did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The oldest line was dropped to make room.
    pub evicted: bool,
    /// The view was moved to the new bottom.
    pub followed: bool,
}

#[derive(Debug, Clone)]
pub struct LogView {
    buffer: LogBuffer,
    viewport: Viewport,
    threshold_px: f64,
}

impl LogView {
    pub fn new(capacity: usize, threshold_px: f64) -> Self {
        Self {
            buffer: LogBuffer::new(capacity),
            viewport: Viewport::default(),
            threshold_px: threshold_px.max(0.0),
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn threshold_px(&self) -> f64 {
        self.threshold_px
    }

    // ── Geometry ─────────────────────────────────────────────────────

    pub fn content_height(&self) -> f64 {
        lines_to_px(self.buffer.len(), self.viewport.line_height)
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.viewport.client_height).max(0.0)
    }

    /// Whether the viewport is within the threshold of the bottom.
    pub fn is_near_bottom(&self) -> bool {
        self.max_scroll_top() - self.viewport.scroll_top <= self.threshold_px
    }

    /// Index range of the lines currently under the viewport.
    #[allow(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn visible_range(&self) -> Range<usize> {
        let len = self.buffer.len();
        let lh = self.viewport.line_height;
        if len == 0 || lh <= 0.0 {
            return 0..0;
        }
        let first = ((self.viewport.scroll_top / lh).floor() as usize).min(len);
        let count = (self.viewport.client_height / lh).ceil() as usize + 1;
        first..(first + count).min(len)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Append one line.
    ///
    /// The view follows the tail only if it was near the bottom before
    /// the append. Otherwise the position is left alone, except that an
    /// eviction shifts it up by one line so the same lines stay in view.
    pub fn append(&mut self, entry: Arc<LogEntry>) -> AppendOutcome {
        let was_near_bottom = self.is_near_bottom();
        let evicted = self.buffer.push(entry).is_some();

        if was_near_bottom {
            self.viewport.scroll_top = self.max_scroll_top();
        } else if evicted {
            self.viewport.scroll_top = (self.viewport.scroll_top - self.viewport.line_height).max(0.0);
        }

        AppendOutcome {
            evicted,
            followed: was_near_bottom,
        }
    }

    /// Record a viewport change from the rendering surface.
    pub fn set_viewport(&mut self, client_height: f64, scroll_top: f64) {
        self.viewport.client_height = client_height.max(0.0);
        self.viewport.scroll_top = scroll_top.clamp(0.0, self.max_scroll_top());
    }

    pub fn set_line_height(&mut self, line_height: f64) {
        if line_height > 0.0 {
            self.viewport.line_height = line_height;
            self.viewport.scroll_top = self.viewport.scroll_top.min(self.max_scroll_top());
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.viewport.scroll_top = self.max_scroll_top();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.viewport.scroll_top = 0.0;
    }
}

fn lines_to_px(lines: usize, line_height: f64) -> f64 {
    f64::from(u32::try_from(lines).unwrap_or(u32::MAX)) * line_height
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn entry(n: usize) -> Arc<LogEntry> {
        Arc::new(LogEntry {
            timestamp: None,
            source: "s1".into(),
            stream: Some("stdout".into()),
            content: format!("line {n}"),
        })
    }

    /// 10 lines of 10 px in a 50 px window.
    fn filled_view(capacity: usize) -> LogView {
        let mut view = LogView::new(capacity, 50.0);
        view.set_line_height(10.0);
        view.set_viewport(50.0, 0.0);
        for n in 0..10 {
            view.append(entry(n));
        }
        view
    }

    #[test]
    fn follows_tail_when_at_bottom() {
        let mut view = filled_view(100);
        assert_eq!(view.viewport().scroll_top, 50.0);

        let outcome = view.append(entry(10));
        assert!(outcome.followed);
        assert_eq!(view.viewport().scroll_top, 60.0);
    }

    #[test]
    fn follows_tail_within_threshold() {
        let mut view = filled_view(100);
        view.set_viewport(50.0, 10.0); // 40 px above the bottom
        assert!(view.is_near_bottom());

        view.append(entry(10));
        assert_eq!(view.viewport().scroll_top, 60.0);
    }

    #[test]
    fn leaves_position_alone_when_scrolled_up() {
        let mut view = LogView::new(100, 50.0);
        view.set_line_height(10.0);
        for n in 0..30 {
            view.append(entry(n));
        }
        view.set_viewport(50.0, 100.0); // 150 px above the bottom

        let outcome = view.append(entry(30));
        assert!(!outcome.followed);
        assert_eq!(view.viewport().scroll_top, 100.0);
    }

    #[test]
    fn eviction_while_scrolled_up_keeps_lines_in_view() {
        let mut view = LogView::new(20, 50.0);
        view.set_line_height(10.0);
        for n in 0..20 {
            view.append(entry(n));
        }
        view.set_viewport(50.0, 40.0);
        let first_visible = view.visible_range().start;
        let before = view.buffer().get(first_visible).unwrap().clone();

        let outcome = view.append(entry(20));
        assert!(outcome.evicted);
        assert!(!outcome.followed);
        assert_eq!(view.viewport().scroll_top, 30.0);
        let after = view.buffer().get(view.visible_range().start).cloned();
        assert_eq!(after, Some(before));
    }

    #[test]
    fn empty_view_is_at_bottom() {
        let view = LogView::new(10, 50.0);
        assert!(view.is_near_bottom());
        assert_eq!(view.visible_range(), 0..0);
    }

    #[test]
    fn clear_resets_scroll() {
        let mut view = filled_view(100);
        view.clear();
        assert!(view.buffer().is_empty());
        assert_eq!(view.viewport().scroll_top, 0.0);
    }
}
