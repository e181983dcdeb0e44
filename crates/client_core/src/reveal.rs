//! Progressive disclosure of a ranked list, one entry at a time.
//!
//! The controller is pure state: operations that would scroll or touch the browser
//! history return a value describing the side effect, and the view layer performs it.

use std::time::Duration;

use url::Url;

/// Delay before scrolling, so the newly rendered entry has been laid out.
pub const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(100);

const ANCHOR_PREFIX: &str = "rank-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    pub rank: u32,
    pub anchor: String,
    pub delay: Duration,
    pub block: ScrollBlock,
    pub smooth: bool,
}

impl ScrollRequest {
    fn to_rank(rank: u32, block: ScrollBlock) -> Self {
        Self {
            rank,
            anchor: rank_anchor(rank),
            delay: SCROLL_SETTLE_DELAY,
            block,
            smooth: true,
        }
    }
}

/// A fragment change applied with history *replace*, never push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentReplace {
    pub fragment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealState {
    pub revealed_count: usize,
    pub show_all: bool,
}

impl Default for RevealState {
    fn default() -> Self {
        Self {
            revealed_count: 1,
            show_all: false,
        }
    }
}

pub fn rank_anchor(rank: u32) -> String {
    format!("{ANCHOR_PREFIX}{rank}")
}

pub fn rank_fragment(rank: u32) -> String {
    format!("#{}", rank_anchor(rank))
}

/// Parses `#rank-{n}` (leading `#` optional). Anything else is `None`.
pub fn parse_rank_fragment(fragment: &str) -> Option<u32> {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    let digits = raw.strip_prefix(ANCHOR_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealController {
    entry_count: usize,
    state: RevealState,
}

impl RevealController {
    pub fn new(entry_count: usize) -> Self {
        Self {
            entry_count,
            state: RevealState::default(),
        }
    }

    /// Initial state for a page load, honouring a `#rank-{n}` deep link when it is in range.
    pub fn with_fragment(
        entry_count: usize,
        fragment: Option<&str>,
    ) -> (Self, Option<ScrollRequest>) {
        let mut controller = Self::new(entry_count);
        let scroll = fragment.and_then(|f| controller.apply_deep_link(f));
        (controller, scroll)
    }

    pub fn from_url(entry_count: usize, url: &Url) -> (Self, Option<ScrollRequest>) {
        Self::with_fragment(entry_count, url.fragment())
    }

    /// Jumps to the linked rank in show-all mode. Malformed or out-of-range links leave
    /// the state untouched.
    pub fn apply_deep_link(&mut self, fragment: &str) -> Option<ScrollRequest> {
        let rank = parse_rank_fragment(fragment)?;
        if rank == 0 || rank as usize > self.entry_count {
            return None;
        }
        self.state.revealed_count = rank as usize;
        self.state.show_all = true;
        Some(ScrollRequest::to_rank(rank, ScrollBlock::Start))
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn revealed_count(&self) -> usize {
        self.state.revealed_count
    }

    pub fn is_show_all(&self) -> bool {
        self.state.show_all
    }

    pub fn can_reveal_next(&self) -> bool {
        self.state.revealed_count < self.entry_count
    }

    pub fn reveal_next(&mut self) -> Option<ScrollRequest> {
        if !self.can_reveal_next() {
            return None;
        }
        self.state.revealed_count += 1;
        Some(ScrollRequest::to_rank(
            self.state.revealed_count as u32,
            ScrollBlock::Center,
        ))
    }

    pub fn toggle_show_all(&mut self) {
        self.state.show_all = !self.state.show_all;
        self.state.revealed_count = if self.state.show_all {
            self.entry_count.max(1)
        } else {
            1
        };
    }

    /// Entries currently on screen. `entries` must already be in rank order.
    pub fn visible<'a, T>(&self, entries: &'a [T]) -> &'a [T] {
        if self.state.show_all {
            entries
        } else {
            &entries[..self.state.revealed_count.min(entries.len())]
        }
    }

    pub fn progress(&self) -> f64 {
        if self.entry_count == 0 {
            return 0.0;
        }
        (self.state.revealed_count as f64 / self.entry_count as f64).clamp(0.0, 1.0)
    }

    pub fn select_entry(&self, rank: u32) -> FragmentReplace {
        FragmentReplace {
            fragment: rank_fragment(rank),
        }
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} of {} revealed",
            self.state.revealed_count.min(self.entry_count),
            self.entry_count
        )
    }

    /// Label for the reveal button, or `None` when the button is hidden.
    pub fn reveal_button_label(&self) -> Option<String> {
        if self.state.show_all || !self.can_reveal_next() {
            return None;
        }
        Some(format!("Reveal #{}", self.state.revealed_count + 1))
    }
}
