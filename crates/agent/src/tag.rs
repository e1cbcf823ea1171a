//! Streaming tag extraction.
//!
//! The model answers in a loose XML-ish grammar (`<thought>…</thought>`,
//! `<message>…</message>`, `<action_input>…</action_input>`). While a response
//! streams in, one [`TagExtractor`] per tag watches the accumulated text and
//! turns it into start / chunk / end events carrying only newly revealed body
//! text.
//!
//! Each extractor is a small state machine:
//!
//! ```text
//! WaitingOpen ──open seen──▶ Open ──close seen──▶ Closed
//! ```
//!
//! `Closed` is terminal for the phase: a tag never reopens, even if its
//! delimiters recur later in the same response.

use tracing::trace;

use crate::stream_event::{AgentEventKind, AgentStreamEvent, TagKinds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    WaitingOpen,
    /// Byte offset in the accumulated text where the body begins.
    Open {
        body_start: usize,
    },
    Closed,
}

/// Progress of one tag within one phase.
#[derive(Debug, Clone)]
pub struct TagScanState {
    phase: ScanPhase,
    /// Body text already handed out as chunk events.
    emitted: String,
    /// Accumulated length at the previous scan; searches resume near here.
    scan_from: usize,
}

impl TagScanState {
    fn new() -> Self {
        Self {
            phase: ScanPhase::WaitingOpen,
            emitted: String::new(),
            scan_from: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, ScanPhase::Open { .. })
    }

    pub fn has_closed(&self) -> bool {
        self.phase == ScanPhase::Closed
    }

    pub fn emitted(&self) -> &str {
        &self.emitted
    }

    pub fn emitted_len(&self) -> usize {
        self.emitted.len()
    }
}

/// Incremental extractor for a single tag.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    open: String,
    close: String,
    kinds: TagKinds,
    skill_id: Option<String>,
    state: TagScanState,
}

impl TagExtractor {
    pub fn new(open: impl Into<String>, close: impl Into<String>, kinds: TagKinds) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            kinds,
            skill_id: None,
            state: TagScanState::new(),
        }
    }

    /// Extractor for `<name>…</name>`.
    pub fn for_tag(name: &str, kinds: TagKinds) -> Self {
        Self::new(format!("<{name}>"), format!("</{name}>"), kinds)
    }

    /// Stamp every emitted event with a skill correlation id.
    pub fn with_skill_id(mut self, skill_id: impl Into<String>) -> Self {
        self.skill_id = Some(skill_id.into());
        self
    }

    pub fn state(&self) -> &TagScanState {
        &self.state
    }

    /// Offer the newest chunk. `accumulated` must already end with `chunk`.
    ///
    /// Returns the events this chunk produced, in order.
    pub fn feed(&mut self, accumulated: &str, chunk: &str) -> Vec<AgentStreamEvent> {
        debug_assert!(accumulated.ends_with(chunk));
        trace!(open = %self.open, chunk_len = chunk.len(), "Scanning chunk");

        let mut events = Vec::new();

        if self.state.phase == ScanPhase::WaitingOpen {
            let from = resume_point(accumulated, self.state.scan_from, self.open.len(), 0);
            match accumulated[from..].find(&self.open) {
                Some(pos) => {
                    let body_start = from + pos + self.open.len();
                    events.push(self.event(self.kinds.start, ""));
                    self.state.phase = ScanPhase::Open { body_start };
                    self.state.scan_from = body_start;
                }
                None => {
                    self.state.scan_from = accumulated.len();
                    return events;
                }
            }
        }

        if let ScanPhase::Open { body_start } = self.state.phase {
            let from = resume_point(
                accumulated,
                self.state.scan_from,
                self.close.len(),
                body_start,
            );

            match accumulated[from..].find(&self.close) {
                Some(pos) => {
                    let body = &accumulated[body_start..from + pos];
                    self.emit_delta(body, body.len(), &mut events);
                    events.push(self.event(self.kinds.end, ""));
                    self.state.phase = ScanPhase::Closed;
                }
                None => {
                    let body = &accumulated[body_start..];
                    let visible = body.len() - held_back(body, &self.close);
                    self.emit_delta(body, visible, &mut events);
                }
            }
            self.state.scan_from = accumulated.len();
        }

        events
    }

    /// The body, if the tag opened and closed.
    pub fn finish(self) -> Option<String> {
        self.state.has_closed().then_some(self.state.emitted)
    }

    fn emit_delta(&mut self, body: &str, visible: usize, events: &mut Vec<AgentStreamEvent>) {
        let Some(delta) = body.get(self.state.emitted.len()..visible) else {
            return;
        };
        if delta.is_empty() {
            return;
        }
        self.state.emitted.push_str(delta);
        events.push(self.event(self.kinds.chunk, delta));
    }

    fn event(&self, kind: AgentEventKind, message: &str) -> AgentStreamEvent {
        AgentStreamEvent::new(kind, message).with_skill_id(self.skill_id.clone())
    }
}

/// Where to restart a delimiter search: far enough back to catch a delimiter
/// that straddled the previous end of text, never before `floor`.
fn resume_point(text: &str, scan_from: usize, delim_len: usize, floor: usize) -> usize {
    let mut from = scan_from
        .saturating_sub(delim_len.saturating_sub(1))
        .max(floor)
        .min(text.len());
    while from > floor && !text.is_char_boundary(from) {
        from -= 1;
    }
    from
}

/// Length of the longest suffix of `body` that is a proper prefix of `delim`.
fn held_back(body: &str, delim: &str) -> usize {
    (1..delim.len())
        .rev()
        .filter(|&n| n <= body.len() && delim.is_char_boundary(n))
        .find(|&n| body.as_bytes().ends_with(&delim.as_bytes()[..n]))
        .unwrap_or(0)
}

/// First `open…close` body in `text`, trimmed.
pub fn capture_tag<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(text[start..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `chunks` in order, returning every event.
    fn run(extractor: &mut TagExtractor, chunks: &[&str]) -> Vec<AgentStreamEvent> {
        let mut accumulated = String::new();
        let mut events = Vec::new();
        for chunk in chunks {
            accumulated.push_str(chunk);
            events.extend(extractor.feed(&accumulated, chunk));
        }
        events
    }

    fn thought() -> TagExtractor {
        TagExtractor::for_tag("thought", TagKinds::THOUGHT)
    }

    fn kinds(events: &[AgentStreamEvent]) -> Vec<AgentEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    fn body(events: &[AgentStreamEvent]) -> String {
        events
            .iter()
            .filter(|e| e.kind == AgentEventKind::ThoughtChunk)
            .map(|e| e.message.as_str())
            .collect()
    }

    #[test]
    fn open_and_close_in_one_chunk() {
        let mut ex = thought();
        let events = run(&mut ex, &["<thought>hello</thought>"]);
        assert_eq!(
            kinds(&events),
            vec![
                AgentEventKind::ThoughtStart,
                AgentEventKind::ThoughtChunk,
                AgentEventKind::ThoughtEnd
            ]
        );
        assert_eq!(events[1].message, "hello");
        assert!(ex.state().has_closed());
        assert_eq!(ex.finish().as_deref(), Some("hello"));
    }

    #[test]
    fn streams_only_new_text() {
        let mut ex = thought();
        let events = run(&mut ex, &["<thought>I sh", "ould check", " the weather</thought>"]);
        let chunks: Vec<_> = events
            .iter()
            .filter(|e| e.kind == AgentEventKind::ThoughtChunk)
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(chunks, vec!["I sh", "ould check", " the weather"]);
        assert_eq!(events.last().unwrap().kind, AgentEventKind::ThoughtEnd);
    }

    #[test]
    fn nothing_before_open() {
        let mut ex = thought();
        assert!(run(&mut ex, &["some preamble ", "<tho"]).is_empty());
        assert!(!ex.state().is_open());
    }

    #[test]
    fn split_delimiters_are_detected() {
        let mut ex = thought();
        let events = run(&mut ex, &["<tho", "ught>abc</th", "ought> tail"]);
        assert_eq!(body(&events), "abc");
        assert_eq!(events.first().unwrap().kind, AgentEventKind::ThoughtStart);
        assert_eq!(events.last().unwrap().kind, AgentEventKind::ThoughtEnd);
    }

    #[test]
    fn partial_close_is_held_back() {
        let mut ex = thought();
        let mut acc = String::from("<thought>abc</");
        let first = ex.feed(&acc, "<thought>abc</");
        assert_eq!(body(&first), "abc");
        assert_eq!(ex.state().emitted_len(), 3);

        acc.push_str("b>");
        let second = ex.feed(&acc, "b>");
        // "</b>" turned out not to be the close delimiter.
        assert_eq!(body(&second), "</b>");
        assert_eq!(ex.state().emitted(), "abc</b>");
    }

    #[test]
    fn never_closed_tag_has_no_end() {
        let mut ex = thought();
        let events = run(&mut ex, &["<thought>still ", "thinking"]);
        assert!(!events.iter().any(|e| e.kind == AgentEventKind::ThoughtEnd));
        assert!(ex.state().is_open());
        assert_eq!(ex.state().emitted(), "still thinking");
        assert_eq!(ex.finish(), None);
    }

    #[test]
    fn closed_tag_never_reopens() {
        let mut ex = thought();
        let events = run(
            &mut ex,
            &["<thought>one</thought>", " <thought>two</thought>"],
        );
        assert_eq!(body(&events), "one");
        let starts = events
            .iter()
            .filter(|e| e.kind == AgentEventKind::ThoughtStart)
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn empty_body_has_no_chunk() {
        let mut ex = thought();
        let events = run(&mut ex, &["<thought></thought>"]);
        assert_eq!(
            kinds(&events),
            vec![AgentEventKind::ThoughtStart, AgentEventKind::ThoughtEnd]
        );
        assert_eq!(ex.finish().as_deref(), Some(""));
    }

    #[test]
    fn every_split_point_gives_the_same_body() {
        let text = "x <thought>héllo <b>wörld</b> ✓</thought> <message>hi</message>";
        let boundaries: Vec<usize> = (0..=text.len())
            .filter(|&i| text.is_char_boundary(i))
            .collect();

        for &a in &boundaries {
            for &b in boundaries.iter().filter(|&&b| b >= a) {
                let chunks = [&text[..a], &text[a..b], &text[b..]];
                let mut ex = thought();
                let events = run(&mut ex, &chunks);
                assert_eq!(body(&events), "héllo <b>wörld</b> ✓", "split at {a},{b}");
                assert_eq!(events.first().unwrap().kind, AgentEventKind::ThoughtStart);
                assert_eq!(events.last().unwrap().kind, AgentEventKind::ThoughtEnd);
                assert_eq!(events.len(), kinds(&events).len());
            }
        }
    }

    #[test]
    fn char_by_char_stream() {
        let text = "<message>a<b</message>";
        let mut ex = TagExtractor::for_tag("message", TagKinds::MESSAGE);
        let mut acc = String::new();
        let mut collected = String::new();
        for ch in text.chars() {
            let chunk = ch.to_string();
            acc.push_str(&chunk);
            for e in ex.feed(&acc, &chunk) {
                if e.kind == AgentEventKind::MessageChunk {
                    collected.push_str(&e.message);
                }
            }
        }
        assert_eq!(collected, "a<b");
        assert!(ex.state().has_closed());
    }

    #[test]
    fn independent_extractors_share_a_stream() {
        let chunks = ["<thought>plan</thou", "ght><message>Hel", "lo</message>"];
        let mut t = thought();
        let mut m = TagExtractor::for_tag("message", TagKinds::MESSAGE);
        let mut acc = String::new();
        let mut events = Vec::new();
        for chunk in chunks {
            acc.push_str(chunk);
            events.extend(t.feed(&acc, chunk));
            events.extend(m.feed(&acc, chunk));
        }
        assert_eq!(t.finish().as_deref(), Some("plan"));
        assert_eq!(m.finish().as_deref(), Some("Hello"));
        assert_eq!(events.last().unwrap().kind, AgentEventKind::MessageEnd);
    }

    #[test]
    fn skill_id_is_stamped() {
        let mut ex = TagExtractor::for_tag("action_input", TagKinds::SKILL).with_skill_id("s-1");
        let events = run(&mut ex, &["<action_input>{\"a\":1}</action_input>"]);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.skill_id.as_deref() == Some("s-1")));
    }

    #[test]
    fn capture_first_occurrence_trimmed() {
        let text = "<action>  get_weather \n</action> <action>other</action>";
        assert_eq!(capture_tag(text, "<action>", "</action>"), Some("get_weather"));
        assert_eq!(capture_tag("<action>open", "<action>", "</action>"), None);
        assert_eq!(capture_tag("none", "<action>", "</action>"), None);
    }

    #[test]
    fn held_back_suffixes() {
        assert_eq!(held_back("abc</th", "</thought>"), 4);
        assert_eq!(held_back("abc<", "</thought>"), 1);
        assert_eq!(held_back("abc", "</thought>"), 0);
        assert_eq!(held_back("", "</thought>"), 0);
    }
}
