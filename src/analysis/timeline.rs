//! Chord timeline
//!
//! A [`Timeline`] is an ordered partition of `[start, end)` into chord events. Each
//! event lasts until the next one starts; the last lasts until `end`. Every pipeline
//! pass consumes one timeline and returns a new one, so each pass can be tested in
//! isolation.

use std::ops::Range;

use crate::analysis::result::TimelineEntry;
use crate::features::FeatureSet;
use crate::theory::chord::{Chord, Provenance};

/// Minimum spacing between two event starts, in seconds
const MIN_EVENT_GAP: f32 = 1e-4;

/// One chord event; its end is implied by the following event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordEvent {
    /// Start time in seconds
    pub start_time: f32,

    /// Chord with structured root/quality/bass
    pub chord: Chord,

    /// Confidence (0.0-1.0)
    pub confidence: f32,

    /// Theory category relative to the working key
    pub provenance: Provenance,
}

impl ChordEvent {
    /// Create an event; confidence is clamped to `[0, 1]`
    pub fn new(start_time: f32, chord: Chord, confidence: f32, provenance: Provenance) -> Self {
        Self {
            start_time,
            chord,
            confidence: confidence.clamp(0.0, 1.0),
            provenance,
        }
    }
}

/// Ordered, gap-free chord events covering `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    events: Vec<ChordEvent>,
    start: f32,
    end: f32,
}

impl Timeline {
    /// Timeline with no events (nothing confident anywhere)
    pub fn empty(start: f32, end: f32) -> Self {
        Self {
            events: Vec::new(),
            start,
            end: end.max(start),
        }
    }

    /// Build a timeline from loosely ordered segments
    ///
    /// Segments are sorted by start time. Segments starting at or after `end` are
    /// discarded, the first surviving segment is stretched back to `start` so no
    /// leading gap remains, later segments with identical start times replace the
    /// earlier ones, and adjacent events naming the same chord are collapsed with a
    /// duration-weighted confidence.
    pub fn from_segments(start: f32, end: f32, mut segments: Vec<ChordEvent>) -> Self {
        let end = end.max(start);
        segments.retain(|s| s.start_time < end - MIN_EVENT_GAP && s.start_time.is_finite());
        segments.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut events: Vec<ChordEvent> = Vec::with_capacity(segments.len());
        for mut segment in segments {
            segment.start_time = segment.start_time.max(start);
            match events.last_mut() {
                Some(last) if segment.start_time - last.start_time < MIN_EVENT_GAP => {
                    *last = ChordEvent {
                        start_time: last.start_time,
                        ..segment
                    };
                }
                _ => events.push(segment),
            }
        }
        if let Some(first) = events.first_mut() {
            first.start_time = start;
        }

        let mut timeline = Self { events, start, end };
        timeline.collapse();
        timeline
    }

    /// Merge adjacent events that name the same chord
    fn collapse(&mut self) {
        if self.events.len() < 2 {
            return;
        }
        let ends: Vec<f32> = (0..self.events.len()).map(|i| self.end_of(i)).collect();
        let mut merged: Vec<(ChordEvent, f32)> = Vec::with_capacity(self.events.len());
        for (event, end) in self.events.iter().copied().zip(ends) {
            match merged.last_mut() {
                Some((last, last_end)) if last.chord == event.chord => {
                    let d_last = (*last_end - last.start_time).max(0.0);
                    let d_event = (end - event.start_time).max(0.0);
                    let total = d_last + d_event;
                    if total > 0.0 {
                        last.confidence =
                            (last.confidence * d_last + event.confidence * d_event) / total;
                    }
                    *last_end = end;
                }
                _ => merged.push((event, end)),
            }
        }
        self.events = merged.into_iter().map(|(e, _)| e).collect();
    }

    /// Events in time order
    pub fn events(&self) -> &[ChordEvent] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event was emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Start of the covered span in seconds
    pub fn start(&self) -> f32 {
        self.start
    }

    /// End of the covered span in seconds
    pub fn end(&self) -> f32 {
        self.end
    }

    /// End time of event `i`
    pub fn end_of(&self, i: usize) -> f32 {
        self.events
            .get(i + 1)
            .map(|e| e.start_time)
            .unwrap_or(self.end)
    }

    /// Duration of event `i` in seconds
    pub fn duration_of(&self, i: usize) -> f32 {
        (self.end_of(i) - self.events[i].start_time).max(0.0)
    }

    /// Index of the event sounding at time `t`
    pub fn index_at(&self, t: f32) -> Option<usize> {
        if t < self.start || t >= self.end || self.events.is_empty() {
            return None;
        }
        let idx = self.events.partition_point(|e| e.start_time <= t);
        idx.checked_sub(1)
    }

    /// Event sounding at time `t`
    pub fn event_at(&self, t: f32) -> Option<&ChordEvent> {
        self.index_at(t).map(|i| &self.events[i])
    }

    /// Event start times
    pub fn boundaries(&self) -> Vec<f32> {
        self.events.iter().map(|e| e.start_time).collect()
    }

    /// Roots of all events in order
    pub fn roots(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.chord.root).collect()
    }

    /// New timeline with every event passed through `f` (start times are kept)
    pub fn map_events<F>(&self, mut f: F) -> Timeline
    where
        F: FnMut(usize, &ChordEvent) -> ChordEvent,
    {
        let events = self
            .events
            .iter()
            .enumerate()
            .map(|(i, e)| ChordEvent {
                start_time: e.start_time,
                ..f(i, e)
            })
            .collect();
        Timeline::from_segments(self.start, self.end, events)
    }

    /// Frame range covered by event `i`
    pub fn frame_range(&self, i: usize, features: &FeatureSet) -> Range<usize> {
        let start = features.frame_at(self.events[i].start_time);
        let end = features.frame_at(self.end_of(i)).max(start + 1);
        start..end.min(features.len()).max(start)
    }

    /// Render output entries; labels are produced here and nowhere earlier
    pub fn to_entries(&self) -> Vec<TimelineEntry> {
        self.events
            .iter()
            .enumerate()
            .map(|(i, e)| TimelineEntry {
                start_time: e.start_time,
                end_time: self.end_of(i),
                label: e.chord.label(),
                root: e.chord.root,
                quality: e.chord.quality,
                bass: e.chord.bass,
                confidence: e.confidence,
                provenance: e.provenance,
            })
            .collect()
    }

    /// Check the partition invariant: strictly increasing starts, first event at
    /// `start`, last event before `end`
    pub fn is_partition(&self) -> bool {
        if self.events.is_empty() {
            return true;
        }
        let ordered = self
            .events
            .windows(2)
            .all(|w| w[0].start_time < w[1].start_time);
        let anchored = (self.events[0].start_time - self.start).abs() < 1e-6;
        let bounded = self.events.last().map(|e| e.start_time < self.end).unwrap_or(true);
        ordered && anchored && bounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::chord::ChordQuality;

    fn event(t: f32, root: u8, confidence: f32) -> ChordEvent {
        ChordEvent::new(t, Chord::new(root, ChordQuality::Major), confidence, Provenance::Diatonic)
    }

    #[test]
    fn test_from_segments_sorts_and_anchors() {
        let timeline = Timeline::from_segments(
            0.5,
            4.0,
            vec![event(2.0, 7, 0.8), event(1.0, 5, 0.8), event(4.5, 2, 0.9)],
        );
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.events()[0].start_time, 0.5);
        assert_eq!(timeline.roots(), vec![5, 7]);
        assert!(timeline.is_partition());
        assert_eq!(timeline.end_of(1), 4.0);
    }

    #[test]
    fn test_collapse_weights_confidence_by_duration() {
        let timeline = Timeline::from_segments(
            0.0,
            4.0,
            vec![event(0.0, 0, 1.0), event(3.0, 0, 0.0)],
        );
        assert_eq!(timeline.len(), 1);
        assert!((timeline.events()[0].confidence - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_event_at() {
        let timeline = Timeline::from_segments(
            0.0,
            3.0,
            vec![event(0.0, 0, 1.0), event(1.0, 5, 1.0), event(2.0, 7, 1.0)],
        );
        assert_eq!(timeline.event_at(0.0).map(|e| e.chord.root), Some(0));
        assert_eq!(timeline.event_at(1.5).map(|e| e.chord.root), Some(5));
        assert_eq!(timeline.event_at(2.999).map(|e| e.chord.root), Some(7));
        assert!(timeline.event_at(3.0).is_none());
        assert!(timeline.event_at(-0.1).is_none());
    }

    #[test]
    fn test_duplicate_start_keeps_later_segment() {
        let timeline = Timeline::from_segments(0.0, 2.0, vec![event(0.0, 0, 1.0), event(0.0, 9, 0.5)]);
        assert_eq!(timeline.roots(), vec![9]);
    }

    #[test]
    fn test_entries_carry_labels_and_ends() {
        let timeline = Timeline::from_segments(
            0.5,
            3.0,
            vec![
                event(0.5, 9, 0.7),
                ChordEvent::new(1.5, Chord::new(7, ChordQuality::Dominant7).with_bass(Some(11)), 0.6, Provenance::Diatonic),
            ],
        );
        let entries = timeline.to_entries();
        assert_eq!(entries[0].label, "A");
        assert_eq!(entries[0].end_time, 1.5);
        assert_eq!(entries[1].label, "G7/B");
        assert_eq!(entries[1].end_time, 3.0);
    }

    #[test]
    fn test_empty_timeline_is_partition() {
        let timeline = Timeline::from_segments(0.0, 2.0, Vec::new());
        assert!(timeline.is_empty());
        assert!(timeline.is_partition());
        assert!(timeline.event_at(1.0).is_none());
    }
}
