// Diarization merge: overlap-based speaker assignment
//
// Assigns a speaker to every transcript segment from the diarization turns
// of the same chunk. Each segment is labeled independently; segments are
// never split or merged to match turn boundaries.

use std::collections::HashMap;

use crate::stages::{DiarizationTurn, Segment};

/// Label assigned when no diarization turn overlaps a segment
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

/// Assign a speaker label to each segment by majority vote over overlapping
/// turns.
///
/// A turn overlaps a segment only when `max(starts) < min(ends)` holds
/// strictly, so zero-length and boundary-touching turns never count. Ties
/// between equally frequent labels go to the label of the earliest-starting
/// overlapping turn, then to the lexicographically smaller label, so the
/// vote is a total order and never depends on map iteration.
pub fn assign_speakers(segments: &mut [Segment], turns: &[DiarizationTurn]) {
    for segment in segments.iter_mut() {
        let overlapping: Vec<&DiarizationTurn> = turns
            .iter()
            .filter(|turn| segment.start.max(turn.start) < segment.end.min(turn.end))
            .collect();

        segment.speaker = Some(majority_label(&overlapping));
    }
}

fn majority_label(overlapping: &[&DiarizationTurn]) -> String {
    if overlapping.is_empty() {
        return UNKNOWN_SPEAKER.to_string();
    }

    // Per label: occurrence count and earliest turn start among the
    // overlapping turns carrying it.
    let mut votes: HashMap<&str, (usize, f64)> = HashMap::new();
    for turn in overlapping {
        let entry = votes
            .entry(turn.speaker.as_str())
            .or_insert((0, turn.start));
        entry.0 += 1;
        if turn.start < entry.1 {
            entry.1 = turn.start;
        }
    }

    let (label, _) = votes
        .into_iter()
        .max_by(|(label_a, (count_a, start_a)), (label_b, (count_b, start_b))| {
            count_a
                .cmp(count_b)
                .then_with(|| start_b.partial_cmp(start_a).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| label_b.cmp(label_a))
        })
        .expect("non-empty vote map");

    label.to_string()
}
