// Transcript assembly
//
// Merges every chunk's globally time-shifted segments into the final
// conversation transcript: stable-sorted by start time, speakers renumbered
// in first-encounter order, each line independently language-tagged from its
// own text.

use std::collections::HashMap;

use crate::stages::Segment;

use super::merge::UNKNOWN_SPEAKER;

/// Transcript artifact content when no chunk produced any segment
pub const EMPTY_TRANSCRIPT_TEXT: &str = "No conversation detected.";

/// Build the conversation transcript.
///
/// Output format per block, blocks separated by a blank line:
/// `[language][start:end] Speaker N: text` with two-decimal seconds.
pub fn assemble_transcript(mut segments: Vec<Segment>) -> String {
    if segments.is_empty() {
        return EMPTY_TRANSCRIPT_TEXT.to_string();
    }

    // Stable sort: equal start times keep their original relative order
    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    // First encounter of a raw label in sorted order gets the next display
    // number; UNKNOWN participates like any other label.
    let mut speaker_numbers: HashMap<String, usize> = HashMap::new();
    for segment in &segments {
        let label = raw_speaker(segment).to_string();
        let next = speaker_numbers.len() + 1;
        speaker_numbers.entry(label).or_insert(next);
    }

    let lines: Vec<String> = segments
        .iter()
        .map(|segment| {
            let language = detect_language_safe(&segment.text);
            let number = speaker_numbers[raw_speaker(segment)];
            format!(
                "[{}][{:.2}:{:.2}] Speaker {}: {}",
                language, segment.start, segment.end, number, segment.text
            )
        })
        .collect();

    lines.join("\n\n")
}

fn raw_speaker(segment: &Segment) -> &str {
    segment.speaker.as_deref().unwrap_or(UNKNOWN_SPEAKER)
}

/// Common Spanish function words that rarely appear in English text
const SPANISH_MARKERS: &[&str] = &[
    "el", "la", "los", "las", "de", "del", "que", "es", "una", "uno", "por",
    "para", "con", "como", "pero", "muy", "gracias", "hola", "bueno", "entonces",
    "también", "está", "sí", "nosotros", "usted",
];

/// Tag a line of text as `en` or `es`, defaulting to `en`.
///
/// Mirrors the transcript-facing language restriction: anything that does
/// not look like Spanish is tagged English.
pub fn detect_language_safe(text: &str) -> &'static str {
    let lowered = text.to_lowercase();

    if lowered
        .chars()
        .any(|c| "áéíóúñü¿¡".contains(c))
    {
        return "es";
    }

    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return "en";
    }

    let spanish_hits = words
        .iter()
        .filter(|w| SPANISH_MARKERS.contains(*w))
        .count();

    // Require a meaningful share of marker words to avoid flipping on
    // loanwords in otherwise English text.
    if spanish_hits * 3 >= words.len() {
        "es"
    } else {
        "en"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str, speaker: Option<&str>) -> Segment {
        let mut seg = Segment::new(start, end, text);
        seg.speaker = speaker.map(|s| s.to_string());
        seg
    }

    #[test]
    fn test_empty_input_yields_fixed_text() {
        assert_eq!(assemble_transcript(Vec::new()), EMPTY_TRANSCRIPT_TEXT);
    }

    #[test]
    fn test_two_speakers_numbered_in_encounter_order() {
        let segments = vec![
            segment(0.0, 5.0, "Hi", Some("A")),
            segment(5.0, 10.0, "Bye", Some("B")),
        ];

        let transcript = assemble_transcript(segments);
        let blocks: Vec<&str> = transcript.split("\n\n").collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "[en][0.00:5.00] Speaker 1: Hi");
        assert_eq!(blocks[1], "[en][5.00:10.00] Speaker 2: Bye");
    }

    #[test]
    fn test_segments_sorted_by_start_time() {
        let segments = vec![
            segment(7.0, 9.0, "later", Some("B")),
            segment(1.0, 3.0, "earlier", Some("A")),
        ];

        let transcript = assemble_transcript(segments);
        let first_block = transcript.split("\n\n").next().unwrap();
        assert!(first_block.contains("earlier"));
        // Encounter order after sorting: A before B
        assert!(first_block.contains("Speaker 1"));
    }

    #[test]
    fn test_equal_start_times_preserve_original_order() {
        let segments = vec![
            segment(2.0, 3.0, "first", Some("A")),
            segment(2.0, 4.0, "second", Some("B")),
        ];

        let transcript = assemble_transcript(segments);
        let blocks: Vec<&str> = transcript.split("\n\n").collect();
        assert!(blocks[0].contains("first"));
        assert!(blocks[1].contains("second"));
    }

    #[test]
    fn test_missing_speaker_is_rendered_as_unknown_number() {
        let segments = vec![
            segment(0.0, 1.0, "anonymous", None),
            segment(1.0, 2.0, "known", Some("S0")),
            segment(2.0, 3.0, "anonymous again", None),
        ];

        let transcript = assemble_transcript(segments);
        let blocks: Vec<&str> = transcript.split("\n\n").collect();

        // UNKNOWN claimed display number 1; both unlabeled lines share it
        assert!(blocks[0].contains("Speaker 1"));
        assert!(blocks[1].contains("Speaker 2"));
        assert!(blocks[2].contains("Speaker 1"));
    }

    #[test]
    fn test_language_detection_picks_spanish() {
        assert_eq!(detect_language_safe("Hola, ¿cómo estás?"), "es");
        assert_eq!(detect_language_safe("gracias por la ayuda de hoy"), "es");
    }

    #[test]
    fn test_language_detection_defaults_to_english() {
        assert_eq!(detect_language_safe("Let's review the quarterly numbers"), "en");
        assert_eq!(detect_language_safe(""), "en");
        assert_eq!(detect_language_safe("1234 !!"), "en");
    }
}
