//! Transcript projections: word count and literal, case-insensitive
//! highlighting of the search query.

use regex::RegexBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Match,
}

/// A slice of the transcript. Concatenating every segment's `text` in order
/// reproduces the transcript exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub kind: SegmentKind,
}

impl<'a> Segment<'a> {
    fn plain(text: &'a str) -> Self {
        Self {
            text,
            kind: SegmentKind::Plain,
        }
    }

    pub fn is_match(&self) -> bool {
        self.kind == SegmentKind::Match
    }
}

/// Number of whitespace-delimited tokens; 0 for blank text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `text` around every case-insensitive occurrence of the trimmed
/// `query`, taken literally. A blank query yields the whole text as one
/// plain segment.
pub fn highlight_segments<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    let needle = query.trim();
    if needle.is_empty() {
        return vec![Segment::plain(text)];
    }

    let pattern = match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            log::warn!("Highlight disabled for query of {} bytes: {}", needle.len(), e);
            return vec![Segment::plain(text)];
        }
    };

    let lowered = needle.to_lowercase();
    let mut segments = Vec::new();
    let mut cursor = 0;

    for m in pattern.find_iter(text) {
        if m.start() > cursor {
            segments.push(Segment::plain(&text[cursor..m.start()]));
        }
        // Case folding can match text whose lowercase form differs from the
        // query's; such slices stay plain.
        let kind = if m.as_str().to_lowercase() == lowered {
            SegmentKind::Match
        } else {
            SegmentKind::Plain
        };
        segments.push(Segment {
            text: m.as_str(),
            kind,
        });
        cursor = m.end();
    }

    if cursor < text.len() || segments.is_empty() {
        segments.push(Segment::plain(&text[cursor..]));
    }

    segments
}

/// How matched segments are marked when rendered to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightStyle {
    /// Black on yellow.
    Ansi,
    /// `[[match]]`, for terminals without colour.
    Brackets,
}

pub fn render_segments(segments: &[Segment<'_>], style: HighlightStyle) -> String {
    let mut out = String::new();
    for segment in segments {
        if !segment.is_match() {
            out.push_str(segment.text);
            continue;
        }
        match style {
            HighlightStyle::Ansi => {
                out.push_str("\x1b[30;43m");
                out.push_str(segment.text);
                out.push_str("\x1b[0m");
            }
            HighlightStyle::Brackets => {
                out.push_str("[[");
                out.push_str(segment.text);
                out.push_str("]]");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(segments: &[Segment<'a>]) -> Vec<&'a str> {
        segments.iter().map(|s| s.text).collect()
    }

    fn kinds(segments: &[Segment<'_>]) -> Vec<SegmentKind> {
        segments.iter().map(|s| s.kind).collect()
    }

    fn rejoin(segments: &[Segment<'_>]) -> String {
        segments.iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count(" \t\n "), 0);
        assert_eq!(word_count("  a   b c  "), 3);
        assert_eq!(word_count("one\ntwo\tthree"), 3);
    }

    #[test]
    fn test_case_insensitive_match_preserves_casing() {
        let segments = highlight_segments("Our Growth strategy and growth plan", "growth");
        assert_eq!(
            texts(&segments),
            vec!["Our ", "Growth", " strategy and ", "growth", " plan"]
        );
        use SegmentKind::*;
        assert_eq!(kinds(&segments), vec![Plain, Match, Plain, Match, Plain]);
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let text = "cost is $5 (approx.)";
        let segments = highlight_segments(text, "$5 (approx.)");
        assert_eq!(texts(&segments), vec!["cost is ", "$5 (approx.)"]);
        assert!(segments[1].is_match());

        // as a pattern `a.c` would also hit "abc"
        let segments = highlight_segments("abc a.c", "a.c");
        assert_eq!(texts(&segments), vec!["abc ", "a.c"]);

        for query in [".", "*", "+", "?", "(", ")", "[", "]", "{", "}", "^", "$", "|", "\\"] {
            let text = format!("x{}y", query);
            let segments = highlight_segments(&text, query);
            assert_eq!(texts(&segments), vec!["x", query, "y"], "query {:?}", query);
        }
    }

    #[test]
    fn test_blank_query_yields_single_plain_segment() {
        let segments = highlight_segments("Some transcript", "   ");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Some transcript");
        assert!(!segments[0].is_match());

        let segments = highlight_segments("", "");
        assert_eq!(texts(&segments), vec![""]);
    }

    #[test]
    fn test_query_is_trimmed_before_matching() {
        let segments = highlight_segments("the plan", "  plan  ");
        assert_eq!(texts(&segments), vec!["the ", "plan"]);
    }

    #[test]
    fn test_round_trip_for_assorted_inputs() {
        let cases = [
            ("", "x"),
            ("growth", "growth"),
            ("aaaa", "aa"),
            ("GrOwTh growth GROWTH", "growth"),
            ("no hit here", "zebra"),
            ("naïve café Naïve", "naïve"),
            ("[x] (y) {z}", "(y)"),
            ("ends with match", "match"),
        ];
        for (text, query) in cases {
            let segments = highlight_segments(text, query);
            assert_eq!(rejoin(&segments), text, "text {:?} query {:?}", text, query);
        }
    }

    #[test]
    fn test_adjacent_matches_have_no_empty_segments() {
        let segments = highlight_segments("aaaa", "aa");
        assert_eq!(texts(&segments), vec!["aa", "aa"]);
        assert!(segments.iter().all(|s| !s.text.is_empty()));
    }

    #[test]
    fn test_render_segments() {
        let segments = highlight_segments("Our Growth plan", "growth");
        assert_eq!(
            render_segments(&segments, HighlightStyle::Brackets),
            "Our [[Growth]] plan"
        );
        assert_eq!(
            render_segments(&segments, HighlightStyle::Ansi),
            "Our \x1b[30;43mGrowth\x1b[0m plan"
        );
    }
}
