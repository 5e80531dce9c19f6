//! Span reconstruction: token predictions to gap-filled, labelled segments.
//!
//! A single left-to-right pass over the predictions. Text between entity
//! spans is emitted as plain segments so that the segment texts, joined in
//! order, reproduce the source exactly. Bad predictions are skipped and
//! reported as [`Anomaly`] values rather than failing the request.

use std::fmt;
use std::iter;

use serde::Serialize;
use tracing::{debug, warn};

use crate::labels::{LabelCatalog, Tag};
use crate::prediction::{PredictionRecord, RawPrediction};

/// One piece of the highlighted output. Offsets are in characters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedSegment {
    Plain {
        text: String,
        start: usize,
        end: usize,
    },
    Entity {
        text: String,
        tag: Tag,
        score: f64,
        color: &'static str,
        start: usize,
        end: usize,
    },
}

impl RenderedSegment {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Entity { text, .. } => text,
        }
    }

    pub fn start(&self) -> usize {
        match self {
            Self::Plain { start, .. } | Self::Entity { start, .. } => *start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Self::Plain { end, .. } | Self::Entity { end, .. } => *end,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity { .. })
    }
}

/// One row of the entity summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub text: String,
    pub label: Tag,
    pub score: f64,
    pub start: usize,
    pub end: usize,
}

impl SummaryRow {
    /// Score as a percentage string, e.g. `"98.00%"`.
    pub fn score_percent(&self) -> String {
        format_percent(self.score)
    }
}

/// Format a `[0, 1]` confidence as `"NN.NN%"`.
pub fn format_percent(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Why a prediction was skipped or flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Span became empty after clipping against already-emitted text.
    Degenerate { start: usize, end: usize },
    /// Offsets were empty, reversed, or past the end of the source.
    OutOfBounds { start: usize, end: usize, len: usize },
    /// Score was NaN or infinite.
    NonFiniteScore,
    /// Wire record lacked a required field.
    MalformedPrediction { field: &'static str },
    /// Wire record could not be decoded at all (wrong types, not an object).
    InvalidRecord { reason: String },
    /// Label had no catalog entry and was rendered as `O`.
    UnresolvedLabel { raw: String },
}

impl AnomalyKind {
    /// Whether the prediction was dropped from the output.
    pub fn is_skipped(&self) -> bool {
        !matches!(self, Self::UnresolvedLabel { .. })
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degenerate { start, end } => {
                write!(f, "empty span [{start}, {end}) after overlap clipping")
            }
            Self::OutOfBounds { start, end, len } => {
                write!(f, "span [{start}, {end}) invalid for text of length {len}")
            }
            Self::NonFiniteScore => f.write_str("score is not a finite number"),
            Self::MalformedPrediction { field } => write!(f, "missing field '{field}'"),
            Self::InvalidRecord { reason } => write!(f, "unreadable record: {reason}"),
            Self::UnresolvedLabel { raw } => write!(f, "unknown label '{raw}', rendered as O"),
        }
    }
}

/// A flagged prediction, identified by its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub index: usize,
    pub kind: AnomalyKind,
}

/// Output of one resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub segments: Vec<RenderedSegment>,
    pub rows: Vec<SummaryRow>,
    pub anomalies: Vec<Anomaly>,
}

impl Resolution {
    /// Concatenated segment text; equals the source.
    pub fn text(&self) -> String {
        self.segments.iter().map(RenderedSegment::text).collect()
    }

    pub fn entities(&self) -> impl Iterator<Item = &RenderedSegment> {
        self.segments.iter().filter(|s| s.is_entity())
    }

    /// Number of predictions dropped from the output.
    pub fn skipped(&self) -> usize {
        self.anomalies.iter().filter(|a| a.kind.is_skipped()).count()
    }
}

/// Character-indexed view over a `&str`.
struct CharText<'a> {
    source: &'a str,
    /// Byte offset of every char boundary, including the end.
    bounds: Vec<usize>,
}

impl<'a> CharText<'a> {
    fn new(source: &'a str) -> Self {
        let bounds = source
            .char_indices()
            .map(|(b, _)| b)
            .chain(iter::once(source.len()))
            .collect();
        Self { source, bounds }
    }

    fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[self.bounds[start]..self.bounds[end]]
    }
}

/// Stateless resolver from token predictions to rendered segments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanResolver {
    catalog: LabelCatalog,
}

impl SpanResolver {
    /// Resolve predictions against `source`.
    ///
    /// Predictions are expected in ascending `start` order. An overlapping
    /// prediction has its start clipped to the end of the previous span and
    /// is dropped if nothing remains.
    pub fn resolve(&self, source: &str, predictions: &[RawPrediction]) -> Resolution {
        self.resolve_indexed(source, predictions.iter().enumerate(), Vec::new())
    }

    /// Resolve loosely-typed wire records, each decoded on its own.
    ///
    /// An item that failed to decode is reported as
    /// [`AnomalyKind::InvalidRecord`] with the decoder's message, and a record
    /// missing a required field as [`AnomalyKind::MalformedPrediction`]. The
    /// others are resolved as usual, keeping their original indices in any
    /// anomaly.
    pub fn resolve_records(
        &self,
        source: &str,
        records: Vec<Result<PredictionRecord, String>>,
    ) -> Resolution {
        let mut anomalies = Vec::new();
        let mut predictions = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let kind = match record {
                Ok(record) => match RawPrediction::try_from(record) {
                    Ok(pred) => {
                        predictions.push((index, pred));
                        continue;
                    }
                    Err(missing) => AnomalyKind::MalformedPrediction { field: missing.0 },
                },
                Err(reason) => AnomalyKind::InvalidRecord { reason },
            };
            warn!(index, %kind, "skipping prediction");
            anomalies.push(Anomaly { index, kind });
        }

        self.resolve_indexed(
            source,
            predictions.iter().map(|(i, p)| (*i, p)),
            anomalies,
        )
    }

    fn resolve_indexed<'p>(
        &self,
        source: &str,
        predictions: impl Iterator<Item = (usize, &'p RawPrediction)>,
        mut anomalies: Vec<Anomaly>,
    ) -> Resolution {
        let text = CharText::new(source);
        let len = text.len();

        let mut segments = Vec::new();
        let mut rows = Vec::new();
        let mut cursor = 0usize;

        let mut flag = |index: usize, kind: AnomalyKind| {
            if kind.is_skipped() {
                warn!(index, %kind, "skipping prediction");
            } else {
                debug!(index, %kind, "prediction anomaly");
            }
            anomalies.push(Anomaly { index, kind });
        };

        for (index, pred) in predictions {
            if pred.start >= pred.end || pred.end > len {
                flag(
                    index,
                    AnomalyKind::OutOfBounds {
                        start: pred.start,
                        end: pred.end,
                        len,
                    },
                );
                continue;
            }
            if !pred.score.is_finite() {
                flag(index, AnomalyKind::NonFiniteScore);
                continue;
            }

            // Never re-open text that was already emitted.
            let start = pred.start.max(cursor);
            if start >= pred.end {
                flag(
                    index,
                    AnomalyKind::Degenerate {
                        start,
                        end: pred.end,
                    },
                );
                continue;
            }
            let end = pred.end;

            if start > cursor {
                segments.push(RenderedSegment::Plain {
                    text: text.slice(cursor, start).to_string(),
                    start: cursor,
                    end: start,
                });
            }

            if !self.catalog.contains(&pred.raw_label) {
                flag(
                    index,
                    AnomalyKind::UnresolvedLabel {
                        raw: pred.raw_label.clone(),
                    },
                );
            }
            let (tag, color) = self.catalog.resolve(&pred.raw_label);
            let span = text.slice(start, end);

            segments.push(RenderedSegment::Entity {
                text: span.to_string(),
                tag,
                score: pred.score,
                color,
                start,
                end,
            });
            rows.push(SummaryRow {
                text: span.to_string(),
                label: tag,
                score: pred.score,
                start,
                end,
            });

            cursor = end;
        }

        if cursor < len || len == 0 {
            segments.push(RenderedSegment::Plain {
                text: text.slice(cursor, len).to_string(),
                start: cursor,
                end: len,
            });
        }

        Resolution {
            segments,
            rows,
            anomalies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "Bill Gates is the founder of Microsoft.";

    fn resolver() -> SpanResolver {
        SpanResolver::default()
    }

    fn plain(text: &str, start: usize, end: usize) -> RenderedSegment {
        RenderedSegment::Plain {
            text: text.to_string(),
            start,
            end,
        }
    }

    fn entity(text: &str, tag: Tag, score: f64, start: usize, end: usize) -> RenderedSegment {
        RenderedSegment::Entity {
            text: text.to_string(),
            tag,
            score,
            color: tag.color(),
            start,
            end,
        }
    }

    /// Assert the coverage and contiguity guarantees on a resolution.
    fn assert_covers(source: &str, res: &Resolution) {
        assert_eq!(res.text(), source);
        assert_eq!(res.segments.first().map(|s| s.start()), Some(0));
        assert_eq!(
            res.segments.last().map(|s| s.end()),
            Some(source.chars().count())
        );
        for pair in res.segments.windows(2) {
            assert_eq!(
                pair[0].end(),
                pair[1].start(),
                "gap or overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn offsets_slice_source_even_when_off_by_one() {
        // A span shifted one character right still slices the source, and
        // the output still covers the text exactly.
        let preds = vec![
            RawPrediction::new(0, 4, "1", 0.98),
            RawPrediction::new(5, 10, "2", 0.95),
            RawPrediction::new(30, 39, "3", 0.99),
        ];
        let res = resolver().resolve(EXAMPLE, &preds);

        assert_eq!(
            res.segments,
            vec![
                entity("Bill", Tag::BPer, 0.98, 0, 4),
                plain(" ", 4, 5),
                entity("Gates", Tag::IPer, 0.95, 5, 10),
                plain(" is the founder of M", 10, 30),
                entity("icrosoft.", Tag::BOrg, 0.99, 30, 39),
            ]
        );
        assert_covers(EXAMPLE, &res);
    }

    #[test]
    fn example_sentence_segments() {
        // "Microsoft" occupies [29, 38); the trailing "." is [38, 39).
        let preds = vec![
            RawPrediction::new(0, 4, "LABEL_1", 0.98),
            RawPrediction::new(5, 10, "LABEL_2", 0.95),
            RawPrediction::new(29, 38, "LABEL_3", 0.99),
        ];
        let res = resolver().resolve(EXAMPLE, &preds);

        assert_eq!(
            res.segments,
            vec![
                entity("Bill", Tag::BPer, 0.98, 0, 4),
                plain(" ", 4, 5),
                entity("Gates", Tag::IPer, 0.95, 5, 10),
                plain(" is the founder of ", 10, 29),
                entity("Microsoft", Tag::BOrg, 0.99, 29, 38),
                plain(".", 38, 39),
            ]
        );
        let pct: Vec<String> = res.rows.iter().map(SummaryRow::score_percent).collect();
        assert_eq!(pct, ["98.00%", "95.00%", "99.00%"]);
        assert_eq!(res.rows[2].text, "Microsoft");
        assert_eq!(res.rows[2].label, Tag::BOrg);
        assert!(res.anomalies.is_empty());
        assert_covers(EXAMPLE, &res);
    }

    #[test]
    fn overlap_clipped_to_empty_is_skipped() {
        let source = "Hello world";
        let preds = vec![
            RawPrediction::new(0, 5, "1", 0.9),
            RawPrediction::new(3, 4, "2", 0.8),
        ];
        let res = resolver().resolve(source, &preds);

        assert_eq!(
            res.segments,
            vec![
                entity("Hello", Tag::BPer, 0.9, 0, 5),
                plain(" world", 5, 11),
            ]
        );
        assert_eq!(res.rows.len(), 1);
        assert_eq!(
            res.anomalies,
            vec![Anomaly {
                index: 1,
                kind: AnomalyKind::Degenerate { start: 5, end: 4 },
            }]
        );
        assert_eq!(res.skipped(), 1);
        assert_covers(source, &res);
    }

    #[test]
    fn partial_overlap_is_clipped() {
        let source = "abcdefgh";
        let preds = vec![
            RawPrediction::new(0, 4, "1", 0.9),
            RawPrediction::new(2, 6, "2", 0.8),
        ];
        let res = resolver().resolve(source, &preds);

        assert_eq!(
            res.segments,
            vec![
                entity("abcd", Tag::BPer, 0.9, 0, 4),
                entity("ef", Tag::IPer, 0.8, 4, 6),
                plain("gh", 6, 8),
            ]
        );
        assert_eq!(res.rows[1].start, 4);
        assert!(res.anomalies.is_empty());
        assert_covers(source, &res);
    }

    #[test]
    fn empty_source_yields_single_empty_plain() {
        let res = resolver().resolve("", &[]);
        assert_eq!(res.segments, vec![plain("", 0, 0)]);
        assert!(res.rows.is_empty());
        assert_covers("", &res);
    }

    #[test]
    fn no_predictions_yields_whole_text() {
        let res = resolver().resolve(EXAMPLE, &[]);
        assert_eq!(res.segments, vec![plain(EXAMPLE, 0, 39)]);
        assert!(res.rows.is_empty());
    }

    #[test]
    fn adjacent_entities_have_no_empty_gap() {
        let source = "NewYork";
        let preds = vec![
            RawPrediction::new(0, 3, "5", 0.7),
            RawPrediction::new(3, 7, "6", 0.6),
        ];
        let res = resolver().resolve(source, &preds);
        assert_eq!(res.segments.len(), 2);
        assert!(res.segments.iter().all(RenderedSegment::is_entity));
        assert_covers(source, &res);
    }

    #[test]
    fn entity_at_end_has_no_trailing_plain() {
        let source = "Visit Paris";
        let preds = vec![RawPrediction::new(6, 11, "5", 0.9)];
        let res = resolver().resolve(source, &preds);
        assert_eq!(
            res.segments,
            vec![plain("Visit ", 0, 6), entity("Paris", Tag::BLoc, 0.9, 6, 11)]
        );
    }

    #[test]
    fn unknown_label_renders_as_outside() {
        let source = "the cat";
        let preds = vec![RawPrediction::new(4, 7, "LABEL_0", 0.99)];
        let res = resolver().resolve(source, &preds);

        assert_eq!(res.entities().count(), 1);
        assert_eq!(res.rows[0].label, Tag::O);
        assert_eq!(
            res.segments[1],
            RenderedSegment::Entity {
                text: "cat".into(),
                tag: Tag::O,
                score: 0.99,
                color: "#E0E0E0",
                start: 4,
                end: 7,
            }
        );
        assert_eq!(
            res.anomalies,
            vec![Anomaly {
                index: 0,
                kind: AnomalyKind::UnresolvedLabel {
                    raw: "LABEL_0".into()
                },
            }]
        );
        assert_eq!(res.skipped(), 0);
    }

    #[test]
    fn out_of_bounds_prediction_is_skipped() {
        let source = "short";
        let preds = vec![
            RawPrediction::new(0, 5, "1", 0.9),
            RawPrediction::new(5, 9, "2", 0.9),
            RawPrediction::new(3, 3, "2", 0.9),
        ];
        let res = resolver().resolve(source, &preds);

        assert_eq!(res.segments, vec![entity("short", Tag::BPer, 0.9, 0, 5)]);
        assert_eq!(res.anomalies.len(), 2);
        assert_eq!(
            res.anomalies[0].kind,
            AnomalyKind::OutOfBounds {
                start: 5,
                end: 9,
                len: 5
            }
        );
        assert_eq!(res.anomalies[1].index, 2);
    }

    #[test]
    fn non_finite_score_is_skipped() {
        let preds = vec![RawPrediction::new(0, 4, "1", f64::NAN)];
        let res = resolver().resolve(EXAMPLE, &preds);
        assert!(res.rows.is_empty());
        assert_eq!(res.anomalies[0].kind, AnomalyKind::NonFiniteScore);
        assert_covers(EXAMPLE, &res);
    }

    #[test]
    fn offsets_are_characters_not_bytes() {
        let source = "Zoë met José in Göteborg.";
        let preds = vec![
            RawPrediction::new(0, 3, "1", 0.9),
            RawPrediction::new(8, 12, "1", 0.9),
            RawPrediction::new(16, 24, "5", 0.9),
        ];
        let res = resolver().resolve(source, &preds);

        let names: Vec<&str> = res.entities().map(RenderedSegment::text).collect();
        assert_eq!(names, ["Zoë", "José", "Göteborg"]);
        assert_covers(source, &res);
    }

    #[test]
    fn word_field_is_not_trusted() {
        let preds = vec![RawPrediction::new(29, 38, "3", 0.99).with_word("##soft")];
        let res = resolver().resolve(EXAMPLE, &preds);
        assert_eq!(res.rows[0].text, "Microsoft");
    }

    #[test]
    fn resolution_is_idempotent() {
        let preds = vec![
            RawPrediction::new(0, 4, "1", 0.98),
            RawPrediction::new(2, 3, "2", 0.5),
            RawPrediction::new(29, 38, "42", 0.99),
        ];
        let first = resolver().resolve(EXAMPLE, &preds);
        let second = resolver().resolve(EXAMPLE, &preds);
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_records_keep_input_indices() {
        let records = vec![
            PredictionRecord {
                entity: Some("LABEL_1".into()),
                score: Some(0.98),
                start: Some(0),
                end: Some(4),
                word: Some("Bill".into()),
            },
            PredictionRecord {
                entity: Some("LABEL_2".into()),
                score: None,
                start: Some(5),
                end: Some(10),
                word: Some("Gates".into()),
            },
            PredictionRecord {
                entity: Some("LABEL_3".into()),
                score: Some(0.99),
                start: Some(29),
                end: Some(50),
                word: None,
            },
        ];
        let res = resolver().resolve_records(EXAMPLE, records.into_iter().map(Ok).collect());

        assert_eq!(res.rows.len(), 1);
        assert_eq!(res.rows[0].text, "Bill");
        assert_eq!(
            res.anomalies,
            vec![
                Anomaly {
                    index: 1,
                    kind: AnomalyKind::MalformedPrediction { field: "score" },
                },
                Anomaly {
                    index: 2,
                    kind: AnomalyKind::OutOfBounds {
                        start: 29,
                        end: 50,
                        len: 39
                    },
                },
            ]
        );
        assert_covers(EXAMPLE, &res);
    }

    #[test]
    fn undecodable_record_does_not_sink_the_batch() {
        let records = vec![
            Err("invalid type: string \"\", expected f64".to_string()),
            Ok(PredictionRecord {
                entity: Some("LABEL_2".into()),
                score: Some(0.95),
                start: Some(5),
                end: Some(10),
                word: None,
            }),
        ];
        let res = resolver().resolve_records(EXAMPLE, records);

        assert_eq!(res.rows.len(), 1);
        assert_eq!(res.rows[0].text, "Gates");
        assert_eq!(res.anomalies.len(), 1);
        assert_eq!(res.anomalies[0].index, 0);
        assert!(matches!(
            &res.anomalies[0].kind,
            AnomalyKind::InvalidRecord { reason } if reason.contains("expected f64")
        ));
        assert_eq!(res.skipped(), 1);
        assert_covers(EXAMPLE, &res);
    }

    #[test]
    fn segments_serialize_with_kind_tag() {
        let res = resolver().resolve("Bill", &[RawPrediction::new(0, 4, "1", 0.5)]);
        let json = serde_json::to_value(&res.segments).unwrap();
        assert_eq!(json[0]["kind"], "entity");
        assert_eq!(json[0]["tag"], "B-PER");
        assert_eq!(json[0]["color"], "#DC143C");
    }

    #[test]
    fn format_percent_rounds_to_two_places() {
        assert_eq!(format_percent(0.98), "98.00%");
        assert_eq!(format_percent(0.123456), "12.35%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }
}
