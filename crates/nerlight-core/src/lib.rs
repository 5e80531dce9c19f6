pub mod analyzer;
mod error;
pub mod labels;
pub mod prediction;
pub mod resolver;
pub mod schema;

pub use analyzer::{Analysis, Analyzer, DEFAULT_TEXT, Infer};
pub use error::NerError;
pub use labels::{DEFAULT_COLOR, EntityType, LabelCatalog, LegendEntry, Tag, parse_raw_label};
pub use prediction::{PredictionRecord, RawPrediction};
pub use resolver::{
    Anomaly, AnomalyKind, RenderedSegment, Resolution, SpanResolver, SummaryRow, format_percent,
};
