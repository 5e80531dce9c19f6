//! Label catalog: raw classifier identifiers to BIO tags and display colours.
//!
//! The token-classification model emits class ids as opaque strings such as
//! `"LABEL_3"`. The catalog strips the framework prefix, maps ids `1..=8` to
//! the CoNLL-style BIO tags, and sends everything else to [`Tag::O`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix the inference pipeline puts in front of bare class ids.
pub const LABEL_PREFIX: &str = "LABEL_";

/// Highlight colour for [`Tag::O`] and anything the catalog cannot resolve.
pub const DEFAULT_COLOR: &str = "#E0E0E0";

/// Entity category shared by the `B-` and `I-` variants of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Per,
    Org,
    Loc,
    Misc,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Per => "PER",
            Self::Org => "ORG",
            Self::Loc => "LOC",
            Self::Misc => "MISC",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Per => "a Person name",
            Self::Org => "an Organization",
            Self::Loc => "a Location",
            Self::Misc => "a Miscellaneous entity",
        }
    }
}

/// BIO tag for a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "B-PER")]
    BPer,
    #[serde(rename = "I-PER")]
    IPer,
    #[serde(rename = "B-ORG")]
    BOrg,
    #[serde(rename = "I-ORG")]
    IOrg,
    #[serde(rename = "B-LOC")]
    BLoc,
    #[serde(rename = "I-LOC")]
    ILoc,
    #[serde(rename = "B-MISC")]
    BMisc,
    #[serde(rename = "I-MISC")]
    IMisc,
    #[serde(rename = "O")]
    O,
}

impl Tag {
    /// Entity tags in class-id order (`1..=8`).
    pub const ENTITIES: [Tag; 8] = [
        Tag::BPer,
        Tag::IPer,
        Tag::BOrg,
        Tag::IOrg,
        Tag::BLoc,
        Tag::ILoc,
        Tag::BMisc,
        Tag::IMisc,
    ];

    /// Canonical tag name, e.g. `"B-PER"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BPer => "B-PER",
            Self::IPer => "I-PER",
            Self::BOrg => "B-ORG",
            Self::IOrg => "I-ORG",
            Self::BLoc => "B-LOC",
            Self::ILoc => "I-LOC",
            Self::BMisc => "B-MISC",
            Self::IMisc => "I-MISC",
            Self::O => "O",
        }
    }

    /// Hex highlight colour.
    pub fn color(&self) -> &'static str {
        match self {
            Self::BPer => "#DC143C",
            Self::IPer => "#FFD700",
            Self::BOrg => "#228B22",
            Self::IOrg => "#FF69B4",
            Self::BLoc => "#663399",
            Self::ILoc => "#4169E1",
            Self::BMisc => "#FF7F50",
            Self::IMisc => "#008080",
            Self::O => DEFAULT_COLOR,
        }
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::BPer | Self::IPer => Some(EntityType::Per),
            Self::BOrg | Self::IOrg => Some(EntityType::Org),
            Self::BLoc | Self::ILoc => Some(EntityType::Loc),
            Self::BMisc | Self::IMisc => Some(EntityType::Misc),
            Self::O => None,
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, Self::BPer | Self::BOrg | Self::BLoc | Self::BMisc)
    }

    /// Legend text, e.g. "Beginning of a Person name".
    pub fn description(&self) -> String {
        match self.entity_type() {
            None => "Outside of any entity".to_string(),
            Some(ty) if self.is_begin() => format!("Beginning of {}", ty.noun()),
            Some(ty) => format!("Inside of {}", ty.noun()),
        }
    }

    /// Numeric class id the model uses for this tag (`O` is 0).
    pub fn class_id(&self) -> u8 {
        match self {
            Self::O => 0,
            tag => Self::ENTITIES
                .iter()
                .position(|t| t == tag)
                .map(|i| i as u8 + 1)
                .unwrap_or(0),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalise a raw classifier label and look it up.
///
/// Strips one leading [`LABEL_PREFIX`], then matches the bare ids `"1"`
/// through `"8"` exactly. Returns `None` for anything else, including `"0"`,
/// padded forms like `"01"`, and canonical names such as `"B-PER"`.
pub fn parse_raw_label(raw: &str) -> Option<Tag> {
    let id = raw.strip_prefix(LABEL_PREFIX).unwrap_or(raw);
    match id {
        "1" => Some(Tag::BPer),
        "2" => Some(Tag::IPer),
        "3" => Some(Tag::BOrg),
        "4" => Some(Tag::IOrg),
        "5" => Some(Tag::BLoc),
        "6" => Some(Tag::ILoc),
        "7" => Some(Tag::BMisc),
        "8" => Some(Tag::IMisc),
        _ => None,
    }
}

/// A legend entry: the raw id the model emits and the tag it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub raw_id: String,
    pub tag: Tag,
    pub description: String,
}

/// Process-wide, read-only mapping from raw labels to tags and colours.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCatalog;

impl LabelCatalog {
    /// Resolve a raw label to its tag and colour. Never fails.
    pub fn resolve(&self, raw: &str) -> (Tag, &'static str) {
        let tag = parse_raw_label(raw).unwrap_or(Tag::O);
        (tag, tag.color())
    }

    /// Whether `raw` has a catalog entry (as opposed to falling back to `O`).
    pub fn contains(&self, raw: &str) -> bool {
        parse_raw_label(raw).is_some()
    }

    /// Legend for the eight entity classes, in id order.
    pub fn legend(&self) -> Vec<LegendEntry> {
        Tag::ENTITIES
            .iter()
            .map(|tag| LegendEntry {
                raw_id: tag.class_id().to_string(),
                tag: *tag,
                description: tag.description(),
            })
            .collect()
    }
}
