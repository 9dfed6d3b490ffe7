//! The dream record as the vector index sees it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recorded dream.
///
/// Field names follow the relational store's JSON (`ownerId`, `isPublic`,
/// ...), so dreams exported from it deserialize as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dream {
    /// Unique id; also the vector record key.
    pub id: String,

    /// Owning user; selects the private namespace.
    pub owner_id: String,

    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,

    /// Free text narrative.
    pub content: String,

    /// Dominant mood.
    pub mood: Mood,

    /// How vividly the dream was remembered.
    #[serde(default)]
    pub clarity: Clarity,

    #[serde(default)]
    pub is_recurring: bool,

    /// Whether the dream is mirrored into the public namespace.
    #[serde(default)]
    pub is_public: bool,

    /// Generated illustration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Waking-life link noted by the dreamer. Not part of the embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality_connection: Option<String>,

    /// AI analysis, when one has been produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<DreamAnalysis>,
}

impl Dream {
    /// Create a private, unanalysed dream with default clarity.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        content: impl Into<String>,
        mood: Mood,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            timestamp: 0,
            content: content.into(),
            mood,
            clarity: Clarity::default(),
            is_recurring: false,
            is_public: false,
            image_url: None,
            reality_connection: None,
            analysis: None,
        }
    }

    /// Mark the dream public.
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Set the clarity.
    pub fn with_clarity(mut self, clarity: Clarity) -> Self {
        self.clarity = clarity;
        self
    }

    /// Set the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach an analysis.
    pub fn with_analysis(mut self, analysis: DreamAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Attach an illustration URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Mood vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Euphoric,
    Peaceful,
    Confused,
    Anxious,
    Terrified,
    Surreal,
    Nostalgic,
    Adventurous,
}

impl Mood {
    /// All moods, in display order.
    pub const ALL: [Mood; 8] = [
        Mood::Euphoric,
        Mood::Peaceful,
        Mood::Confused,
        Mood::Anxious,
        Mood::Terrified,
        Mood::Surreal,
        Mood::Nostalgic,
        Mood::Adventurous,
    ];

    /// Display name, as stored in metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Euphoric => "Euphoric",
            Mood::Peaceful => "Peaceful",
            Mood::Confused => "Confused",
            Mood::Anxious => "Anxious",
            Mood::Terrified => "Terrified",
            Mood::Surreal => "Surreal",
            Mood::Nostalgic => "Nostalgic",
            Mood::Adventurous => "Adventurous",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clarity outside the 1 to 5 scale.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("clarity must be between 1 and 5, got {0}")]
pub struct InvalidClarity(pub u8);

/// Recall clarity on a 1 to 5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Clarity(u8);

impl Clarity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a clarity value.
    pub fn new(value: u8) -> Result<Self, InvalidClarity> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidClarity(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Clarity {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Clarity {
    type Error = InvalidClarity;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Clarity> for u8 {
    fn from(clarity: Clarity) -> Self {
        clarity.0
    }
}

/// AI-produced interpretation of a dream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamAnalysis {
    #[serde(default)]
    pub emotional_analysis: String,

    #[serde(default)]
    pub creative_story: String,

    #[serde(default)]
    pub themes: Vec<String>,

    #[serde(default)]
    pub symbols: Vec<DreamSymbol>,
}

/// A symbol spotted in a dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamSymbol {
    pub name: String,

    #[serde(default)]
    pub meaning: String,

    #[serde(rename = "type")]
    pub kind: SymbolKind,
}

impl DreamSymbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            meaning: String::new(),
            kind,
        }
    }
}

/// What a symbol refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Person,
    Place,
    Object,
    Action,
}
