//! What gets embedded and stored for a dream.

use dreamweaver_vector_store::Metadata;
use serde_json::{Value, json};

use crate::dream::Dream;

/// Content kept in record metadata.
pub const CONTENT_METADATA_CHARS: usize = 1000;

/// Emotional analysis and creative story kept in record metadata.
pub const ANALYSIS_METADATA_CHARS: usize = 500;

/// Content fed to the embedder.
pub const CONTENT_EMBEDDING_CHARS: usize = 8000;

/// Emotional analysis fed to the embedder.
pub const ANALYSIS_EMBEDDING_CHARS: usize = 2000;

/// Build the text that represents `dream` in vector space.
///
/// ```text
/// <content>
/// Mood: <mood>
/// Themes: <theme>, <theme>
/// Symbols: <name>, <name>
/// Emotional Analysis: <analysis>
/// ```
///
/// Missing analysis leaves the labelled lines empty.
pub fn embedding_text(dream: &Dream) -> String {
    let analysis = dream.analysis.as_ref();
    let themes = analysis.map(|a| a.themes.join(", ")).unwrap_or_default();
    let symbols = analysis
        .map(|a| {
            a.symbols
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let emotional = analysis
        .map(|a| truncate_chars(&a.emotional_analysis, ANALYSIS_EMBEDDING_CHARS))
        .unwrap_or_default();

    format!(
        "{}\nMood: {}\nThemes: {themes}\nSymbols: {symbols}\nEmotional Analysis: {emotional}",
        truncate_chars(dream.content.trim(), CONTENT_EMBEDDING_CHARS),
        dream.mood,
    )
}

/// Build the metadata payload stored next to the vector.
///
/// `public_copy` forces `isPublic: true` for the record written into the
/// public namespace.
pub fn metadata(dream: &Dream, public_copy: bool) -> Metadata {
    let analysis = dream.analysis.as_ref();
    let themes = analysis.map(|a| a.themes.join(",")).unwrap_or_default();
    let symbols = analysis
        .map(|a| {
            a.symbols
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    let emotional = analysis
        .map(|a| truncate_chars(&a.emotional_analysis, ANALYSIS_METADATA_CHARS))
        .unwrap_or_default();
    let story = analysis
        .map(|a| truncate_chars(&a.creative_story, ANALYSIS_METADATA_CHARS))
        .unwrap_or_default();

    let value = json!({
        "content": truncate_chars(&dream.content, CONTENT_METADATA_CHARS),
        "mood": dream.mood.as_str(),
        "clarity": dream.clarity.get(),
        "themes": themes,
        "emotionalAnalysis": emotional,
        "creativeStory": story,
        "symbols": symbols,
        "imageUrl": dream.image_url.as_deref().unwrap_or_default(),
        "timestamp": dream.timestamp,
        "isPublic": public_copy || dream.is_public,
        "userId": dream.owner_id,
    });

    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dream::{DreamAnalysis, DreamSymbol, Mood, SymbolKind};
    use pretty_assertions::assert_eq;

    fn analysed() -> Dream {
        Dream::new("d1", "u1", "Flying over mountains", Mood::Euphoric)
            .with_timestamp(42)
            .with_analysis(DreamAnalysis {
                emotional_analysis: "A sense of freedom".into(),
                creative_story: "The dreamer soared".into(),
                themes: vec!["flight".into(), "freedom".into()],
                symbols: vec![
                    DreamSymbol::new("mountain", SymbolKind::Place),
                    DreamSymbol::new("wings", SymbolKind::Object),
                ],
            })
    }

    #[test]
    fn test_embedding_text_layout() {
        assert_eq!(
            embedding_text(&analysed()),
            "Flying over mountains\n\
             Mood: Euphoric\n\
             Themes: flight, freedom\n\
             Symbols: mountain, wings\n\
             Emotional Analysis: A sense of freedom"
        );
    }

    #[test]
    fn test_embedding_text_without_analysis() {
        let dream = Dream::new("d1", "u1", "  Lost in a maze ", Mood::Confused);
        assert_eq!(
            embedding_text(&dream),
            "Lost in a maze\nMood: Confused\nThemes: \nSymbols: \nEmotional Analysis: "
        );
    }

    #[test]
    fn test_metadata_payload() {
        let metadata = metadata(&analysed(), false);
        assert_eq!(
            Value::Object(metadata),
            json!({
                "content": "Flying over mountains",
                "mood": "Euphoric",
                "clarity": 3,
                "themes": "flight,freedom",
                "emotionalAnalysis": "A sense of freedom",
                "creativeStory": "The dreamer soared",
                "symbols": "mountain,wings",
                "imageUrl": "",
                "timestamp": 42,
                "isPublic": false,
                "userId": "u1",
            })
        );
    }

    #[test]
    fn test_public_copy_forces_flag() {
        let metadata = metadata(&analysed(), true);
        assert_eq!(metadata.get("isPublic"), Some(&json!(true)));
    }

    #[test]
    fn test_metadata_truncates_by_character() {
        let content = "夢".repeat(CONTENT_METADATA_CHARS + 10);
        let dream = Dream::new("d1", "u1", content, Mood::Surreal);

        let metadata = metadata(&dream, false);
        let stored = metadata.get("content").and_then(Value::as_str).unwrap();
        assert_eq!(stored.chars().count(), CONTENT_METADATA_CHARS);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
