//! Normalization of a Video Indexer index document.

use serde_json::Value;

use brandguard_shared::{BrandGuardError, Result, VideoMetadata};

use crate::VideoExtraction;

/// Pull transcript lines, OCR lines, and basic metadata out of an index.
///
/// Transcript lines are joined with single spaces; OCR lines keep their
/// order of appearance. Blank lines are dropped.
pub fn extract_insights(index: &Value) -> Result<VideoExtraction> {
    let video = index
        .get("videos")
        .and_then(Value::as_array)
        .and_then(|videos| videos.first())
        .ok_or_else(|| BrandGuardError::parse("index contains no videos"))?;

    let insights = video
        .get("insights")
        .ok_or_else(|| BrandGuardError::parse("index video has no insights"))?;

    let transcript = text_lines(insights, "transcript").join(" ");
    let ocr_text = text_lines(insights, "ocr");

    let mut video_metadata = VideoMetadata::new();
    video_metadata.insert("platform".into(), Value::from("youtube"));

    let duration = index
        .pointer("/summarizedInsights/duration/seconds")
        .or_else(|| index.get("durationInSeconds"))
        .and_then(Value::as_f64);
    if let Some(seconds) = duration {
        video_metadata.insert("duration".into(), Value::from(seconds));
    }

    if let (Some(w), Some(h)) = (
        video.get("width").and_then(Value::as_u64),
        video.get("height").and_then(Value::as_u64),
    ) {
        video_metadata.insert("resolution".into(), Value::from(format!("{w}x{h}")));
    }

    if let Some(language) = insights.get("sourceLanguage").and_then(Value::as_str) {
        video_metadata.insert("language".into(), Value::from(language));
    }

    Ok(VideoExtraction {
        transcript,
        ocr_text,
        video_metadata,
    })
}

fn text_lines(insights: &Value, key: &str) -> Vec<String> {
    insights
        .get(key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("text").and_then(Value::as_str))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
