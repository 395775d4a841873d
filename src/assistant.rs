//! AI-generated health tips and complaint drafts.
//!
//! Both requests embed current data in a prompt, send it to the generative
//! text endpoint, and validate the reply before anything reaches the caller.
//! Neither lets an upstream failure escape: tips degrade to a single
//! explanatory tip, drafts to a [`DraftOutcome`] variant.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::data_sources::GeminiClient;
use crate::error::{KaraError, Result};
use crate::model::{AqiReading, NewComplaint};

/// Icon shown for tips without a leading emoji.
pub const DEFAULT_TIP_ICON: &str = "💡";

pub const TIPS_FAILED_MESSAGE: &str = "An error occurred while fetching health tips.";
pub const TIPS_UNEXPECTED_MESSAGE: &str = "Could not generate tips due to an unexpected response.";

pub const DRAFT_MISSING_FIELDS_MESSAGE: &str =
    "Please fill in location, category, and description before generating.";
pub const DRAFT_INVALID_MESSAGE: &str = "AI generated an invalid response format.";
pub const DRAFT_UNEXPECTED_MESSAGE: &str =
    "Could not generate AI content due to an unexpected response.";
pub const DRAFT_UNAVAILABLE_MESSAGE: &str = "Failed to connect to the AI service.";

/// One health recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthTip {
    pub icon: String,
    pub text: String,
}

impl HealthTip {
    /// A synthetic tip carrying a failure message.
    pub fn notice(message: &str) -> Self {
        Self {
            icon: "⚠️".to_string(),
            text: message.to_string(),
        }
    }
}

/// AI summary and formal draft for a complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplaintDraft {
    pub summary: String,
    pub draft: String,
}

/// Result of a draft request as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DraftOutcome {
    Ready(ComplaintDraft),
    /// The model answered, but not with the expected JSON object.
    InvalidResponse { message: String },
    /// The endpoint could not be reached or returned no text.
    Unavailable { message: String },
}

/// Prompt asking for three emoji-prefixed tips for the current reading.
pub fn health_tips_prompt(reading: &AqiReading) -> String {
    let category = reading.category();
    let mut prompt = format!(
        "The current Air Quality Index (AQI) in {} is {}, which is considered '{}'.",
        reading.city,
        reading.aqi,
        category.label()
    );

    if let (Some(pm25), Some(pm10)) = (reading.pollutant("pm25"), reading.pollutant("pm10")) {
        prompt.push_str(&format!(
            " The main pollutants are PM2.5 at {pm25} µg/m³ and PM10 at {pm10} µg/m³."
        ));
    }

    prompt.push_str(
        " Provide 3 concise, actionable health tips for a teenager who travels daily in this \
         city, considering these specific pollutants. Start each tip with a relevant emoji. \
         Format as a simple list with each tip on a new line, like \"- 😷 Wear a mask.\"",
    );
    prompt
}

/// Prompt asking for a `{summary, draft}` JSON object.
pub fn complaint_draft_prompt(form: &NewComplaint) -> String {
    format!(
        "Based on the following pollution complaint, generate a short, one-sentence summary \
         and a formal complaint draft. Format the output as a JSON object with two keys: \
         \"summary\" and \"draft\".\n\nComplaint Category: {}\nLocation: {}\nDescription: {}",
        form.category, form.location, form.description
    )
}

fn is_emoji_base(c: char) -> bool {
    matches!(c,
        '\u{1F000}'..='\u{1FAFF}'
        | '\u{2600}'..='\u{27BF}'
        | '\u{2300}'..='\u{23FF}'
        | '\u{2B00}'..='\u{2BFF}'
        | '\u{3030}' | '\u{303D}' | '\u{3297}' | '\u{3299}')
}

/// Characters that extend an emoji without standing alone.
fn is_emoji_modifier(c: char) -> bool {
    matches!(c, '\u{FE0F}' | '\u{FE0E}' | '\u{200D}' | '\u{20E3}' | '\u{E0020}'..='\u{E007F}')
}

/// Split a list line into its emoji icon and text.
///
/// Returns `None` for lines that are not list items.
fn split_tip(line: &str) -> Option<HealthTip> {
    let trimmed = line.trim();
    let body = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('•'))?;

    let mut icon = String::new();
    let mut text = String::with_capacity(body.len());
    let mut in_icon = false;

    for c in body.chars() {
        if is_emoji_base(c) || (in_icon && is_emoji_modifier(c)) {
            // Only the first emoji sequence becomes the icon
            if icon.is_empty() || in_icon {
                icon.push(c);
                in_icon = true;
            }
        } else if is_emoji_modifier(c) {
            continue;
        } else {
            in_icon = false;
            text.push(c);
        }
    }

    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    Some(HealthTip {
        icon: if icon.is_empty() {
            DEFAULT_TIP_ICON.to_string()
        } else {
            icon
        },
        text,
    })
}

/// Keep only list-item lines (`-` or `•`) and split each into icon and text.
pub fn parse_health_tips(text: &str) -> Vec<HealthTip> {
    text.lines().filter_map(split_tip).collect()
}

/// Strip Markdown code fences and parse the draft object.
///
/// # Errors
///
/// `Parse` if the remaining text is not exactly `{"summary": .., "draft": ..}`.
pub fn parse_complaint_draft(text: &str) -> Result<ComplaintDraft> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let value: serde_json::Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| KaraError::Parse(format!("complaint draft: {e}")))?;
    if !value.is_object() {
        return Err(KaraError::Parse(
            "complaint draft: expected a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| KaraError::Parse(format!("complaint draft: {e}")))
}

/// AI text features backed by the generative text client.
#[derive(Clone)]
pub struct Assistant {
    gemini: GeminiClient,
}

impl Assistant {
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }

    /// Request tips, surfacing any failure as an error.
    #[instrument(skip(self, reading), fields(aqi = reading.aqi))]
    pub async fn try_health_tips(&self, reading: &AqiReading) -> Result<Vec<HealthTip>> {
        let text = self.gemini.generate(&health_tips_prompt(reading)).await?;
        let tips = parse_health_tips(&text);
        if tips.is_empty() {
            warn!(raw = %text, "Health tips response contained no list items");
            return Err(KaraError::Parse("no list items in tips response".to_string()));
        }
        info!(count = tips.len(), "Health tips generated");
        Ok(tips)
    }

    /// Request tips. Never fails: errors become a single explanatory tip.
    pub async fn health_tips(&self, reading: &AqiReading) -> Vec<HealthTip> {
        match self.try_health_tips(reading).await {
            Ok(tips) => tips,
            Err(e) => {
                warn!(error = %e, "Health tips request failed");
                vec![tips_fallback(&e)]
            }
        }
    }

    /// Request a summary and formal draft for a complaint in progress.
    ///
    /// Only fails with `Validation` when description, location or category is
    /// blank; every upstream problem is folded into the outcome.
    #[instrument(skip(self, form), fields(category = %form.category))]
    pub async fn complaint_draft(&self, form: &NewComplaint) -> Result<DraftOutcome> {
        if !form.has_report_fields() {
            return Err(KaraError::Validation(
                DRAFT_MISSING_FIELDS_MESSAGE.to_string(),
            ));
        }

        let text = match self.gemini.generate(&complaint_draft_prompt(form)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Complaint draft request failed");
                return Ok(draft_fallback(&e));
            }
        };

        match parse_complaint_draft(&text) {
            Ok(draft) => {
                info!("Complaint draft generated");
                Ok(DraftOutcome::Ready(draft))
            }
            Err(e) => {
                warn!(error = %e, raw = %text, "Failed to parse complaint draft");
                Ok(DraftOutcome::InvalidResponse {
                    message: DRAFT_INVALID_MESSAGE.to_string(),
                })
            }
        }
    }
}

/// The synthetic tip shown for a failed tips request.
pub fn tips_fallback(error: &KaraError) -> HealthTip {
    match error {
        KaraError::Parse(_) => HealthTip::notice(TIPS_UNEXPECTED_MESSAGE),
        _ => HealthTip::notice(TIPS_FAILED_MESSAGE),
    }
}

fn draft_fallback(error: &KaraError) -> DraftOutcome {
    let message = match error {
        KaraError::Parse(_) => DRAFT_UNEXPECTED_MESSAGE,
        _ => DRAFT_UNAVAILABLE_MESSAGE,
    };
    DraftOutcome::Unavailable {
        message: message.to_string(),
    }
}
