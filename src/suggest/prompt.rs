//! Prompt construction for the suggestion service
//!
//! Both prompt variants frame the model as a travel guide and demand
//! bullet-style phrases of at most 10 words with no surrounding prose.
//! Date context and the exclusion list are optional lines; the sentinel
//! instruction is always present so an unrecognized place produces a
//! fixed, displayable reply instead of a failure.

use crate::model::format_date;
use crate::suggest::{SuggestionRequest, MAX_LIST_SUGGESTIONS, NO_SUGGESTIONS_SENTINEL};

/// Generates the prompt requesting exactly one activity suggestion
///
/// Includes the exclusion list when non-empty, so phrases the user
/// already has are not offered again.
///
/// # Arguments
///
/// * `request` - Place, optional country and dates, and exclusions
///
/// # Returns
///
/// The complete prompt text
///
/// # Examples
///
/// ```
/// use wayfarer::suggest::{prompt::generate_single_prompt, SuggestionRequest};
///
/// let request = SuggestionRequest::new("Paris").with_country("France");
/// let prompt = generate_single_prompt(&request);
/// assert!(prompt.contains("Paris, France"));
/// assert!(prompt.contains("exactly ONE"));
/// ```
pub fn generate_single_prompt(request: &SuggestionRequest) -> String {
    let place = place_with_country(request);
    let date_context = date_context(request);

    let exclusion_note = if request.exclusions.is_empty() {
        String::new()
    } else {
        format!(
            "Do NOT suggest one of the following suggestions: {}\n\n",
            request.exclusions.join(", ")
        )
    };

    format!(
        r#"You are an expert travel guide.
Provide exactly ONE short travel activity suggestion for {place}.

{date_context}The suggestion may be a key attraction, food or cultural experience.
Use only short phrases, names of places, foods, or activities. No extra descriptions.
It must be a single bullet-style short phrase (no more than 10 words).

{exclusion_note}If "{name}" is not a known or valid travel destination, reply only with:
{sentinel}

Do not output a list, only one suggestion.
No extra text."#,
        place = place,
        date_context = date_context,
        exclusion_note = exclusion_note,
        name = request.place,
        sentinel = NO_SUGGESTIONS_SENTINEL,
    )
}

/// Generates the prompt requesting a short list of activity suggestions
///
/// The list contract carries no exclusions; the request's exclusion list
/// is ignored here.
///
/// # Arguments
///
/// * `request` - Place, optional country and dates
///
/// # Returns
///
/// The complete prompt text
pub fn generate_list_prompt(request: &SuggestionRequest) -> String {
    let place = place_with_country(request);
    let date_context = date_context(request);

    format!(
        r#"You are an expert travel guide.
Provide up to {cap} short travel activity suggestions for {place}.

{date_context}Each suggestion may be a key attraction, food or cultural experience.
Use only short phrases, names of places, foods, or activities. No extra descriptions.
Each must be a single bullet-style short phrase (no more than 10 words).
Write one suggestion per line.

If "{name}" is not a known or valid travel destination, reply only with:
{sentinel}

No extra text."#,
        cap = MAX_LIST_SUGGESTIONS,
        place = place,
        date_context = date_context,
        name = request.place,
        sentinel = NO_SUGGESTIONS_SENTINEL,
    )
}

fn place_with_country(request: &SuggestionRequest) -> String {
    match &request.country {
        Some(country) if !country.trim().is_empty() => {
            format!("{}, {}", request.place, country)
        }
        _ => request.place.clone(),
    }
}

/// Optional date lines; empty when the request carries no dates
fn date_context(request: &SuggestionRequest) -> String {
    let mut lines = String::new();

    if let Some(start) = request.start_date {
        lines.push_str(&format!(
            "The voyage starting date is {}.\n",
            format_date(start)
        ));
    }
    if let Some(end) = request.end_date {
        lines.push_str(&format!(
            "The voyage ending date is {}.\n",
            format_date(end)
        ));
    }
    if !lines.is_empty() {
        lines.push_str(&format!(
            "The dates should not be limiting; only use them if specific, worthy activities occur in these dates in {}.\n\n",
            request.place
        ));
    }

    lines
}
