//! Prompt templates for LLM usage.

use chrono::NaiveDate;

/// Extraction directive.
///
/// Placeholders: `{current_date}`, `{timezone}`, `{message}`.
pub const EXTRACTION_DIRECTIVE: &str = r#####"
You are an intelligent assistant that extracts calendar event details from text.
The output MUST be a valid JSON object.
The JSON object must have the following keys:
- "title": (string) The title or summary of the event.
- "description": (string) A more detailed description of the event.
- "start_datetime": (string) The start date and time in ISO 8601 format (YYYY-MM-DDTHH:MM:SS), in {timezone}.
- "end_datetime": (string) The end date and time in ISO 8601 format (YYYY-MM-DDTHH:MM:SS), in {timezone}.
- "duration": (string, optional) The duration of the event, formatted as HH:mm.
- "location": (string, optional) The location of the event.

Guidelines:
- If a value for an optional field (description, duration, location) is not present, use null or omit the key.
- If only a date is provided for the start, assume it's an all-day event for that date. For example, "event on 2025-12-25" means start_datetime: "2025-12-25T00:00:00" and end_datetime: "2025-12-25T23:59:59".
- If only a start time is provided without a specific date, infer the date from context like "today" or "tomorrow". The current date is {current_date}.
- If only a start datetime is provided, assume the event is 1 hour long for the end_datetime.
- If the text does not seem to describe a calendar event, return an empty JSON object {}.

NOTE: all datetimes MUST be expressed in {timezone}.

Parse the following text:
"{message}"

JSON Output:
"#####;

/// Build the extraction prompt for a message.
///
/// Pure function of its inputs; the date is rendered as `YYYY-MM-DD`.
pub fn build_extraction_prompt(directive: &str, text: &str, current_date: NaiveDate, timezone: &str) -> String {
    // The message goes in last so that braces in user text are never re-expanded.
    directive
        .replace("{current_date}", &current_date.format("%Y-%m-%d").to_string())
        .replace("{timezone}", timezone)
        .replace("{message}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_prompt_embeds_text_date_and_timezone() {
        let prompt = build_extraction_prompt(EXTRACTION_DIRECTIVE, "lunch with Sam tomorrow at noon", date(), "EDT");

        assert!(prompt.contains("\"lunch with Sam tomorrow at noon\""));
        assert!(prompt.contains("The current date is 2025-03-07."));
        assert!(prompt.contains("all datetimes MUST be expressed in EDT"));
        assert!(!prompt.contains("{current_date}"));
        assert!(!prompt.contains("{timezone}"));
        assert!(!prompt.contains("{message}"));
    }

    #[test]
    fn test_prompt_encodes_the_contract_and_rules() {
        let prompt = build_extraction_prompt(EXTRACTION_DIRECTIVE, "event on 2025-12-25", date(), "EDT");

        for key in ["\"title\"", "\"description\"", "\"start_datetime\"", "\"end_datetime\"", "\"duration\"", "\"location\""] {
            assert!(prompt.contains(key), "missing key {key}");
        }

        assert!(prompt.contains("start_datetime: \"2025-12-25T00:00:00\" and end_datetime: \"2025-12-25T23:59:59\""));
        assert!(prompt.contains("1 hour long"));
        assert!(prompt.contains("return an empty JSON object {}"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_extraction_prompt(EXTRACTION_DIRECTIVE, "dentist friday 3pm", date(), "PST");
        let b = build_extraction_prompt(EXTRACTION_DIRECTIVE, "dentist friday 3pm", date(), "PST");

        assert_eq!(a, b);
    }

    #[test]
    fn test_placeholders_in_message_text_are_left_alone() {
        let prompt = build_extraction_prompt("date={current_date} text={message}", "say {current_date}", date(), "EDT");

        assert_eq!(prompt, "date=2025-03-07 text=say {current_date}");
    }
}
