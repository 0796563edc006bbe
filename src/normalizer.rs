use crate::classifier::TriggerConfig;

/// Separator the transport puts between a quoted message and the new reply.
pub const QUOTE_SEPARATOR: &str = "- - - - - - - - - - - - - - -";

/// Strip the quoted original and the trigger phrase from a raw message.
///
/// Keeps only the text after the last quote separator, then removes the
/// first occurrence of the trigger phrase. Nothing is removed when the
/// phrase is absent or empty.
pub fn clean(raw_text: &str, is_direct: bool, trigger: &TriggerConfig) -> String {
    let text = raw_text
        .rsplit_once(QUOTE_SEPARATOR)
        .map_or(raw_text, |(_, after)| after);

    match trigger.trigger_phrase(is_direct) {
        Some(phrase) if !phrase.is_empty() => text.replacen(&phrase, "", 1),
        _ => text.to_string(),
    }
}
