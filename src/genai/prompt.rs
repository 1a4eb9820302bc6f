//! Prompt text and response schema sent to the model.

use serde_json::{json, Value};

use crate::script::{Language, Script};

/// Style notes appended to every prompt for a given language.
fn language_guidance(language: Language) -> &'static str {
    match language {
        Language::Bangla => "Write all dialogue in Bangla using Bengali script.",
        Language::Hindi => "Write all dialogue in Hindi using Devanagari script.",
        Language::Hinglish => {
            "Write all dialogue in Hinglish: conversational Hindi mixed with English, in Latin script."
        }
    }
}

/// Build the prompt asking for a fresh skit about `topic`.
pub fn generation_prompt(topic: &str, language: Language) -> String {
    format!(
        "You are a comedy writer. Write a short, funny dialogue skit about: \"{}\".\n\
         Use two to four characters and six to twelve lines of dialogue, ending on a punchline.\n\
         {}\n\
         Respond with JSON only: a title, a one-line list of characters, a scene setup, \
         the dialogue lines and the punchline.",
        topic.trim(),
        language_guidance(language)
    )
}

/// Build the prompt asking for `script` rewritten in `target`.
pub fn translation_prompt(script: &Script, target: Language) -> Result<String, serde_json::Error> {
    let source = serde_json::to_string_pretty(script)?;
    Ok(format!(
        "Translate the following comedy skit into {}. Keep the jokes working in the new \
         language instead of translating word for word, and keep character names unchanged.\n\
         {}\n\
         Respond with JSON only, using exactly the same structure.\n\n{}",
        target,
        language_guidance(target),
        source
    ))
}

/// JSON schema describing [`Script`], in the Gemini `responseSchema` dialect.
pub fn script_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "characters": {"type": "STRING"},
            "sceneSetup": {"type": "STRING"},
            "script": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "character": {"type": "STRING"},
                        "line": {"type": "STRING"}
                    },
                    "required": ["character", "line"]
                }
            },
            "punchline": {"type": "STRING"}
        },
        "required": ["title", "characters", "sceneSetup", "script", "punchline"]
    })
}
