//! Plain-text rendering of controller state.

use std::fmt::Write;

use crate::controller::ViewState;
use crate::script::{Language, Script};

/// Render one script, tagged with the language it is written in.
pub fn render_script(script: &Script, language: Language) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} [{}] ===", script.title, language);
    let _ = writeln!(out, "Characters: {}", script.characters);
    let _ = writeln!(out, "Scene: {}", script.scene_setup);
    let _ = writeln!(out);
    for line in &script.dialogue {
        let _ = writeln!(out, "{}: {}", line.character, line.line);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Punchline: {}", script.punchline);
    out
}

/// Render the whole view: loading indicators, error, script and translations.
pub fn render_view(state: &ViewState) -> String {
    let mut out = String::new();

    if state.pending_generate {
        let _ = writeln!(out, "Writing your script...");
    }
    if let Some(error) = &state.last_error {
        let _ = writeln!(out, "Error: {}", error);
    }

    let (Some(script), Some(language)) = (&state.current_script, state.script_language) else {
        return out;
    };

    out.push_str(&render_script(script, language));

    for target in language.translation_targets() {
        if let Some(translated) = state.translations.get(&target) {
            let _ = writeln!(out);
            out.push_str(&render_script(translated, target));
        } else if state.is_translating(target) {
            let _ = writeln!(out, "\nTranslating to {}...", target);
        }
    }

    out
}
