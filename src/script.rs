//! Script data model shared by the controller, the Gemini client and the renderer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target language style for a generated or translated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    Bangla,
    Hindi,
    #[default]
    Hinglish,
}

impl Language {
    /// Every supported language, in display order.
    pub const ALL: [Language; 3] = [Language::Bangla, Language::Hindi, Language::Hinglish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Bangla => "Bangla",
            Language::Hindi => "Hindi",
            Language::Hinglish => "Hinglish",
        }
    }

    /// Languages a script written in `self` can be translated into.
    pub fn translation_targets(&self) -> impl Iterator<Item = Language> + '_ {
        Language::ALL.into_iter().filter(move |l| l != self)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "Unknown language '{}'. Available languages: bangla, hindi, hinglish",
                    s
                )
            })
    }
}

/// One spoken line of the skit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    pub character: String,
    pub line: String,
}

/// A generated comedic script.
///
/// Field names on the wire follow the model's response schema, so the
/// dialogue array is called `script` there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub characters: String,
    #[serde(rename = "sceneSetup")]
    pub scene_setup: String,
    #[serde(rename = "script")]
    pub dialogue: Vec<Dialogue>,
    pub punchline: String,
}
