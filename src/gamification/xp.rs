use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// XP awarded for a mode that is not in the table
pub const DEFAULT_XP: i64 = 5;

/// Study activity modes a session can be recorded under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudyMode {
  Text,
  Visual,
  Audio,
  Map,
  Pomodoro,
  Inspiration,
  Research,
  Explanation,
  Elaboration,
  Evaluation,
  VoiceTutor,
  Video,
}

impl StudyMode {
  pub const ALL: [StudyMode; 12] = [
    StudyMode::Text,
    StudyMode::Visual,
    StudyMode::Audio,
    StudyMode::Map,
    StudyMode::Pomodoro,
    StudyMode::Inspiration,
    StudyMode::Research,
    StudyMode::Explanation,
    StudyMode::Elaboration,
    StudyMode::Evaluation,
    StudyMode::VoiceTutor,
    StudyMode::Video,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      StudyMode::Text => "text",
      StudyMode::Visual => "visual",
      StudyMode::Audio => "audio",
      StudyMode::Map => "map",
      StudyMode::Pomodoro => "pomodoro",
      StudyMode::Inspiration => "inspiration",
      StudyMode::Research => "research",
      StudyMode::Explanation => "explanation",
      StudyMode::Elaboration => "elaboration",
      StudyMode::Evaluation => "evaluation",
      StudyMode::VoiceTutor => "voice-tutor",
      StudyMode::Video => "video",
    }
  }

  pub fn xp(self) -> i64 {
    match self {
      StudyMode::Text => 5,
      StudyMode::Visual => 10,
      StudyMode::Audio => 5,
      StudyMode::Map => 15,
      StudyMode::Pomodoro => 20,
      StudyMode::Inspiration => 2,
      StudyMode::Research => 8,
      StudyMode::Explanation => 10,
      StudyMode::Elaboration => 15,
      StudyMode::Evaluation => 20,
      StudyMode::VoiceTutor => 25,
      StudyMode::Video => 15,
    }
  }
}

impl fmt::Display for StudyMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StudyMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    StudyMode::ALL
      .into_iter()
      .find(|mode| mode.as_str() == s)
      .ok_or_else(|| format!("Unknown study mode: {}", s))
  }
}

/// XP for a mode name; unknown names earn [`DEFAULT_XP`]
pub fn xp_for_mode(mode: &str) -> i64 {
  mode.parse::<StudyMode>().map(StudyMode::xp).unwrap_or(DEFAULT_XP)
}
