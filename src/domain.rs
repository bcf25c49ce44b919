//! Domain models: the vocabulary pair and the drill direction.

use serde::{Deserialize, Serialize};

/// One English term with its Chinese meaning. Both sides are non-empty.
/// Pool and learned-set membership is keyed by `english`, exactly as parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
  pub english: String,
  pub chinese: String,
}

impl WordPair {
  pub fn new(english: impl Into<String>, chinese: impl Into<String>) -> Self {
    Self { english: english.into(), chinese: chinese.into() }
  }
}

/// Which side is shown and which one the learner has to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  /// Show English, expect Chinese.
  EnToZh,
  /// Show Chinese, expect English.
  ZhToEn,
}

impl Direction {
  /// The side presented to the learner.
  pub fn known<'a>(&self, pair: &'a WordPair) -> &'a str {
    match self {
      Direction::EnToZh => &pair.english,
      Direction::ZhToEn => &pair.chinese,
    }
  }

  /// The side the learner has to supply.
  pub fn unknown<'a>(&self, pair: &'a WordPair) -> &'a str {
    match self {
      Direction::EnToZh => &pair.chinese,
      Direction::ZhToEn => &pair.english,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Direction::EnToZh => "English → Chinese",
      Direction::ZhToEn => "Chinese → English",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn direction_picks_sides() {
    let p = WordPair::new("cat", "猫");
    assert_eq!(Direction::EnToZh.known(&p), "cat");
    assert_eq!(Direction::EnToZh.unknown(&p), "猫");
    assert_eq!(Direction::ZhToEn.known(&p), "猫");
    assert_eq!(Direction::ZhToEn.unknown(&p), "cat");
  }

  #[test]
  fn direction_wire_names() {
    assert_eq!(serde_json::to_string(&Direction::EnToZh).unwrap(), "\"en_to_zh\"");
    let d: Direction = serde_json::from_str("\"zh_to_en\"").unwrap();
    assert_eq!(d, Direction::ZhToEn);
  }
}
