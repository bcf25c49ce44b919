//! Quiz loop over one loaded vocabulary.
//!
//! A pass presents every not-yet-learned pair once, in shuffled order. When the
//! round queue runs dry it is rebuilt from the pairs still missing from the
//! learned set; once nothing is left the session reports a completed pass and
//! stays there until a reload.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{Direction, WordPair};
use crate::error::{Result, TrainerError};
use crate::store::VocabularyStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
  /// No vocabulary loaded.
  Idle,
  /// Vocabulary loaded, no direction chosen.
  Ready,
  /// A current word is presented.
  Active,
  /// Every pair has been learned; input is disabled.
  RoundComplete,
}

/// Result of moving to the next word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
  Presented(WordPair),
  PassComplete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
  pub correct: bool,
  /// The side the learner had to produce.
  pub expected: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStats {
  pub total: usize,
  pub learned: usize,
  /// Pairs left in the current round queue.
  pub remaining: usize,
}

#[derive(Debug, Default)]
pub struct LearningSession {
  store: Option<Arc<VocabularyStore>>,
  learned: HashSet<String>,
  queue: VecDeque<WordPair>,
  direction: Option<Direction>,
  current: Option<WordPair>,
  answer_shown: bool,
  pass_complete: bool,
}

impl LearningSession {
  /// Install a freshly loaded vocabulary. Learned set, queue and direction start over.
  pub fn load(&mut self, store: Arc<VocabularyStore>) {
    *self = Self { store: Some(store), ..Self::default() };
  }

  pub fn state(&self) -> SessionState {
    match (&self.store, self.direction) {
      (None, _) => SessionState::Idle,
      (Some(_), None) => SessionState::Ready,
      (Some(_), Some(_)) if self.pass_complete => SessionState::RoundComplete,
      (Some(_), Some(_)) => SessionState::Active,
    }
  }

  pub fn direction(&self) -> Option<Direction> {
    self.direction
  }

  pub fn current(&self) -> Option<&WordPair> {
    self.current.as_ref()
  }

  /// Switch (or pick) the quiz direction and present the next word.
  /// The learned set and the remaining queue are kept.
  #[instrument(level = "debug", skip(self))]
  pub fn choose_direction(&mut self, direction: Direction) -> Result<Advance> {
    if self.store.is_none() {
      return Err(TrainerError::NoVocabulary);
    }
    self.direction = Some(direction);
    self.current = None;
    self.advance()
  }

  /// Present the next word, rebuilding the round queue when it is empty.
  pub fn advance(&mut self) -> Result<Advance> {
    let store = self.store.clone().ok_or(TrainerError::NoVocabulary)?;
    if self.direction.is_none() {
      return Err(TrainerError::NoDirection);
    }

    if self.queue.is_empty() {
      self.rebuild_queue(&store);
    }

    self.answer_shown = false;
    match self.queue.pop_front() {
      Some(pair) => {
        self.pass_complete = false;
        self.current = Some(pair.clone());
        Ok(Advance::Presented(pair))
      }
      None => {
        if !self.pass_complete {
          info!(target: "vocab", total = store.len(), "All words learned");
        }
        self.pass_complete = true;
        self.current = None;
        Ok(Advance::PassComplete)
      }
    }
  }

  fn rebuild_queue(&mut self, store: &VocabularyStore) {
    let mut round: Vec<WordPair> = store
      .iter()
      .filter(|p| !self.learned.contains(&p.english))
      .cloned()
      .collect();
    round.shuffle(&mut rand::thread_rng());
    debug!(target: "vocab", size = round.len(), learned = self.learned.len(), "Round queue rebuilt");
    self.queue = round.into();
  }

  /// Check an answer against the current word. `None` when there is no current
  /// word or the answer is blank. Does not advance.
  pub fn submit(&mut self, answer: &str) -> Option<AnswerOutcome> {
    let pair = self.current.as_ref()?;
    let direction = self.direction?;
    let answer = answer.trim();
    if answer.is_empty() {
      return None;
    }

    let correct = is_correct(direction, pair, answer);
    if correct {
      self.learned.insert(pair.english.clone());
    }
    debug!(target: "vocab", english = %pair.english, %correct, "Answer checked");
    Some(AnswerOutcome { correct, expected: direction.unknown(pair).to_string() })
  }

  /// The expected answer for the current word, if any.
  pub fn answer(&self) -> Option<&str> {
    let direction = self.direction?;
    self.current().map(|p| direction.unknown(p))
  }

  pub fn answer_shown(&self) -> bool {
    self.answer_shown
  }

  pub fn reveal_answer(&mut self) -> Option<&str> {
    self.current.as_ref()?;
    self.answer_shown = true;
    self.answer()
  }

  pub fn hide_answer(&mut self) {
    self.answer_shown = false;
  }

  /// Single-button variant: flips the flag and returns the new state.
  pub fn toggle_answer(&mut self) -> bool {
    if self.answer_shown {
      self.hide_answer();
    } else {
      self.reveal_answer();
    }
    self.answer_shown
  }

  pub fn stats(&self) -> SessionStats {
    SessionStats {
      total: self.store.as_ref().map_or(0, |s| s.len()),
      learned: self.learned.len(),
      remaining: self.queue.len(),
    }
  }
}

/// En→Zh accepts any case-insensitive substring of the meaning.
/// Zh→En needs the English term, case-insensitive.
pub fn is_correct(direction: Direction, pair: &WordPair, answer: &str) -> bool {
  let answer = answer.trim().to_lowercase();
  match direction {
    Direction::EnToZh => pair.chinese.to_lowercase().contains(&answer),
    Direction::ZhToEn => pair.english.to_lowercase() == answer,
  }
}
