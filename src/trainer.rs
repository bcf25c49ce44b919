//! One learner's workspace: the loaded vocabulary, the quiz session and the
//! export allocator.
//!
//! The store is shared read-only between the quiz and the allocator. A reload
//! replaces all three together; a failed load leaves them untouched.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::allocator::ExportAllocator;
use crate::error::{Result, TrainerError};
use crate::session::{LearningSession, SessionStats};
use crate::store::VocabularyStore;

#[derive(Debug, Default)]
pub struct Trainer {
    session: LearningSession,
    allocator: Option<ExportAllocator>,
}

impl Trainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` and, only on success, install it as the new vocabulary.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load_path(&mut self, path: &Path) -> Result<usize> {
        let store = VocabularyStore::load(path)?;
        Ok(self.install(store))
    }

    /// Replace the vocabulary; learned set, round queue and export pools start empty.
    pub fn install(&mut self, store: VocabularyStore) -> usize {
        let store = Arc::new(store);
        self.session.load(Arc::clone(&store));
        self.allocator = Some(ExportAllocator::new(Arc::clone(&store)));
        let total = store.len();
        info!(target: "vocab", total, "Vocabulary installed");
        total
    }

    pub fn session(&self) -> &LearningSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut LearningSession {
        &mut self.session
    }

    pub fn allocator(&self) -> Result<&ExportAllocator> {
        self.allocator.as_ref().ok_or(TrainerError::NoVocabulary)
    }

    pub fn allocator_mut(&mut self) -> Result<&mut ExportAllocator> {
        self.allocator.as_mut().ok_or(TrainerError::NoVocabulary)
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, WordPair};
    use crate::session::SessionState;
    use crate::util::scratch_dir;

    #[test]
    fn failed_reload_keeps_previous_state() {
        let dir = scratch_dir();
        let good = dir.join("words.txt");
        std::fs::write(&good, "cat 猫\ndog 狗\n").unwrap();

        let mut t = Trainer::new();
        assert!(matches!(t.allocator(), Err(TrainerError::NoVocabulary)));
        assert_eq!(t.load_path(&good).unwrap(), 2);
        t.session_mut().choose_direction(Direction::EnToZh).unwrap();
        t.allocator_mut().unwrap().allocate(Direction::EnToZh, 1, 1).unwrap();

        let bad = dir.join("words.pdf");
        std::fs::write(&bad, "cat 猫\n").unwrap();
        assert!(matches!(t.load_path(&bad), Err(TrainerError::UnsupportedFormat { .. })));
        let empty = dir.join("empty.md");
        std::fs::write(&empty, "# nothing\n").unwrap();
        assert!(matches!(t.load_path(&empty), Err(TrainerError::NoPairs { .. })));

        assert_eq!(t.stats().total, 2);
        assert_eq!(t.session().state(), SessionState::Active);
        assert_eq!(t.allocator().unwrap().remaining(Direction::EnToZh), 1);
    }

    #[test]
    fn reload_resets_quiz_and_pools() {
        let mut t = Trainer::new();
        t.install(VocabularyStore::new(vec![WordPair::new("cat", "猫"), WordPair::new("dog", "狗")]));
        t.session_mut().choose_direction(Direction::ZhToEn).unwrap();
        let english = t.session().current().unwrap().english.clone();
        assert!(t.session_mut().submit(&english).unwrap().correct);
        t.allocator_mut().unwrap().allocate(Direction::ZhToEn, 2, 1).unwrap();

        t.install(VocabularyStore::new(vec![WordPair::new("cat", "猫"), WordPair::new("dog", "狗")]));
        assert_eq!(t.session().state(), SessionState::Ready);
        assert_eq!(t.stats().learned, 0);
        assert_eq!(t.allocator().unwrap().remaining(Direction::ZhToEn), 2);
    }
}
