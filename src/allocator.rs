//! Dictation batch allocation with one "already exported" pool per direction.
//!
//! Every batch draws from the pairs whose English key is not yet in the pool
//! for its direction. An exhausted pool is cleared (a full pass is done) and the
//! batch is drawn from the whole vocabulary again. When fewer unused pairs are
//! left than the batch needs, the shortfall is topped up with random pairs that
//! were already exported.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::{IteratorRandom, SliceRandom};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Direction, WordPair};
use crate::error::{Result, TrainerError};
use crate::store::VocabularyStore;

/// One generated set.
#[derive(Clone, Debug, Serialize)]
pub struct Batch {
  /// 1-based position within the request.
  pub set_number: usize,
  pub pairs: Vec<WordPair>,
  /// The pool was exhausted and cleared before this batch was drawn.
  pub was_pool_reset: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct Allocation {
  pub direction: Direction,
  pub batches: Vec<Batch>,
  /// Pairs still absent from the pool after the last batch.
  pub remaining: usize,
}

/// Outcome of the caller-side precondition check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Capacity {
  /// Every set can be filled without repeating a word across sets.
  Fits,
  /// Some words will repeat across sets; the learner has to agree first.
  NeedsConfirmation { max_unique_sets: usize },
}

#[derive(Debug)]
pub struct ExportAllocator {
  store: Arc<VocabularyStore>,
  en_to_zh: HashSet<String>,
  zh_to_en: HashSet<String>,
}

impl ExportAllocator {
  pub fn new(store: Arc<VocabularyStore>) -> Self {
    Self { store, en_to_zh: HashSet::new(), zh_to_en: HashSet::new() }
  }

  /// Hard reject when a single batch is larger than the vocabulary; soft warning
  /// when all sets together are.
  pub fn check_request(&self, batch_size: usize, sets: usize) -> Result<Capacity> {
    let total = self.store.len();
    if batch_size == 0 || sets == 0 {
      return Err(TrainerError::InvalidRequest("batch size and set count must be at least 1".into()));
    }
    if batch_size > total {
      return Err(TrainerError::BatchTooLarge { requested: batch_size, available: total });
    }
    if batch_size.saturating_mul(sets) > total {
      return Ok(Capacity::NeedsConfirmation { max_unique_sets: total / batch_size });
    }
    Ok(Capacity::Fits)
  }

  fn pool(&self, direction: Direction) -> &HashSet<String> {
    match direction {
      Direction::EnToZh => &self.en_to_zh,
      Direction::ZhToEn => &self.zh_to_en,
    }
  }

  fn pool_mut(&mut self, direction: Direction) -> &mut HashSet<String> {
    match direction {
      Direction::EnToZh => &mut self.en_to_zh,
      Direction::ZhToEn => &mut self.zh_to_en,
    }
  }

  /// Pairs not yet exported in `direction`.
  pub fn remaining(&self, direction: Direction) -> usize {
    let pool = self.pool(direction);
    self.store.iter().filter(|p| !pool.contains(&p.english)).count()
  }

  /// Draw `sets` batches of `batch_size` pairs for `direction`, updating its pool.
  /// Repeat confirmation is the caller's job; only the hard precondition is
  /// checked again here.
  #[instrument(level = "info", skip(self), fields(vocabulary = self.store.len()))]
  pub fn allocate(&mut self, direction: Direction, batch_size: usize, sets: usize) -> Result<Allocation> {
    self.check_request(batch_size, sets)?;

    let store = Arc::clone(&self.store);
    let mut rng = rand::thread_rng();
    let mut batches = Vec::with_capacity(sets);

    for set_number in 1..=sets {
      let pool = self.pool_mut(direction);

      let mut available: Vec<usize> = (0..store.len())
        .filter(|&i| !pool.contains(&store.pairs()[i].english))
        .collect();

      let mut was_pool_reset = false;
      if available.is_empty() {
        pool.clear();
        available = (0..store.len()).collect();
        was_pool_reset = true;
        info!(target: "export", ?direction, set_number, "Export pool exhausted; starting a new pass");
      }

      if available.len() < batch_size {
        let shortfall = batch_size - available.len();
        let unused: HashSet<usize> = available.iter().copied().collect();
        let topup = (0..store.len())
          .filter(|i| !unused.contains(i))
          .choose_multiple(&mut rng, shortfall);
        debug!(target: "export", ?direction, set_number, unused = available.len(), topup = topup.len(), "Topping up batch with exported words");
        available.extend(topup);

        if available.len() < batch_size {
          // Only reachable when the batch outgrows the vocabulary; picks may
          // then repeat within one batch.
          let still = batch_size - available.len();
          warn!(target: "export", ?direction, set_number, still, "Batch exceeds vocabulary; sampling with replacement");
          available.extend((0..store.len()).choose_multiple(&mut rng, still));
        }
      }

      let picked: Vec<usize> = available.choose_multiple(&mut rng, batch_size).copied().collect();
      let pairs: Vec<WordPair> = picked.iter().map(|&i| store.pairs()[i].clone()).collect();
      for pair in &pairs {
        pool.insert(pair.english.clone());
      }

      batches.push(Batch { set_number, pairs, was_pool_reset });
    }

    let remaining = self.remaining(direction);
    info!(target: "export", ?direction, sets, batch_size, remaining, "Allocation finished");
    Ok(Allocation { direction, batches, remaining })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn allocator(n: usize) -> ExportAllocator {
    let pairs = (0..n).map(|i| WordPair::new(format!("w{i}"), format!("词{i}"))).collect();
    ExportAllocator::new(Arc::new(VocabularyStore::new(pairs)))
  }

  fn keys(batch: &Batch) -> HashSet<String> {
    batch.pairs.iter().map(|p| p.english.clone()).collect()
  }

  #[test]
  fn request_checks() {
    let a = allocator(10);
    assert_eq!(a.check_request(5, 2).unwrap(), Capacity::Fits);
    assert_eq!(a.check_request(4, 3).unwrap(), Capacity::NeedsConfirmation { max_unique_sets: 2 });
    assert!(matches!(a.check_request(11, 1), Err(TrainerError::BatchTooLarge { requested: 11, available: 10 })));
    assert!(matches!(a.check_request(0, 1), Err(TrainerError::InvalidRequest(_))));
    assert!(matches!(a.check_request(1, 0), Err(TrainerError::InvalidRequest(_))));
  }

  #[test]
  fn full_vocabulary_batch_then_reset() {
    let mut a = allocator(6);
    let first = a.allocate(Direction::EnToZh, 6, 1).unwrap();
    assert_eq!(keys(&first.batches[0]).len(), 6);
    assert!(!first.batches[0].was_pool_reset);
    assert_eq!(first.remaining, 0);

    let second = a.allocate(Direction::EnToZh, 6, 1).unwrap();
    assert!(second.batches[0].was_pool_reset);
    assert_eq!(keys(&second.batches[0]).len(), 6);
    assert_eq!(second.remaining, 0);
  }

  #[test]
  fn directions_do_not_share_pools() {
    let mut a = allocator(4);
    a.allocate(Direction::EnToZh, 4, 1).unwrap();
    assert_eq!(a.remaining(Direction::EnToZh), 0);
    assert_eq!(a.remaining(Direction::ZhToEn), 4);

    let other = a.allocate(Direction::ZhToEn, 2, 1).unwrap();
    assert!(!other.batches[0].was_pool_reset);
    assert_eq!(other.remaining, 2);
    assert_eq!(a.remaining(Direction::EnToZh), 0);
  }

  #[test]
  fn shortfall_is_topped_up_from_exported_words() {
    let mut a = allocator(5);
    let out = a.allocate(Direction::ZhToEn, 3, 2).unwrap();
    let first = keys(&out.batches[0]);
    let second = keys(&out.batches[1]);
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert!(!out.batches[1].was_pool_reset);

    // the two unused words are both in the second batch, plus one repeat
    let unused_after_first: HashSet<String> =
      (0..5).map(|i| format!("w{i}")).filter(|k| !first.contains(k)).collect();
    assert!(unused_after_first.is_subset(&second));
    assert_eq!(second.intersection(&first).count(), 1);
    assert_eq!(out.remaining, 0);
  }

  #[test]
  fn batches_within_capacity_never_repeat() {
    let mut a = allocator(12);
    let out = a.allocate(Direction::EnToZh, 4, 3).unwrap();
    let mut all = HashSet::new();
    for b in &out.batches {
      assert_eq!(b.pairs.len(), 4);
      for k in keys(b) {
        assert!(all.insert(k), "word repeated before the pool was exhausted");
      }
    }
    assert_eq!(out.remaining, 0);
    assert_eq!(out.batches.iter().map(|b| b.set_number).collect::<Vec<_>>(), vec![1, 2, 3]);
  }

  #[test]
  fn duplicate_keys_count_once_in_the_pool() {
    let pairs = vec![WordPair::new("cat", "猫"), WordPair::new("cat", "猫咪"), WordPair::new("dog", "狗")];
    let mut a = ExportAllocator::new(Arc::new(VocabularyStore::new(pairs)));
    let out = a.allocate(Direction::EnToZh, 1, 1).unwrap();
    let picked = &out.batches[0].pairs[0].english;
    let expected = if picked == "cat" { 1 } else { 2 };
    assert_eq!(out.remaining, expected);
  }

  #[test]
  fn oversized_batch_is_rejected_before_touching_the_pool() {
    let mut a = allocator(3);
    assert!(a.allocate(Direction::EnToZh, 4, 1).is_err());
    assert_eq!(a.remaining(Direction::EnToZh), 3);
  }
}
