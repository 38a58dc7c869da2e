/*!
 * Mock translator implementations for testing and dry runs.
 *
 * Each behavior simulates one way a real backend misbehaves:
 * - `MockTranslator::working()` - Translates every item
 * - `MockTranslator::reordering()` - Returns items in reverse order
 * - `MockTranslator::omitting(ids)` - Never returns the given ids
 * - `MockTranslator::hallucinating(id)` - Adds an id that was never requested
 * - `MockTranslator::failing()` - Always fails with a provider error
 * - `MockTranslator::scripted(rounds)` - Replays fixed responses per request
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::providers::{TranslatedItem, TranslationItem, Translator};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Translates every requested item, in request order
    Working,
    /// Translates every item but returns them reversed
    Reordering,
    /// Never returns the listed ids
    Omitting { ids: Vec<usize> },
    /// Omits the listed ids on the first request only
    OmittingOnce { ids: Vec<usize> },
    /// Returns everything plus an id that was never requested
    Hallucinating { extra_id: usize },
    /// Returns every item twice, the second copy with different text
    Duplicating,
    /// Returns an empty list (an unparseable reply)
    Garbled,
    /// Always fails with an error
    Failing,
    /// Succeeds `successes` times, then fails
    FailingAfter { successes: usize },
    /// Replays one canned response per request, then returns nothing
    Scripted { rounds: Vec<Vec<TranslatedItem>> },
}

/// Mock translator for testing reconciliation behavior
#[derive(Debug, Clone)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Ids of every request received, in order
    requests: Arc<Mutex<Vec<Vec<usize>>>>,
    /// Fixed translations by source text
    dictionary: HashMap<String, String>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            dictionary: HashMap::new(),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn reordering() -> Self {
        Self::new(MockBehavior::Reordering)
    }

    pub fn omitting(ids: &[usize]) -> Self {
        Self::new(MockBehavior::Omitting { ids: ids.to_vec() })
    }

    pub fn omitting_once(ids: &[usize]) -> Self {
        Self::new(MockBehavior::OmittingOnce { ids: ids.to_vec() })
    }

    pub fn hallucinating(extra_id: usize) -> Self {
        Self::new(MockBehavior::Hallucinating { extra_id })
    }

    pub fn duplicating() -> Self {
        Self::new(MockBehavior::Duplicating)
    }

    pub fn garbled() -> Self {
        Self::new(MockBehavior::Garbled)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn failing_after(successes: usize) -> Self {
        Self::new(MockBehavior::FailingAfter { successes })
    }

    pub fn scripted(rounds: Vec<Vec<TranslatedItem>>) -> Self {
        Self::new(MockBehavior::Scripted { rounds })
    }

    /// Use fixed translations for known source texts
    pub fn with_dictionary<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionary = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Ids of each request received, in order
    pub fn requested_ids(&self) -> Vec<Vec<usize>> {
        self.requests.lock().clone()
    }

    fn translate_item(&self, item: &TranslationItem, target_language: &str) -> TranslatedItem {
        let translation = self
            .dictionary
            .get(&item.text)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", target_language, item.text));
        TranslatedItem::new(item.id, translation)
    }

    fn translate_all(&self, items: &[TranslationItem], target_language: &str) -> Vec<TranslatedItem> {
        items
            .iter()
            .map(|item| self.translate_item(item, target_language))
            .collect()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate_batch(
        &self,
        items: &[TranslationItem],
        target_language: &str,
    ) -> Result<Vec<TranslatedItem>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(items.iter().map(|i| i.id).collect());

        match &self.behavior {
            MockBehavior::Working => Ok(self.translate_all(items, target_language)),

            MockBehavior::Reordering => {
                let mut translated = self.translate_all(items, target_language);
                translated.reverse();
                Ok(translated)
            }

            MockBehavior::Omitting { ids } => Ok(items
                .iter()
                .filter(|item| !ids.contains(&item.id))
                .map(|item| self.translate_item(item, target_language))
                .collect()),

            MockBehavior::OmittingOnce { ids } => Ok(items
                .iter()
                .filter(|item| count > 0 || !ids.contains(&item.id))
                .map(|item| self.translate_item(item, target_language))
                .collect()),

            MockBehavior::Hallucinating { extra_id } => {
                let mut translated = self.translate_all(items, target_language);
                translated.insert(0, TranslatedItem::new(*extra_id, "invented line"));
                Ok(translated)
            }

            MockBehavior::Duplicating => Ok(items
                .iter()
                .flat_map(|item| {
                    [
                        self.translate_item(item, target_language),
                        TranslatedItem::new(item.id, format!("duplicate of {}", item.id)),
                    ]
                })
                .collect()),

            MockBehavior::Garbled => Ok(Vec::new()),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),

            MockBehavior::FailingAfter { successes } => {
                if count < *successes {
                    Ok(self.translate_all(items, target_language))
                } else {
                    Err(ProviderError::RateLimitExceeded(format!(
                        "Simulated quota exhaustion (request #{})",
                        count + 1
                    )))
                }
            }

            MockBehavior::Scripted { rounds } => Ok(rounds.get(count).cloned().unwrap_or_default()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
