#![warn(missing_docs)]
//! Async spellcheck adapter for `authoring-core`.
//!
//! # Overview
//!
//! The engine never calls a dictionary. A dispatch that needs one returns an
//! [`Effect`]; this crate runs those effects on a tokio runtime and feeds the
//! completions back as [`Action`]s through a channel.
//!
//! - **Debounce**: a lookup waits for the configured quiet period before calling the
//!   backend. A newer lookup issued meanwhile supersedes it.
//! - **Last request wins**: only the newest ticket is sent back. The engine re-checks
//!   the ticket and the target word when the completion is dispatched.
//! - **Dictionary updates**: permanent additions are forwarded to the backend in the
//!   background; session-only ignores stay inside the engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use authoring_core::{Action, Document, EditorConfig, EditorStore, Point};
//! use authoring_core_spellcheck::{SpellcheckService, WordListBackend};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let config = EditorConfig::default();
//! let backend = Arc::new(WordListBackend::new(["the", "story"]));
//! let (service, mut completions) =
//!     SpellcheckService::from_config(backend, &config, tokio::runtime::Handle::current());
//! let mut store = EditorStore::new(Document::from_text("Teh story"), config);
//!
//! service
//!     .dispatch(&mut store, Action::SpellcheckRequest { point: Some(Point::new("b0", 1)) })
//!     .unwrap();
//! if let Some(loaded) = completions.recv().await {
//!     store.dispatch(loaded).unwrap();
//! }
//! # }
//! ```

use authoring_core::{Action, CommandError, DispatchOutcome, Effect, EditorConfig, EditorStore};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

/// Spellcheck backend error.
#[derive(Debug, Error)]
pub enum SpellcheckError {
    #[error("spellcheck backend failed: {0}")]
    /// The dictionary service reported a failure.
    Backend(String),
    #[error("spellcheck backend unavailable")]
    /// The dictionary service cannot be reached.
    Unavailable,
}

/// A dictionary the service can query.
pub trait SpellcheckBackend: Send + Sync + 'static {
    /// Candidate corrections for `word`, best first. An empty list means the word is
    /// known.
    fn suggest(&self, word: &str) -> impl Future<Output = Result<Vec<String>, SpellcheckError>> + Send;

    /// Add `word` to the dictionary permanently.
    fn add_word(&self, word: &str) -> impl Future<Output = Result<(), SpellcheckError>> + Send;
}

/// Runs spellcheck effects and sends completions back as actions.
pub struct SpellcheckService<B> {
    backend: Arc<B>,
    debounce: Duration,
    latest_ticket: Arc<AtomicU64>,
    runtime: Handle,
    completions: mpsc::UnboundedSender<Action>,
}

impl<B> std::fmt::Debug for SpellcheckService<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpellcheckService")
            .field("debounce", &self.debounce)
            .field("latest_ticket", &self.latest_ticket.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<B: SpellcheckBackend> SpellcheckService<B> {
    /// Create a service. Completions arrive on the returned receiver.
    pub fn new(
        backend: Arc<B>,
        debounce: Duration,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<Action>) {
        let (completions, rx) = mpsc::unbounded_channel();
        let service = Self {
            backend,
            debounce,
            latest_ticket: Arc::new(AtomicU64::new(0)),
            runtime,
            completions,
        };
        (service, rx)
    }

    /// Create a service using the session's debounce window.
    pub fn from_config(
        backend: Arc<B>,
        config: &EditorConfig,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<Action>) {
        Self::new(backend, Duration::from_millis(config.spellcheck_debounce_ms), runtime)
    }

    /// Dispatch `action` to `store` and run the effects it produced.
    pub fn dispatch(
        &self,
        store: &mut EditorStore,
        action: Action,
    ) -> Result<DispatchOutcome, CommandError> {
        let outcome = store.dispatch(action)?;
        self.run_effects(&outcome.effects);
        Ok(outcome)
    }

    /// Start a task per effect. The handles may be awaited or dropped.
    pub fn run_effects(&self, effects: &[Effect]) -> Vec<JoinHandle<()>> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::LookupSuggestions { ticket, word } => Some(self.lookup(*ticket, word.clone())),
                Effect::UpdateDictionary { word, permanent: true } => Some(self.add_word(word.clone())),
                Effect::UpdateDictionary { word, permanent: false } => {
                    tracing::debug!(%word, "ignoring word for this session");
                    None
                }
            })
            .collect()
    }

    fn lookup(&self, ticket: u64, word: String) -> JoinHandle<()> {
        self.latest_ticket.fetch_max(ticket, Ordering::SeqCst);
        let backend = Arc::clone(&self.backend);
        let latest = Arc::clone(&self.latest_ticket);
        let completions = self.completions.clone();
        let debounce = self.debounce;

        self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != ticket {
                tracing::debug!(ticket, "spellcheck lookup superseded before it ran");
                return;
            }
            let suggestions = match backend.suggest(&word).await {
                Ok(suggestions) => suggestions,
                Err(err) => {
                    tracing::warn!(ticket, %word, error = %err, "spellcheck lookup failed");
                    return;
                }
            };
            if latest.load(Ordering::SeqCst) != ticket {
                tracing::debug!(ticket, "dropping superseded spellcheck result");
                return;
            }
            if completions
                .send(Action::SpellcheckSuggestionsLoaded { ticket, suggestions })
                .is_err()
            {
                tracing::debug!(ticket, "completion receiver dropped");
            }
        })
    }

    fn add_word(&self, word: String) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        self.runtime.spawn(async move {
            match backend.add_word(&word).await {
                Ok(()) => tracing::info!(%word, "added word to dictionary"),
                Err(err) => tracing::warn!(%word, error = %err, "failed to add word to dictionary"),
            }
        })
    }
}

/// Drain completions that already arrived into `store`. Returns how many were
/// dispatched.
pub fn apply_completions(
    store: &mut EditorStore,
    completions: &mut mpsc::UnboundedReceiver<Action>,
) -> Result<usize, CommandError> {
    let mut applied = 0;
    while let Ok(action) = completions.try_recv() {
        store.dispatch(action)?;
        applied += 1;
    }
    Ok(applied)
}

/// In-memory word list backend.
///
/// Suggestions are dictionary words within edit distance 2, closest first. A
/// capitalized query gets capitalized suggestions.
#[derive(Debug, Default)]
pub struct WordListBackend {
    words: RwLock<BTreeSet<String>>,
    lookups: AtomicUsize,
}

impl WordListBackend {
    /// Backend knowing `words` (case-insensitive).
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: RwLock::new(words.into_iter().map(|w| w.as_ref().to_lowercase()).collect()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of `suggest` calls served.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Returns `true` if `word` is in the list.
    pub async fn contains(&self, word: &str) -> bool {
        self.words.read().await.contains(&word.to_lowercase())
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

fn match_case(word: &str, candidate: &str) -> String {
    let mut chars = candidate.chars();
    match (word.chars().next(), chars.next()) {
        (Some(first), Some(head)) if first.is_uppercase() => head.to_uppercase().chain(chars).collect(),
        _ => candidate.to_string(),
    }
}

impl SpellcheckBackend for WordListBackend {
    async fn suggest(&self, word: &str) -> Result<Vec<String>, SpellcheckError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let query = word.to_lowercase();
        let words = self.words.read().await;
        if words.contains(&query) {
            return Ok(Vec::new());
        }
        let mut ranked: Vec<(usize, &String)> = words
            .iter()
            .map(|candidate| (edit_distance(&query, candidate), candidate))
            .filter(|(distance, _)| *distance <= 2)
            .collect();
        ranked.sort();
        Ok(ranked
            .into_iter()
            .map(|(_, candidate)| match_case(word, candidate))
            .collect())
    }

    async fn add_word(&self, word: &str) -> Result<(), SpellcheckError> {
        self.words.write().await.insert(word.to_lowercase());
        Ok(())
    }
}
