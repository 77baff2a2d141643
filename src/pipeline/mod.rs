//! The generation controller.
//!
//! Flow per user action: history → build request → model call → parse →
//! merge titles into history → replace the displayed batch.
//!
//! `generate` takes `&mut self`, so one controller can never have two
//! generations in flight. Stores are only touched after the call resolves.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::GenerationError;
use crate::parse::{conformance_report, parse_ideas};
use crate::prompt::{build_instruction, build_request, response_schema};
use crate::provider::{ModelCall, Provider};
use crate::store::{IdeaBatch, KvStore, LabelSet, COPIED_KEY, HISTORY_KEY};
use crate::wire::{GenerationRequest, Idea, Variant};

pub struct App<S: KvStore + Clone> {
    history: LabelSet<S>,
    copied: LabelSet<S>,
    batch: IdeaBatch<S>,
    artifacts_dir: Option<PathBuf>,
}

impl<S: KvStore + Clone> App<S> {
    pub fn new(store: S) -> Self {
        Self {
            history: LabelSet::open(store.clone(), HISTORY_KEY),
            copied: LabelSet::open(store.clone(), COPIED_KEY),
            batch: IdeaBatch::open(store),
            artifacts_dir: None,
        }
    }

    /// Save every exchange under `<dir>/runs/<uuid>/`.
    pub fn with_artifacts(mut self, dir: PathBuf) -> Self {
        self.artifacts_dir = Some(dir);
        self
    }

    /// The request the next generation would send.
    pub fn next_request(&self, variant: Variant, today: NaiveDate) -> GenerationRequest {
        build_request(variant, self.history.labels().clone(), today)
    }

    /// One attempt, no retry. On failure nothing is persisted and the
    /// previous batch stays displayed.
    pub async fn generate(
        &mut self,
        provider: &dyn Provider,
        variant: Variant,
        today: NaiveDate,
    ) -> Result<Vec<Idea>, GenerationError> {
        let req = self.next_request(variant, today);
        let call = ModelCall {
            instruction: build_instruction(&req),
            schema: response_schema(variant),
            temperature: req.temperature,
        };
        info!(
            variant = variant.name(),
            excluded = req.excluded_labels.len(),
            "requesting {} ideas",
            variant.idea_count()
        );

        let raw = provider.generate(&call).await.map_err(|e| {
            warn!(error = %e, "generation failed");
            e
        })?;

        if let Some(dir) = &self.artifacts_dir {
            match crate::log::save_exchange(dir, Uuid::new_v4(), &call, &raw) {
                Ok(saved) => info!(
                    run = %saved.dir.display(),
                    request = %saved.request.display(),
                    response = %saved.response.display(),
                    "saved exchange"
                ),
                Err(e) => warn!(error = %e, "could not save exchange"),
            }
        }

        let ideas = parse_ideas(&raw).map_err(|e| {
            warn!(error = %e, "rejected model output");
            e
        })?;

        let report = conformance_report(&ideas, variant);
        if !report.is_clean() {
            for w in report.warnings() {
                warn!("model output deviates: {}", w);
            }
        }

        self.history.merge(ideas.iter().map(|i| i.object.clone()));
        self.batch.replace(ideas.clone());
        info!(received = ideas.len(), history = self.history.len(), "generation complete");
        Ok(ideas)
    }

    pub fn ideas(&self) -> &[Idea] {
        self.batch.ideas()
    }

    pub fn history(&self) -> &BTreeSet<String> {
        self.history.labels()
    }

    pub fn clear_history(&mut self) {
        if self.history.is_empty() {
            return;
        }
        self.history.clear();
    }

    pub fn is_copied(&self, prompt: &str) -> bool {
        self.copied.contains(prompt)
    }

    pub fn mark_copied(&mut self, prompt: &str) -> bool {
        self.copied.insert(prompt)
    }

    /// Marks idea `index` (1-based) of the current batch copied and returns it.
    pub fn copy(&mut self, index: usize) -> Option<Idea> {
        let idea = index
            .checked_sub(1)
            .and_then(|i| self.batch.ideas().get(i))
            .cloned()?;
        self.mark_copied(&idea.prompt);
        Some(idea)
    }

    /// Export is unlocked once every displayed prompt has been copied.
    pub fn all_copied(&self) -> bool {
        let ideas = self.batch.ideas();
        !ideas.is_empty() && ideas.iter().all(|i| self.copied.contains(&i.prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DynProvider;
    use crate::store::MemoryKvStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Replays canned replies and records each instruction it was sent.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Provider for Scripted {
        async fn generate(&self, call: &ModelCall) -> Result<String, GenerationError> {
            self.seen.lock().push(call.instruction.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Transport("no more replies".into())))
        }
    }

    fn scripted(
        replies: Vec<Result<String, GenerationError>>,
    ) -> (DynProvider, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = Scripted { replies: Mutex::new(replies.into()), seen: seen.clone() };
        (Box::new(provider), seen)
    }

    fn batch(objects: &[&str]) -> String {
        let ideas: Vec<Idea> = objects
            .iter()
            .map(|o| Idea {
                object: o.to_string(),
                prompt: format!("prompt for {o}"),
                keywords: vec!["png".into(), "transparent background".into()],
            })
            .collect();
        serde_json::to_string(&ideas).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn set_of(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn sequential_generations_accumulate_history() {
        let (provider, seen) = scripted(vec![
            Ok(batch(&["a"])),
            Ok(batch(&["b"])),
            Ok(batch(&["c"])),
        ]);
        let mut app = App::new(MemoryKvStore::new());

        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        assert_eq!(app.history(), &set_of(&["a", "b"]));

        let next = app.next_request(Variant::Quick, today());
        assert_eq!(next.excluded_labels, set_of(&["a", "b"]));

        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        let third = seen.lock()[2].clone();
        assert!(third.contains("[a, b]"));
    }

    #[tokio::test]
    async fn empty_reply_leaves_history_untouched() {
        let store = MemoryKvStore::new();
        let (provider, _) = scripted(vec![Ok(batch(&["a"])), Ok("   ".into())]);
        let mut app = App::new(store.clone());

        app.generate(&*provider, Variant::Seasonal, today()).await.unwrap();
        let err = app.generate(&*provider, Variant::Seasonal, today()).await.unwrap_err();

        assert_eq!(err, GenerationError::Empty);
        assert_eq!(err.user_message(), "The AI model returned an empty response. Please try again.");
        assert_eq!(app.history(), &set_of(&["a"]));
        assert_eq!(app.ideas().len(), 1);
        assert_eq!(LabelSet::open(store, HISTORY_KEY).labels(), &set_of(&["a"]));
    }

    #[tokio::test]
    async fn transport_and_malformed_errors_surface_unchanged() {
        let (provider, _) = scripted(vec![
            Err(GenerationError::Transport("503".into())),
            Ok("[{\"object\": \"x\"".into()),
        ]);
        let mut app = App::new(MemoryKvStore::new());

        assert!(matches!(
            app.generate(&*provider, Variant::Quick, today()).await,
            Err(GenerationError::Transport(_))
        ));
        assert!(matches!(
            app.generate(&*provider, Variant::Quick, today()).await,
            Err(GenerationError::Malformed(_))
        ));
        assert!(app.history().is_empty());
        assert!(app.ideas().is_empty());
    }

    #[tokio::test]
    async fn state_persists_across_controllers() {
        let store = MemoryKvStore::new();
        {
            let (provider, _) = scripted(vec![Ok(batch(&["x", "y"]))]);
            let mut app = App::new(store.clone());
            app.generate(&*provider, Variant::Catalog, today()).await.unwrap();
            app.copy(1).unwrap();
        }
        let app = App::new(store);
        assert_eq!(app.history(), &set_of(&["x", "y"]));
        assert_eq!(app.ideas().len(), 2);
        assert!(app.is_copied("prompt for x"));
        assert!(!app.is_copied("prompt for y"));
    }

    #[tokio::test]
    async fn export_unlocks_after_every_prompt_copied() {
        let (provider, _) = scripted(vec![Ok(batch(&["a", "b"]))]);
        let mut app = App::new(MemoryKvStore::new());
        assert!(!app.all_copied());

        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        assert!(!app.all_copied());
        assert_eq!(app.copy(2).unwrap().object, "b");
        assert!(!app.all_copied());
        assert!(app.mark_copied("prompt for a"));
        assert!(!app.mark_copied("prompt for a"));
        assert!(app.all_copied());
    }

    #[tokio::test]
    async fn copy_out_of_range_is_none() {
        let (provider, _) = scripted(vec![Ok(batch(&["a"]))]);
        let mut app = App::new(MemoryKvStore::new());
        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        assert!(app.copy(0).is_none());
        assert!(app.copy(2).is_none());
    }

    #[tokio::test]
    async fn seasonal_instruction_carries_target_date() {
        let (provider, seen) = scripted(vec![Ok(batch(&["a"]))]);
        let mut app = App::new(MemoryKvStore::new());
        app.generate(&*provider, Variant::Seasonal, today()).await.unwrap();
        assert!(seen.lock()[0].contains("January 27, 2027"));
    }

    #[tokio::test]
    async fn artifacts_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _) = scripted(vec![Ok(batch(&["a"]))]);
        let mut app = App::new(MemoryKvStore::new()).with_artifacts(dir.path().to_path_buf());
        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        let runs: Vec<_> = std::fs::read_dir(dir.path().join("runs")).unwrap().collect();
        assert_eq!(runs.len(), 1);
    }

    #[tokio::test]
    async fn clearing_history_empties_exclusions() {
        let (provider, _) = scripted(vec![Ok(batch(&["a"]))]);
        let mut app = App::new(MemoryKvStore::new());
        app.generate(&*provider, Variant::Quick, today()).await.unwrap();
        app.clear_history();
        assert!(app.next_request(Variant::Quick, today()).excluded_labels.is_empty());
    }
}
