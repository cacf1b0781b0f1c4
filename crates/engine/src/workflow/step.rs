use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::outcome::StepOutcome;
use crate::{tools::ToolRegistry, Error, Result};

/// One unit of work bound to graph nodes by name.
///
/// Blocking and suspending bodies share this signature; the engine always
/// awaits `run` and never inspects what kind of step it holds.
#[async_trait]
pub trait Step<S>: Send + Sync {
    async fn run(&self, state: &mut S, tools: &ToolRegistry) -> Result<StepOutcome>;
}

/// Adapter for a synchronous closure.
pub struct FnStep<F> {
    f: F,
}

impl<F> FnStep<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F> Step<S> for FnStep<F>
where
    S: Send + 'static,
    F: Fn(&mut S, &ToolRegistry) -> Result<StepOutcome> + Send + Sync,
{
    async fn run(&self, state: &mut S, tools: &ToolRegistry) -> Result<StepOutcome> {
        (self.f)(state, tools)
    }
}

/// Adapter for a closure that returns a boxed future borrowing the state.
pub struct AsyncFnStep<F> {
    f: F,
}

impl<F> AsyncFnStep<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F> Step<S> for AsyncFnStep<F>
where
    S: Send + 'static,
    F: for<'a> Fn(&'a mut S, &'a ToolRegistry) -> BoxFuture<'a, Result<StepOutcome>> + Send + Sync,
{
    async fn run(&self, state: &mut S, tools: &ToolRegistry) -> Result<StepOutcome> {
        (self.f)(state, tools).await
    }
}

/// Name -> step lookup used at dispatch time.
pub struct StepRegistry<S> {
    steps: HashMap<String, Arc<dyn Step<S>>>,
}

impl<S> Default for StepRegistry<S> {
    fn default() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }
}

impl<S: Send + 'static> StepRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, step: Arc<dyn Step<S>>) {
        let name = name.into();
        debug!("Registering node function '{}'", name);
        if self.steps.insert(name.clone(), step).is_some() {
            warn!("Overwriting existing node function '{}'", name);
        }
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut S, &ToolRegistry) -> Result<StepOutcome> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnStep::new(f)));
    }

    pub fn register_async_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: for<'a> Fn(&'a mut S, &'a ToolRegistry) -> BoxFuture<'a, Result<StepOutcome>>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, Arc::new(AsyncFnStep::new(f)));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Step<S>>> {
        self.steps
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnregisteredStep(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn sync_and_async_steps_are_awaited_alike() {
        let mut registry: StepRegistry<Vec<&'static str>> = StepRegistry::new();
        registry.register_fn("sync", |state: &mut Vec<&'static str>, _tools: &ToolRegistry| {
            state.push("sync");
            Ok(StepOutcome::Continue)
        });
        registry.register_async_fn("async", |state, _tools| {
            async move {
                tokio::task::yield_now().await;
                state.push("async");
                Ok(StepOutcome::goto("sync"))
            }
            .boxed()
        });

        let tools = ToolRegistry::new();
        let mut state = Vec::new();
        let first = registry.get("sync").unwrap().run(&mut state, &tools).await.unwrap();
        let second = registry.get("async").unwrap().run(&mut state, &tools).await.unwrap();

        assert_eq!(state, vec!["sync", "async"]);
        assert_eq!(first, StepOutcome::Continue);
        assert_eq!(second, StepOutcome::goto("sync"));
    }

    #[test]
    fn unknown_step_is_unregistered() {
        let registry: StepRegistry<()> = StepRegistry::new();
        let err = registry.get("missing").err().unwrap();
        assert!(matches!(err, Error::UnregisteredStep(ref n) if n == "missing"));
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier() {
        let mut registry: StepRegistry<()> = StepRegistry::new();
        registry.register_fn("a", |_: &mut (), _: &ToolRegistry| Ok(StepOutcome::Continue));
        registry.register_fn("a", |_: &mut (), _: &ToolRegistry| Ok(StepOutcome::goto("b")));

        let outcome = registry
            .get("a")
            .unwrap()
            .run(&mut (), &ToolRegistry::new())
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::goto("b"));
    }
}
