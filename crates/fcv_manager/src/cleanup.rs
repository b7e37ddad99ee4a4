//! Registries of externally supplied transition actions.
//!
//! Downgrades run a cleanup registry while the document carries the
//! cleaning flag; upgrades run their own registry while `Upgrading`. The
//! state machine only sequences the calls and records completion; what an
//! action actually removes or rewrites belongs to its owner.

use std::fmt;
use std::sync::Arc;

use crate::version::FcvVersion;

/// Direction and endpoints of the transition an action runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionContext {
    pub from: FcvVersion,
    pub to: FcvVersion,
    /// How many times this registry has been entered for the same target by
    /// this process, starting at 1.
    pub attempt: u32,
}

impl ActionContext {
    pub fn is_downgrade(&self) -> bool {
        self.to < self.from
    }
}

/// One idempotent transition action.
///
/// Implementations may be invoked repeatedly for the same target across
/// retries and restarts and must converge without duplicating side effects.
pub trait CleanupAction: Send + Sync {
    /// Stable identifier reported when the action fails.
    fn id(&self) -> &str;

    fn run(&self, ctx: &ActionContext) -> anyhow::Result<()>;
}

/// First failing action of a `run_all` pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub action_id: String,
    pub cause: String,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action_id, self.cause)
    }
}

/// Ordered set of actions run for one kind of transition.
#[derive(Clone, Default)]
pub struct CleanupActionRegistry {
    actions: Vec<Arc<dyn CleanupAction>>,
}

impl CleanupActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action. Ids must be unique within a registry.
    pub fn register(&mut self, action: Arc<dyn CleanupAction>) -> anyhow::Result<()> {
        if self.actions.iter().any(|a| a.id() == action.id()) {
            anyhow::bail!("duplicate transition action id {:?}", action.id());
        }
        self.actions.push(action);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, action: Arc<dyn CleanupAction>) -> anyhow::Result<Self> {
        self.register(action)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.id().to_string()).collect()
    }

    /// Run every action in registration order, stopping at the first failure.
    pub fn run_all(&self, ctx: &ActionContext) -> Result<(), ActionFailure> {
        for action in &self.actions {
            tracing::debug!(
                action = action.id(),
                from = %ctx.from,
                to = %ctx.to,
                attempt = ctx.attempt,
                "running fcv transition action"
            );
            if let Err(err) = action.run(ctx) {
                return Err(ActionFailure {
                    action_id: action.id().to_string(),
                    cause: format!("{err:#}"),
                });
            }
        }
        Ok(())
    }
}

/// Adapter turning a closure into an action.
pub struct FnAction<F> {
    id: String,
    f: F,
}

impl<F> FnAction<F>
where
    F: Fn(&ActionContext) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self { id: id.into(), f }
    }
}

impl<F> CleanupAction for FnAction<F>
where
    F: Fn(&ActionContext) -> anyhow::Result<()> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, ctx: &ActionContext) -> anyhow::Result<()> {
        (self.f)(ctx)
    }
}
