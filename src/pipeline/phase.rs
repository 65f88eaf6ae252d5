//! Resolution phases and interceptors.
//!
//! The pipeline advances a context through six ordered sub-phases: a
//! before/after pair around each of the three computations (prefix,
//! alias + parameter string, command). A host may register at most one
//! [`Interceptor`] per sub-phase; registering a second one for the same
//! phase is rejected at build time. A host that wants several observers
//! on one phase composes them into a single interceptor itself - the
//! pipeline enforces single registration, it does not multiplex.

use std::{collections::HashMap, sync::Arc};

use crate::pipeline::CommandContext;

/// The six interception points of the resolution pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Before the prefix is computed.
    BeforePrefix,
    /// After the prefix is computed.
    AfterPrefix,
    /// Before alias and parameter string are computed.
    BeforeAliasAndParameterString,
    /// After alias and parameter string are computed.
    AfterAliasAndParameterString,
    /// Before the command is looked up.
    BeforeCommand,
    /// After the command is looked up.
    AfterCommand,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 6] = [
        Phase::BeforePrefix,
        Phase::AfterPrefix,
        Phase::BeforeAliasAndParameterString,
        Phase::AfterAliasAndParameterString,
        Phase::BeforeCommand,
        Phase::AfterCommand,
    ];
}

/// A pluggable step between pipeline phases.
///
/// An interceptor consumes the current context and returns the context
/// the pipeline continues with - typically the same one, or a copy with
/// fields added. Presetting a later field fast-forwards the pipeline:
/// a context carrying a command jumps straight to execution, one carrying
/// an alias skips ahead to command computation.
///
/// Interceptors run synchronously on the message's resolution path; a
/// hung interceptor blocks that message's resolution indefinitely.
///
/// Any `Fn(CommandContext<M>) -> CommandContext<M>` closure is an
/// interceptor.
pub trait Interceptor<M>: Send + Sync {
    fn intercept(&self, context: CommandContext<M>) -> CommandContext<M>;
}

impl<M, F> Interceptor<M> for F
where
    F: Fn(CommandContext<M>) -> CommandContext<M> + Send + Sync,
{
    fn intercept(&self, context: CommandContext<M>) -> CommandContext<M> {
        self(context)
    }
}

/// The interceptor-per-phase table, populated at build time.
pub(crate) struct InterceptorRegistry<M> {
    by_phase: HashMap<Phase, Arc<dyn Interceptor<M>>>,
}

impl<M> InterceptorRegistry<M> {
    pub(crate) fn new() -> Self {
        InterceptorRegistry {
            by_phase: HashMap::new(),
        }
    }

    /// Registers `interceptor` for `phase`. Returns `false` when the
    /// phase is already taken, leaving the registry unchanged.
    pub(crate) fn register(
        &mut self,
        phase: Phase,
        interceptor: Arc<dyn Interceptor<M>>,
    ) -> bool {
        if self.by_phase.contains_key(&phase) {
            return false;
        }
        self.by_phase.insert(phase, interceptor);
        true
    }

    pub(crate) fn get(&self, phase: Phase) -> Option<&Arc<dyn Interceptor<M>>> {
        self.by_phase.get(&phase)
    }
}
