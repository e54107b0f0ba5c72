//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects sources, memos, and
//! effects. It owns one dependency graph and one field graph and drives
//! propagation when a source changes.
//!
//! # How It Works
//!
//! 1. Creating a node registers it with the graph and returns a handle.
//!
//! 2. Binding a formula wires one edge per dependency (listed explicitly or
//!    captured by running the formula once), then evaluates the formula so
//!    the node has a value before its first read.
//!
//! 3. When a source's value is written, the runtime walks its observers:
//!    derived nodes recompute and cascade to their own observers, effects
//!    run, and object nodes forward the change. The write call returns only
//!    after the whole downstream sub-graph has been updated.
//!
//! 4. When the last handle to a node is dropped, the node leaves the graph.
//!
//! # Locking
//!
//! Graph locks are never held while user code runs. Formulas may read any
//! node and may even write to sources; such writes recurse synchronously.
//! Structural mutation from several threads at once is not coordinated
//! beyond memory safety; callers needing a defined order must serialize it.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::effect::Effect;
use super::expression::{Dependencies, Expression, Formula, IntoDependencies};
use super::handle::{Handle, NodeCell, Value};
use super::memo::Memo;
use super::resource::Resource;
use super::signal::{Constant, Signal};
use crate::config::{PropagationOrder, ResetPolicy, RuntimeConfig};
use crate::error::Result;
use crate::graph::{
    DependencyGraph, Evaluate, FieldGraph, FieldOwner, GraphSnapshot, NodeId, NodeKind, ObjectId,
    UpdateScheduler,
};

struct RuntimeInner {
    config: RuntimeConfig,
    graph: RwLock<DependencyGraph>,
    fields: Mutex<FieldGraph>,
}

/// Handle to one independent reactive graph.
///
/// Cloning a runtime is cheap; all clones share the same graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let graph = DependencyGraph::with_capacity(config.initial_capacity);
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                graph: RwLock::new(graph),
                fields: Mutex::new(FieldGraph::new()),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Whether both values refer to the same graph.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a mutable source node.
    pub fn signal<T: Value>(&self, value: T) -> Signal<T> {
        Signal::from_handle(self.create(NodeKind::Source, |node| Resource::new(node, value)))
    }

    /// Create an immutable source node.
    pub fn constant<T: Value>(&self, value: T) -> Constant<T> {
        Constant::from_handle(self.create(NodeKind::Source, |node| Resource::new(node, value)))
    }

    /// Create a derived node with no formula yet. Reading it fails with
    /// `UninitializedResource` until it is bound with `reset`.
    pub fn declare<T: Value>(&self) -> Memo<T> {
        Memo::from_handle(self.create(NodeKind::Derived, Resource::empty))
    }

    /// Create a derived node over an explicit dependency list.
    ///
    /// ```rust,ignore
    /// let sum = rt.memo((&a, &b), |(a, b)| a + b)?;
    /// ```
    pub fn memo<T, D, F>(&self, dependencies: D, f: F) -> Result<Memo<T>>
    where
        T: Value,
        D: IntoDependencies,
        F: Fn(<D::Deps as Dependencies>::Values) -> T + Send + Sync + 'static,
    {
        let memo = self.declare();
        memo.reset(dependencies, f)?;
        Ok(memo)
    }

    /// Create a derived node whose dependencies are captured from the reads
    /// its formula makes on first evaluation.
    ///
    /// ```rust,ignore
    /// let sum = rt.memo_tracked(move |cx| Ok(cx.read(&a)? + cx.read(&b)?))?;
    /// ```
    pub fn memo_tracked<T, F>(&self, f: F) -> Result<Memo<T>>
    where
        T: Value,
        F: Fn(&mut ReactiveContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let memo = self.declare();
        memo.reset_tracked(f)?;
        Ok(memo)
    }

    /// Create an effect over an explicit dependency list.
    pub fn effect<D, F>(&self, dependencies: D, f: F) -> Result<Effect>
    where
        D: IntoDependencies,
        F: Fn(<D::Deps as Dependencies>::Values) + Send + Sync + 'static,
    {
        let effect = Effect::from_handle(self.create(NodeKind::Effect, Resource::<()>::unit));
        effect.reset(dependencies, f)?;
        Ok(effect)
    }

    /// Create an effect whose dependencies are captured on first run.
    pub fn effect_tracked<F>(&self, f: F) -> Result<Effect>
    where
        F: Fn(&mut ReactiveContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let effect = Effect::from_handle(self.create(NodeKind::Effect, Resource::<()>::unit));
        effect.reset_tracked(f)?;
        Ok(effect)
    }

    /// Create a source node for a value whose fields are reactive. Every
    /// field registered under the value's object id, before or after this
    /// call, becomes a dependency of the returned node.
    pub fn object<T: Value + FieldOwner>(&self, value: T) -> Result<Signal<T>> {
        let owner = value.object_id();
        let signal = self.signal(value);
        let node = signal.node_id();
        {
            let mut fields = self.inner.fields.lock();
            let mut graph = self.inner.graph.write();
            if let Some(entry) = graph.get_mut(node) {
                entry.set_owner(owner);
            }
            fields.bind_field(owner, node, &mut graph)?;
        }
        Ok(signal)
    }

    /// Create a source node registered as a field of `owner`.
    pub fn field<T: Value>(&self, owner: ObjectId, value: T) -> Result<Signal<T>> {
        let signal = self.signal(value);
        let node = signal.node_id();
        {
            let mut fields = self.inner.fields.lock();
            fields.add_obj(owner, node);
            if let Some(whole) = fields.owner_node(owner) {
                self.inner.graph.write().add_observer(node, whole)?;
            }
        }
        Ok(signal)
    }

    fn create<T: Value>(
        &self,
        kind: NodeKind,
        resource: impl FnOnce(NodeId) -> Resource<T>,
    ) -> Handle<T> {
        let node = self.inner.graph.write().add_node(kind);
        tracing::debug!(%node, ?kind, "created node");
        Handle::new(self.clone(), Arc::new(NodeCell::new(node, resource(node))))
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Whether the node is still part of the graph.
    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.graph.read().contains(node)
    }

    pub fn node_count(&self) -> usize {
        self.inner.graph.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.graph.read().edge_count()
    }

    /// Current observers of a node (empty if the node is gone).
    pub fn observers(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .graph
            .read()
            .observers(node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Current dependencies of a node (empty if the node is gone).
    pub fn dependencies(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .graph
            .read()
            .dependencies(node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Field nodes registered under `owner`.
    pub fn fields_of(&self, owner: ObjectId) -> Vec<NodeId> {
        self.inner.fields.lock().fields_of(owner).collect()
    }

    /// Copy of the current graph structure.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.inner.graph.read())
    }

    // ------------------------------------------------------------------
    // Graph operations used by handles and formulas
    // ------------------------------------------------------------------

    pub(crate) fn add_observer(&self, dependency: NodeId, dependent: NodeId) -> Result<bool> {
        self.inner.graph.write().add_observer(dependency, dependent)
    }

    /// Bind `formula` to the node behind `target`.
    ///
    /// Either everything succeeds (edges wired, value stored, formula
    /// installed, observers notified) or the node keeps its previous
    /// formula, value, and edges.
    pub(crate) fn bind<T: Value>(&self, target: &Handle<T>, formula: Formula<T>) -> Result<()> {
        let node = target.node_id();
        let previous = match self.inner.config.reset_policy {
            ResetPolicy::Replace => self.inner.graph.write().detach_dependencies(node),
            ResetPolicy::Accumulate => SmallVec::new(),
        };

        let expression = Arc::new(Expression::new(Arc::clone(target.cell()), formula));
        let mut cx = ReactiveContext::capturing(self, node);
        let outcome = capture(&mut cx, expression.formula());
        let added: SmallVec<[NodeId; 4]> = cx.added().iter().copied().collect();
        let dependencies = cx.dependencies().len();

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                self.rollback(node, &added, &previous);
                tracing::debug!(%node, error = %err, "bind failed, rolled back");
                return Err(err);
            }
        };
        expression.store(value);

        // The replaced formula may hold the last handles to old
        // dependencies; drop it only after the graph lock is released.
        let replaced = self.install(node, expression);
        drop(replaced);

        tracing::debug!(%node, dependencies, "bound formula");
        self.notify(node)
    }

    fn install(&self, node: NodeId, evaluator: Arc<dyn Evaluate>) -> Option<Arc<dyn Evaluate>> {
        let mut graph = self.inner.graph.write();
        match graph.get_mut(node) {
            Some(entry) => entry.set_evaluator(Some(evaluator)),
            None => Some(evaluator),
        }
    }

    fn rollback(&self, node: NodeId, added: &[NodeId], previous: &[NodeId]) {
        let mut graph = self.inner.graph.write();
        for &dependency in added {
            graph.remove_observer(dependency, node);
        }
        graph.restore_dependencies(node, previous);
    }

    /// Push a change of `node` to everything downstream of it.
    pub(crate) fn notify(&self, node: NodeId) -> Result<()> {
        match self.inner.config.propagation {
            PropagationOrder::DepthFirst => self.notify_observers(node),
            PropagationOrder::Topological => {
                let plan = UpdateScheduler::plan(&self.inner.graph.read(), node);
                for observer in plan {
                    self.reevaluate(observer)?;
                }
                Ok(())
            }
        }
    }

    fn notify_observers(&self, node: NodeId) -> Result<()> {
        let observers: SmallVec<[NodeId; 8]> = match self.inner.graph.read().observers(node) {
            Some(observers) => observers.iter().copied().collect(),
            None => return Ok(()),
        };

        for observer in observers {
            self.on_dependency_changed(observer)?;
        }
        Ok(())
    }

    /// Reaction entrypoint for depth-first propagation.
    fn on_dependency_changed(&self, node: NodeId) -> Result<()> {
        // The node may have been disposed by an earlier sibling's reaction.
        let Some((kind, evaluator)) = self.reaction(node) else {
            return Ok(());
        };
        tracing::trace!(%node, ?kind, "dependency changed");

        match kind {
            NodeKind::Source => self.notify_observers(node),
            NodeKind::Derived => {
                if let Some(evaluator) = evaluator {
                    evaluator.evaluate()?;
                }
                self.notify_observers(node)
            }
            NodeKind::Effect => match evaluator {
                Some(evaluator) => evaluator.evaluate(),
                None => Ok(()),
            },
        }
    }

    /// Reaction entrypoint for topological propagation; the plan already
    /// contains every downstream node, so nothing cascades from here.
    fn reevaluate(&self, node: NodeId) -> Result<()> {
        let Some((kind, evaluator)) = self.reaction(node) else {
            return Ok(());
        };
        tracing::trace!(%node, ?kind, "re-evaluating");

        match (kind, evaluator) {
            (NodeKind::Source, _) | (_, None) => Ok(()),
            (NodeKind::Derived | NodeKind::Effect, Some(evaluator)) => evaluator.evaluate(),
        }
    }

    fn reaction(&self, node: NodeId) -> Option<(NodeKind, Option<Arc<dyn Evaluate>>)> {
        let graph = self.inner.graph.read();
        let entry = graph.get(node)?;
        Some((entry.kind(), entry.evaluator().cloned()))
    }

    /// Called when the last handle to `node` is dropped.
    pub(crate) fn release(&self, node: NodeId) {
        let removed = self.inner.graph.write().remove_node(node);
        let Some(removed) = removed else {
            return;
        };
        if let Some(owner) = removed.owner() {
            // Another object node may have taken over this id since.
            let mut fields = self.inner.fields.lock();
            if fields.owner_node(owner) == Some(node) {
                fields.delete_obj(owner);
            }
        }
        tracing::debug!(%node, kind = ?removed.kind(), "disposed node");

        // Dropping the evaluator releases the handles its formula captured,
        // which may dispose further nodes. No lock is held here.
        drop(removed);
    }
}

/// Run a formula once under a capturing context: explicit dependencies are
/// wired first, then the formula itself may add more through its reads.
fn capture<T: Value>(cx: &mut ReactiveContext<'_>, formula: &Formula<T>) -> Result<T> {
    for (dependency, owner) in formula.explicit_dependencies() {
        cx.observe(owner, *dependency)?;
    }
    formula.call(cx)
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("node_count", &self.node_count())
            .field("edge_count", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReactionError;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn runtimes_are_independent() {
        let rt1 = Runtime::new();
        let rt2 = Runtime::new();

        let _a = rt1.signal(1);
        let _b = rt1.signal(2);
        let _c = rt2.signal(3);

        assert_eq!(rt1.node_count(), 2);
        assert_eq!(rt2.node_count(), 1);
    }

    #[test]
    fn memo_wires_edges_and_evaluates() {
        let rt = Runtime::new();
        let a = rt.signal(2);
        let doubled = rt.memo(&a, |a| a * 2).unwrap();

        assert_eq!(doubled.get().unwrap(), 4);
        assert_eq!(rt.observers(a.node_id()), vec![doubled.node_id()]);
        assert_eq!(rt.dependencies(doubled.node_id()), vec![a.node_id()]);
    }

    #[test]
    fn write_propagates_through_chain() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let b = rt.memo(&a, |a| a + 1).unwrap();
        let c = rt.memo(&b, |b| b * 10).unwrap();

        a.set(4).unwrap();
        assert_eq!(b.get().unwrap(), 5);
        assert_eq!(c.get().unwrap(), 50);
    }

    #[test]
    fn topological_propagation_evaluates_join_once() {
        let rt = Runtime::with_config(
            RuntimeConfig::default().with_propagation(PropagationOrder::Topological),
        );
        let runs = Arc::new(AtomicI32::new(0));

        let a = rt.signal(1);
        let left = rt.memo(&a, |a| a + 1).unwrap();
        let right = rt.memo(&a, |a| a * 2).unwrap();
        let join = rt
            .memo((&left, &right), {
                let runs = runs.clone();
                move |(l, r)| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    l + r
                }
            })
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        a.set(10).unwrap();
        assert_eq!(join.get().unwrap(), 31);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_bind_rolls_back_every_edge() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let b = rt.signal(2);
        let target = rt.memo(&a, |a| a).unwrap();
        let downstream = rt.memo(&target, |t| t + 100).unwrap();

        // b is wired first, then the read of `downstream` closes a cycle
        let err = target
            .reset((&b, &downstream), |(b, d)| b + d)
            .unwrap_err();
        assert!(err.is_cycle());

        assert_eq!(rt.dependencies(target.node_id()), vec![a.node_id()]);
        assert!(rt.observers(b.node_id()).is_empty());
        assert_eq!(target.get().unwrap(), 1);

        // The old formula is still installed
        a.set(7).unwrap();
        assert_eq!(target.get().unwrap(), 7);
        assert_eq!(downstream.get().unwrap(), 107);
    }

    #[test]
    fn failed_initial_bind_disposes_the_node() {
        let rt = Runtime::new();
        let pending = rt.declare::<i32>();
        let before = rt.node_count();

        let err = rt.memo(&pending, |p| p + 1).unwrap_err();
        assert!(matches!(err, ReactionError::UninitializedResource { .. }));
        assert_eq!(rt.node_count(), before);
        assert_eq!(rt.edge_count(), 0);
    }

    #[test]
    fn dropping_a_memo_releases_its_dependencies() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let memo = rt.memo(&a, |a| a).unwrap();
        assert_eq!(a.handle_count(), 2);

        drop(memo);
        assert_eq!(a.handle_count(), 1);
        assert_eq!(rt.node_count(), 1);
        assert_eq!(rt.edge_count(), 0);
    }

    #[test]
    fn snapshot_reflects_graph() {
        let rt = Runtime::new();
        let a = rt.signal(1);
        let m = rt.memo(&a, |a| a).unwrap();

        let snapshot = rt.snapshot();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges, vec![(a.node_id(), m.node_id())]);
    }

    #[test]
    fn foreign_dependency_is_rejected() {
        let rt1 = Runtime::new();
        let rt2 = Runtime::new();
        let unrelated = rt1.signal(100);
        let foreign = rt2.signal(1);
        assert_eq!(unrelated.node_id(), foreign.node_id());

        let err = rt1.memo(&foreign, |v| v * 10).unwrap_err();
        assert!(matches!(err, ReactionError::ForeignHandle { node } if node == foreign.node_id()));
        assert_eq!(rt1.node_count(), 1);
        assert_eq!(rt1.edge_count(), 0);
        assert!(rt1.observers(unrelated.node_id()).is_empty());
        assert_eq!(rt2.edge_count(), 0);
    }

    #[test]
    fn foreign_id_matching_the_target_is_not_a_self_dependency() {
        let rt1 = Runtime::new();
        let rt2 = Runtime::new();
        let _local = rt1.signal(0);
        let _first = rt2.signal(0);
        // Same slot the memo below is allocated in rt1.
        let foreign = rt2.signal(5);

        let err = rt1.memo(&foreign, |v| v + 1).unwrap_err();
        assert!(matches!(err, ReactionError::ForeignHandle { .. }));
        assert!(!err.is_cycle());
        assert_eq!(rt1.node_count(), 1);
    }

    #[test]
    fn reset_onto_foreign_dependency_keeps_previous_formula() {
        let rt1 = Runtime::new();
        let rt2 = Runtime::new();
        let a = rt1.signal(1);
        let memo = rt1.memo(&a, |a| a + 1).unwrap();
        let foreign = rt2.signal(50);

        let err = memo.reset((&a, &foreign), |(a, f)| a + f).unwrap_err();
        assert!(matches!(err, ReactionError::ForeignHandle { .. }));
        assert_eq!(rt1.dependencies(memo.node_id()), vec![a.node_id()]);
        assert_eq!(rt1.edge_count(), 1);
        assert_eq!(foreign.handle_count(), 1);

        a.set(9).unwrap();
        assert_eq!(memo.get().unwrap(), 10);
    }

    #[test]
    fn ptr_eq_compares_graph_identity() {
        let rt1 = Runtime::new();
        let rt2 = Runtime::new();
        assert!(rt1.ptr_eq(&rt1.clone()));
        assert!(!rt1.ptr_eq(&rt2));
    }

    #[test]
    fn releasing_a_superseded_object_keeps_the_newer_registration() {
        #[derive(Clone)]
        struct Doc(ObjectId);
        impl FieldOwner for Doc {
            fn object_id(&self) -> ObjectId {
                self.0
            }
        }

        let rt = Runtime::new();
        let id = ObjectId::new();
        let first = rt.object(Doc(id)).unwrap();
        let second = rt.object(Doc(id)).unwrap();

        drop(first);
        let title = rt.field(id, String::from("draft")).unwrap();
        assert_eq!(rt.fields_of(id), vec![title.node_id()]);
        assert_eq!(rt.dependencies(second.node_id()), vec![title.node_id()]);

        let seen = Arc::new(AtomicI32::new(0));
        let _watch = rt
            .effect(&second, {
                let seen = seen.clone();
                move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        title.set(String::from("final")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
