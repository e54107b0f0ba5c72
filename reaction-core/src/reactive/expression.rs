//! Expression Evaluator
//!
//! An [`Expression`] is the recomputation closure of one derived or effect
//! node, together with the value slot it writes into. Formulas come in two
//! shapes:
//!
//! - **Static**: the dependency list is given up front (a handle reference
//!   or a tuple of them) and the formula receives their values.
//! - **Tracked**: the formula receives a [`ReactiveContext`] and reads its
//!   dependencies through it; the dependency set is discovered by running
//!   the formula once.

use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use super::context::ReactiveContext;
use super::handle::{Handle, NodeCell, Observable, Value};
use super::runtime::Runtime;
use crate::error::Result;
use crate::graph::{Evaluate, NodeId};

type StaticFn<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;
type TrackedFn<T> = Box<dyn Fn(&mut ReactiveContext<'_>) -> Result<T> + Send + Sync>;

/// A dependency's node id together with the runtime that owns it.
pub type DependencySource = (NodeId, Runtime);

/// A node's formula.
pub(crate) enum Formula<T> {
    Static {
        dependencies: SmallVec<[DependencySource; 4]>,
        compute: StaticFn<T>,
    },
    Tracked(TrackedFn<T>),
}

impl<T: Value> Formula<T> {
    /// Build a static formula over explicit dependencies.
    pub(crate) fn new<D, F>(dependencies: D, f: F) -> Self
    where
        D: IntoDependencies,
        F: Fn(<D::Deps as Dependencies>::Values) -> T + Send + Sync + 'static,
    {
        let deps = dependencies.into_dependencies();
        Formula::Static {
            dependencies: deps.sources(),
            compute: Box::new(move || Ok(f(deps.values()?))),
        }
    }

    /// Build a formula whose dependencies are captured while it runs.
    pub(crate) fn tracked<F>(f: F) -> Self
    where
        F: Fn(&mut ReactiveContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        Formula::Tracked(Box::new(f))
    }

    /// Dependencies known before running.
    pub(crate) fn explicit_dependencies(&self) -> &[DependencySource] {
        match self {
            Formula::Static { dependencies, .. } => dependencies,
            Formula::Tracked(_) => &[],
        }
    }

    pub(crate) fn call(&self, cx: &mut ReactiveContext<'_>) -> Result<T> {
        match self {
            Formula::Static { compute, .. } => compute(),
            Formula::Tracked(compute) => compute(cx),
        }
    }
}

/// The recomputation entrypoint of one node.
pub(crate) struct Expression<T> {
    target: Arc<NodeCell<T>>,
    formula: Formula<T>,
}

impl<T: Value> Expression<T> {
    pub(crate) fn new(target: Arc<NodeCell<T>>, formula: Formula<T>) -> Self {
        Self { target, formula }
    }

    pub(crate) fn formula(&self) -> &Formula<T> {
        &self.formula
    }

    pub(crate) fn store(&self, value: T) {
        self.target.update_value(value);
    }
}

impl<T: Value> Evaluate for Expression<T> {
    fn evaluate(&self) -> Result<()> {
        let mut cx = ReactiveContext::untracked(self.target.id());
        let value = self.formula.call(&mut cx)?;
        self.store(value);
        Ok(())
    }
}

/// A fixed set of handles whose values feed a static formula.
pub trait Dependencies: Send + Sync + 'static {
    /// What the formula receives: one value, or a tuple of values.
    type Values;

    /// Node ids of the handles, each paired with its owning runtime.
    fn sources(&self) -> SmallVec<[DependencySource; 4]>;

    fn values(&self) -> Result<Self::Values>;
}

/// Conversion from borrowed handles to owned [`Dependencies`].
///
/// Implemented for `&S` where `S: Observable`, and for tuples of such
/// references up to eight elements.
pub trait IntoDependencies {
    type Deps: Dependencies;

    fn into_dependencies(self) -> Self::Deps;
}

impl<T: Value> Dependencies for Handle<T> {
    type Values = T;

    fn sources(&self) -> SmallVec<[DependencySource; 4]> {
        smallvec![(self.node_id(), self.runtime().clone())]
    }

    fn values(&self) -> Result<T> {
        self.get()
    }
}

impl<'a, S: Observable> IntoDependencies for &'a S {
    type Deps = Handle<S::Output>;

    fn into_dependencies(self) -> Self::Deps {
        self.handle().clone()
    }
}

macro_rules! impl_dependencies {
    ($($source:ident $value:ident $var:ident),+) => {
        impl<$($value: Value),+> Dependencies for ($(Handle<$value>,)+) {
            type Values = ($($value,)+);

            fn sources(&self) -> SmallVec<[DependencySource; 4]> {
                let ($($var,)+) = self;
                smallvec![$(($var.node_id(), $var.runtime().clone())),+]
            }

            fn values(&self) -> Result<Self::Values> {
                let ($($var,)+) = self;
                Ok(($($var.get()?,)+))
            }
        }

        impl<'a, $($source: Observable),+> IntoDependencies for ($(&'a $source,)+) {
            type Deps = ($(Handle<$source::Output>,)+);

            fn into_dependencies(self) -> Self::Deps {
                let ($($var,)+) = self;
                ($($var.handle().clone(),)+)
            }
        }
    };
}

impl_dependencies!(S1 T1 d1);
impl_dependencies!(S1 T1 d1, S2 T2 d2);
impl_dependencies!(S1 T1 d1, S2 T2 d2, S3 T3 d3);
impl_dependencies!(S1 T1 d1, S2 T2 d2, S3 T3 d3, S4 T4 d4);
impl_dependencies!(S1 T1 d1, S2 T2 d2, S3 T3 d3, S4 T4 d4, S5 T5 d5);
impl_dependencies!(S1 T1 d1, S2 T2 d2, S3 T3 d3, S4 T4 d4, S5 T5 d5, S6 T6 d6);
impl_dependencies!(S1 T1 d1, S2 T2 d2, S3 T3 d3, S4 T4 d4, S5 T5 d5, S6 T6 d6, S7 T7 d7);
impl_dependencies!(S1 T1 d1, S2 T2 d2, S3 T3 d3, S4 T4 d4, S5 T5 d5, S6 T6 d6, S7 T7 d7, S8 T8 d8);
