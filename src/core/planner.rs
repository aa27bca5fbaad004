//! Scatter-gather planner — the allocation driver.
//!
//! A run's specs are partitioned into a transient tree of contiguous index
//! ranges over the flat spec list. A node recurses while it still has a
//! depth budget and more than one spec, splitting into at most `factor`
//! near-equal chunks; otherwise it is a leaf and executes its specs
//! directly. Sibling subtrees run concurrently on a [`JoinSet`], so the
//! dispatch width at any single node is bounded by `factor` — a large batch
//! trades dispatch breadth for tree depth.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::executor::ExperimentExecutor;
use super::run_registry::RunState;
use crate::domain::model::JobSpec;
use crate::error::{AllocationError, AllocationResult};
use crate::experiments::ExperimentEntry;

/// Caller-supplied recursion shape: fan-out factor and depth budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursionLimits {
    pub factor: usize,
    pub max_depth: u32,
}

impl RecursionLimits {
    /// Validate the knobs; `factor < 2` is a planning error.
    pub fn new(factor: usize, max_depth: u32) -> AllocationResult<Self> {
        if factor < 2 {
            return Err(AllocationError::Planning(format!(
                "factor must be >= 2, got {}",
                factor
            )));
        }
        Ok(Self { factor, max_depth })
    }
}

impl Default for RecursionLimits {
    fn default() -> Self {
        Self {
            factor: 2,
            max_depth: 2,
        }
    }
}

/// Split `[start, end)` into contiguous chunks of size `ceil(len/factor)`,
/// yielding at most `factor` chunks. Boundaries are deterministic given the
/// range and factor; no shuffling.
pub(crate) fn chunk_ranges(start: usize, end: usize, factor: usize) -> Vec<(usize, usize)> {
    let len = end - start;
    let chunk = len.div_ceil(factor);
    let mut ranges = Vec::new();
    let mut lo = start;
    while lo < end {
        let hi = (lo + chunk).min(end);
        ranges.push((lo, hi));
        lo = hi;
    }
    ranges
}

/// Leaf ranges of the fully expanded plan, in spec order. The concatenation
/// of the returned ranges is exactly `0..len`: partitioning is lossless and
/// order-preserving.
pub fn leaf_ranges(len: usize, limits: RecursionLimits) -> Vec<std::ops::Range<usize>> {
    let mut leaves = Vec::new();
    let mut stack = vec![(0usize, len, limits.max_depth)];
    while let Some((start, end, depth_left)) = stack.pop() {
        if end - start <= 1 || depth_left == 0 {
            if start < end {
                leaves.push(start..end);
            }
            continue;
        }
        for &(child_start, child_end) in chunk_ranges(start, end, limits.factor).iter().rev() {
            stack.push((child_start, child_end, depth_left - 1));
        }
    }
    leaves
}

struct PlanContext {
    entry: Arc<ExperimentEntry>,
    executor: Arc<ExperimentExecutor>,
    specs: Arc<Vec<JobSpec>>,
    run: Arc<RunState>,
    limits: RecursionLimits,
}

/// Drives one run's recursion tree to completion.
pub(crate) struct ScatterGatherPlanner {
    ctx: Arc<PlanContext>,
}

impl ScatterGatherPlanner {
    pub(crate) fn new(
        entry: Arc<ExperimentEntry>,
        executor: Arc<ExperimentExecutor>,
        run: Arc<RunState>,
        specs: Vec<JobSpec>,
        limits: RecursionLimits,
    ) -> Self {
        Self {
            ctx: Arc::new(PlanContext {
                entry,
                executor,
                specs: Arc::new(specs),
                run,
                limits,
            }),
        }
    }

    /// Execute the whole tree, then publish the run's terminal state.
    pub(crate) async fn run(self) -> AllocationResult<()> {
        let len = self.ctx.specs.len();
        tracing::debug!(
            run_id = %self.ctx.run.run_id(),
            specs = len,
            factor = self.ctx.limits.factor,
            max_depth = self.ctx.limits.max_depth,
            "allocation dispatch started"
        );
        match drive(Arc::clone(&self.ctx), 0, len, self.ctx.limits.max_depth).await {
            Ok(()) => {
                self.ctx.run.finalize();
                Ok(())
            }
            Err(error) => {
                // merge_leaf already failed the run; make sure the state is
                // terminal even on other internal errors.
                self.ctx.run.fail();
                Err(error)
            }
        }
    }
}

fn drive(
    ctx: Arc<PlanContext>,
    start: usize,
    end: usize,
    depth_left: u32,
) -> BoxFuture<'static, AllocationResult<()>> {
    Box::pin(async move {
        if end - start <= 1 || depth_left == 0 {
            let mut outcomes = BTreeMap::new();
            for spec in &ctx.specs[start..end] {
                if ctx.run.is_cancelled() {
                    return Ok(());
                }
                let outcome = ctx.executor.execute(&ctx.entry, spec).await;
                outcomes.insert(spec.sort_index(), outcome);
            }
            return ctx.run.merge_leaf(outcomes);
        }

        let mut children: JoinSet<AllocationResult<()>> = JoinSet::new();
        let mut ranges: HashMap<tokio::task::Id, (usize, usize)> = HashMap::new();
        for (child_start, child_end) in chunk_ranges(start, end, ctx.limits.factor) {
            if ctx.run.is_cancelled() {
                break;
            }
            let handle = children.spawn(drive(
                Arc::clone(&ctx),
                child_start,
                child_end,
                depth_left - 1,
            ));
            ranges.insert(handle.id(), (child_start, child_end));
        }

        // Gather: a failed subtree never aborts its siblings.
        let mut first_error = None;
        while let Some(joined) = children.join_next_with_id().await {
            match joined {
                Ok((_id, Ok(()))) => {}
                Ok((_id, Err(error))) => {
                    first_error.get_or_insert(error);
                }
                Err(join_error) => {
                    let (child_start, child_end) =
                        ranges.get(&join_error.id()).copied().unwrap_or((start, end));
                    tracing::error!(
                        run_id = %ctx.run.run_id(),
                        child_start,
                        child_end,
                        "subtree task failed: {}",
                        join_error
                    );
                    let indices: Vec<usize> = ctx.specs[child_start..child_end]
                        .iter()
                        .map(JobSpec::sort_index)
                        .collect();
                    ctx.run
                        .fill_missing(indices, &format!("subtree task failed: {}", join_error));
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    })
}
