//! Compute device: explicit execution context and kernel dispatch.
//!
//! A kernel is dispatched over a grid of independent work-groups. Groups run
//! in parallel on a rayon thread pool and never talk to each other; the only
//! ordering between them is the stage boundary, i.e. `dispatch` returning.
//!
//! Inside a group, lanes execute in barrier-separated phases: every lane
//! finishes phase `k` before any lane starts phase `k + 1`. This is exactly
//! the guarantee a `threadgroup_barrier` / `GroupMemoryBarrierWithGroupSync`
//! gives on a GPU, so kernels written against [`WorkGroup::phase`] keep the
//! same shape they would have in a shader.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Result, SortError};

/// Default maximum number of lanes in one work-group.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 1024;
/// Default maximum number of work-groups in one dispatch.
pub const DEFAULT_MAX_GRID_GROUPS: usize = 65_535;

/// Construction parameters for an [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Worker threads; `0` lets rayon pick one per logical core.
    pub threads: usize,
    pub max_group_size: usize,
    pub max_grid_groups: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            max_grid_groups: DEFAULT_MAX_GRID_GROUPS,
        }
    }
}

/// Capacity limits a dispatch must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_group_size: usize,
    pub max_grid_groups: usize,
}

/// Elapsed time of one dispatch, recorded while marker collection is on.
#[derive(Debug, Clone)]
pub struct Marker {
    pub name: &'static str,
    pub groups: usize,
    pub elapsed: Duration,
}

impl Marker {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// A data-parallel kernel.
///
/// The implementing struct carries the kernel's bindings (input buffers,
/// output buffers, constant block) as typed fields, so a stage cannot be
/// dispatched with the wrong buffer set.
pub trait Kernel: Sync {
    fn name(&self) -> &'static str;

    /// Lanes per work-group.
    fn group_size(&self) -> usize;

    /// Run one work-group.
    fn execute(&self, group: &WorkGroup);
}

/// One work-group of a dispatch.
#[derive(Debug)]
pub struct WorkGroup {
    id: usize,
    size: usize,
}

impl WorkGroup {
    fn new(id: usize, size: usize) -> Self {
        Self { id, size }
    }

    /// Index of this group in the grid.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of lanes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `f` once per lane. Consecutive phases are separated by a group
    /// barrier, so a phase observes every write of the previous one.
    #[inline]
    pub fn phase<F: FnMut(usize)>(&self, mut f: F) {
        for lane in 0..self.size {
            f(lane);
        }
    }
}

/// Explicit compute device handed to every dispatch.
pub struct ExecutionContext {
    pool: rayon::ThreadPool,
    limits: Limits,
    markers: Mutex<Option<Vec<Marker>>>,
}

impl ExecutionContext {
    pub fn new(config: ContextConfig) -> Result<Self> {
        if config.max_group_size == 0 || config.max_grid_groups == 0 {
            return Err(SortError::InvalidConfig(
                "device limits must be non-zero".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("radix-worker-{i}"))
            .build()?;
        let limits = Limits {
            max_group_size: config.max_group_size,
            max_grid_groups: config.max_grid_groups,
        };
        info!(
            "compute context ready: {} workers, {} lanes/group, {} groups/grid",
            pool.current_num_threads(),
            limits.max_group_size,
            limits.max_grid_groups
        );
        Ok(Self {
            pool,
            limits,
            markers: Mutex::new(None),
        })
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn name(&self) -> String {
        format!("rayon-cpu ({} workers)", self.pool.current_num_threads())
    }

    /// Fail with a capacity error if a group of `size` lanes cannot run.
    pub fn check_group_size(&self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(SortError::InvalidConfig(
                "work-group size must be non-zero".to_string(),
            ));
        }
        if size > self.limits.max_group_size {
            return Err(SortError::Capacity {
                what: "work-group size",
                requested: size,
                limit: self.limits.max_group_size,
            });
        }
        Ok(())
    }

    /// Fail with a capacity error if a grid of `groups` cannot be dispatched.
    pub fn check_grid(&self, groups: usize) -> Result<()> {
        if groups > self.limits.max_grid_groups {
            return Err(SortError::Capacity {
                what: "grid size",
                requested: groups,
                limit: self.limits.max_grid_groups,
            });
        }
        Ok(())
    }

    /// Run `kernel` over `groups` work-groups and wait for all of them.
    pub fn dispatch<K: Kernel>(&self, kernel: &K, groups: usize) -> Result<()> {
        let group_size = kernel.group_size();
        self.check_group_size(group_size)?;
        self.check_grid(groups)?;
        if groups == 0 {
            return Ok(());
        }

        debug!(
            "dispatch {}: {} groups x {} lanes",
            kernel.name(),
            groups,
            group_size
        );
        let start = Instant::now();
        self.pool.install(|| {
            (0..groups)
                .into_par_iter()
                .for_each(|id| kernel.execute(&WorkGroup::new(id, group_size)));
        });
        let elapsed = start.elapsed();

        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(markers) = markers.as_mut() {
            markers.push(Marker {
                name: kernel.name(),
                groups,
                elapsed,
            });
        }
        Ok(())
    }

    /// Start recording a [`Marker`] per dispatch. Discards markers from an
    /// unfinished earlier collection.
    pub fn begin_collect_markers(&self) {
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        *markers = Some(Vec::new());
    }

    /// Stop recording and return the markers in dispatch order.
    pub fn end_collect_markers(&self) -> Vec<Marker> {
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        markers.take().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;

    struct FillGroupIds<'a> {
        out: &'a Buffer,
        lanes: usize,
    }

    impl Kernel for FillGroupIds<'_> {
        fn name(&self) -> &'static str {
            "fill_group_ids"
        }

        fn group_size(&self) -> usize {
            self.lanes
        }

        fn execute(&self, group: &WorkGroup) {
            group.phase(|lane| {
                let i = group.id() * group.size() + lane;
                if i < self.out.len() {
                    self.out.store(i, group.id() as u32);
                }
            });
        }
    }

    /// Each lane reads its right neighbour's value written in the previous
    /// phase; only correct if phases behave like barriers.
    struct RotateLeft<'a> {
        out: &'a Buffer,
        lanes: usize,
    }

    impl Kernel for RotateLeft<'_> {
        fn name(&self) -> &'static str {
            "rotate_left"
        }

        fn group_size(&self) -> usize {
            self.lanes
        }

        fn execute(&self, group: &WorkGroup) {
            let mut shared = vec![0u32; group.size()];
            group.phase(|lane| shared[lane] = lane as u32 * 10);
            let mut rotated = vec![0u32; group.size()];
            group.phase(|lane| rotated[lane] = shared[(lane + 1) % group.size()]);
            group.phase(|lane| self.out.store(lane, rotated[lane]));
        }
    }

    fn small_context() -> ExecutionContext {
        ExecutionContext::new(ContextConfig {
            threads: 2,
            max_group_size: 64,
            max_grid_groups: 8,
        })
        .unwrap()
    }

    #[test]
    fn test_dispatch_runs_every_group() {
        let ctx = small_context();
        let out = Buffer::new("out", 100);
        ctx.dispatch(&FillGroupIds { out: &out, lanes: 16 }, 7).unwrap();
        let data = out.to_vec();
        for (i, &v) in data.iter().enumerate() {
            assert_eq!(v as usize, i / 16);
        }
    }

    #[test]
    fn test_phases_are_barriers() {
        let ctx = small_context();
        let out = Buffer::new("out", 4);
        ctx.dispatch(&RotateLeft { out: &out, lanes: 4 }, 1).unwrap();
        assert_eq!(out.to_vec(), vec![10, 20, 30, 0]);
    }

    #[test]
    fn test_group_size_capacity() {
        let ctx = small_context();
        let out = Buffer::new("out", 128);
        let err = ctx
            .dispatch(&FillGroupIds { out: &out, lanes: 128 }, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            SortError::Capacity {
                what: "work-group size",
                requested: 128,
                limit: 64
            }
        ));
        // Nothing ran.
        assert!(out.to_vec().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_grid_capacity() {
        let ctx = small_context();
        let out = Buffer::new("out", 1);
        let err = ctx
            .dispatch(&FillGroupIds { out: &out, lanes: 1 }, 9)
            .unwrap_err();
        assert!(matches!(err, SortError::Capacity { what: "grid size", .. }));
    }

    #[test]
    fn test_empty_grid_is_noop() {
        let ctx = small_context();
        let out = Buffer::new("out", 0);
        ctx.begin_collect_markers();
        ctx.dispatch(&FillGroupIds { out: &out, lanes: 4 }, 0).unwrap();
        assert!(ctx.end_collect_markers().is_empty());
    }

    #[test]
    fn test_markers_recorded_in_order() {
        let ctx = small_context();
        let out = Buffer::new("out", 32);
        ctx.dispatch(&FillGroupIds { out: &out, lanes: 8 }, 4).unwrap();

        ctx.begin_collect_markers();
        ctx.dispatch(&FillGroupIds { out: &out, lanes: 8 }, 4).unwrap();
        ctx.dispatch(&RotateLeft { out: &out, lanes: 4 }, 1).unwrap();
        let markers = ctx.end_collect_markers();

        let names: Vec<_> = markers.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["fill_group_ids", "rotate_left"]);
        assert_eq!(markers[0].groups, 4);
        assert!(ctx.end_collect_markers().is_empty());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let result = ExecutionContext::new(ContextConfig {
            threads: 1,
            max_group_size: 0,
            max_grid_groups: 1,
        });
        assert!(matches!(result, Err(SortError::InvalidConfig(_))));
    }
}
