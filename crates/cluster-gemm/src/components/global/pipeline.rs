use cluster_runtime::CoreContext;

/// What each stage works on during one iteration of a pipeline.
///
/// A pipeline over `tiles` tiles runs `tiles + 2` iterations. During iteration `i` the tile
/// `i - 2` is stored, the tile `i` is loaded and the tile `i - 1` is computed, when they exist.
/// With two buffers per operand and tile `t` in buffer `t % 2`, the load of tile `i` reuses the
/// buffer of tile `i - 2`, whose store is issued just before in the same iteration, and never
/// the buffer being computed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStage {
    /// Tile written back to shared memory.
    pub store: Option<usize>,
    /// Tile whose operands are brought into local memory.
    pub load: Option<usize>,
    /// Tile computed by the compute cores.
    pub compute: Option<usize>,
}

impl PipelineStage {
    /// Number of iterations needed for `tiles` tiles, fill and drain included.
    pub fn iterations(tiles: usize) -> usize {
        tiles + 2
    }

    /// The stages active at `iteration`.
    pub fn at(iteration: usize, tiles: usize) -> Self {
        Self {
            store: iteration
                .checked_sub(2)
                .filter(|tile| *tile < tiles),
            load: (iteration < tiles).then_some(iteration),
            compute: iteration
                .checked_sub(1)
                .filter(|tile| *tile < tiles),
        }
    }
}

/// The work done at each stage of a pipeline.
///
/// `store` and `load` are called on the data-movement core and only issue transfers; the
/// pipeline waits for them before the compute stage of the same iteration may run. `compute` is
/// called on every compute core.
pub trait StageExecutor {
    /// Number of tiles walked by the pipeline.
    fn tiles(&self) -> usize;

    /// Issues the transfers writing back `tile`.
    fn store(&self, core: &CoreContext<'_>, tile: usize);

    /// Issues the transfers bringing in the operands of `tile`.
    fn load(&self, core: &CoreContext<'_>, tile: usize);

    /// Computes this core's share of `tile`.
    fn compute(&self, core: &CoreContext<'_>, tile: usize);
}

/// Barrier closing the first iteration of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstBarrier {
    /// Every core of every cluster.
    Global,
    /// The cores of the calling cluster only.
    Cluster,
}

/// Runs a pipeline on every core of one cluster.
///
/// Each iteration ends with a barrier; the first one can synchronize all clusters, the others
/// only the cores of the cluster.
pub fn run_pipeline<S: StageExecutor>(core: &CoreContext<'_>, stages: &S, first: FirstBarrier) {
    let tiles = stages.tiles();

    for iteration in 0..PipelineStage::iterations(tiles) {
        let stage = PipelineStage::at(iteration, tiles);

        if core.is_dm_core() {
            // Out before in, the load may reuse the slot being stored.
            if let Some(tile) = stage.store {
                let _span = core.span("store");
                stages.store(core, tile);
                core.dma().wait_all();
            }

            if let Some(tile) = stage.load {
                let _span = core.span("load");
                stages.load(core, tile);
                core.dma().wait_all();
            }
        }

        if let Some(tile) = stage.compute.filter(|_| core.is_compute_core()) {
            let _span = core.span("compute");
            stages.compute(core, tile);
        }

        match (iteration, first) {
            (0, FirstBarrier::Global) => core.global_barrier(),
            _ => core.cluster_barrier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::stage::StageBuffer;

    #[derive(Default, Clone, Copy)]
    struct Timeline {
        load: Option<usize>,
        compute: Option<usize>,
        store: Option<usize>,
    }

    fn timeline(tiles: usize) -> Vec<Timeline> {
        let mut timeline = vec![Timeline::default(); tiles];

        for iteration in 0..PipelineStage::iterations(tiles) {
            let stage = PipelineStage::at(iteration, tiles);
            for (tile, slot) in [
                (stage.load, 0),
                (stage.compute, 1),
                (stage.store, 2),
            ] {
                if let Some(tile) = tile {
                    let entry = &mut timeline[tile];
                    let previous = match slot {
                        0 => entry.load.replace(iteration),
                        1 => entry.compute.replace(iteration),
                        _ => entry.store.replace(iteration),
                    };
                    assert_eq!(previous, None, "tile {tile} scheduled twice");
                }
            }
        }

        timeline
    }

    #[test]
    fn every_tile_is_loaded_computed_and_stored_once_in_order() {
        for tiles in 0..=32 {
            for (tile, entry) in timeline(tiles).iter().enumerate() {
                let (Some(load), Some(compute), Some(store)) =
                    (entry.load, entry.compute, entry.store)
                else {
                    panic!("tile {tile} of {tiles} is missing a stage");
                };
                assert!(load < compute && compute < store);
            }
        }
    }

    #[test]
    fn loads_never_overwrite_live_buffers() {
        for tiles in 0..=32 {
            let timeline = timeline(tiles);

            for iteration in 0..PipelineStage::iterations(tiles) {
                let stage = PipelineStage::at(iteration, tiles);
                let Some(tile) = stage.load else { continue };

                if let Some(compute) = stage.compute {
                    assert_ne!(StageBuffer::of(tile), StageBuffer::of(compute));
                }
                // The previous occupant of the buffer is computed before and stored no later.
                if tile >= 2 {
                    let previous = timeline[tile - 2];
                    assert!(previous.compute.unwrap() < iteration);
                    assert!(previous.store.unwrap() <= iteration);
                }
            }
        }
    }

    #[test]
    fn computes_never_read_a_buffer_loaded_in_the_same_iteration() {
        for tiles in 0..=32 {
            for iteration in 0..PipelineStage::iterations(tiles) {
                let stage = PipelineStage::at(iteration, tiles);
                if let (Some(load), Some(compute)) = (stage.load, stage.compute) {
                    assert_ne!(StageBuffer::of(load), StageBuffer::of(compute));
                }
            }
        }
    }

    #[test]
    fn four_tiles_take_six_iterations() {
        assert_eq!(PipelineStage::iterations(4), 6);
        assert_eq!(
            PipelineStage::at(0, 4),
            PipelineStage {
                store: None,
                load: Some(0),
                compute: None
            }
        );
        assert_eq!(
            PipelineStage::at(3, 4),
            PipelineStage {
                store: Some(1),
                load: Some(3),
                compute: Some(2)
            }
        );
        assert_eq!(
            PipelineStage::at(5, 4),
            PipelineStage {
                store: Some(3),
                load: None,
                compute: None
            }
        );
    }
}
