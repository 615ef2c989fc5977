use cluster_common::Precision;
use cluster_runtime::config::Topology;
use cluster_runtime::transfer::MAX_CLUSTERS_PER_QUAD;
use core::fmt::Display;
use serde::{Deserialize, Serialize};

use super::GemmSetupError;
use super::stage::TileBufferLayout;

/// How the work of one GEMM is spread over clusters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Each cluster owns whole output row tiles, no partial results are exchanged.
    #[default]
    #[serde(rename = "row_tiled")]
    RowTiled,
    /// Each cluster computes the partial product of one slice of K over the whole output, then
    /// partial products are summed with a reduction tree.
    #[serde(rename = "reduction_tiled")]
    ReductionTiled,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Strategy::RowTiled => f.write_str("row-tiled"),
            Strategy::ReductionTiled => f.write_str("reduction-tiled"),
        }
    }
}

/// Description of a GEMM problem to solve, regardless of actual data.
///
/// Computes `C = alpha * op(A) * op(B) + beta * C` where `op(A)` is `M x K`, `op(B)` is `K x N`
/// and every matrix is stored row-major. A transposed operand is stored as its transpose, so
/// `A` is stored `K x M` when `trans_a` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GemmProblem {
    /// Rows of `op(A)` and `C`.
    pub m: usize,
    /// Columns of `op(B)` and `C`.
    pub n: usize,
    /// Reduction dimension.
    pub k: usize,
    /// Number of tiles along M.
    #[serde(default = "one")]
    pub m_tiles: usize,
    /// Number of tiles along N.
    #[serde(default = "one")]
    pub n_tiles: usize,
    /// Number of slices of K. Must be 1 in row-tiled mode and the number of clusters in
    /// reduction-tiled mode.
    #[serde(default = "one")]
    pub k_tiles: usize,
    /// Element precision of A, B and C.
    pub precision: Precision,
    /// Whether A is stored transposed.
    #[serde(default)]
    pub trans_a: bool,
    /// Whether B is stored transposed.
    #[serde(default)]
    pub trans_b: bool,
    /// Multiplier of the product.
    #[serde(default = "alpha_default")]
    pub alpha: f64,
    /// Multiplier of the previous C. Zero overwrites C.
    #[serde(default)]
    pub beta: f64,
    /// Parallelization over clusters.
    #[serde(default)]
    pub strategy: Strategy,
    /// Whether the B tiles are loaded once per quad and forwarded to its other clusters.
    #[serde(default)]
    pub broadcast_b: bool,
    /// Whether compute cores use the unrolled micro-kernel.
    #[serde(default)]
    pub fast_path: bool,
}

fn one() -> usize {
    1
}

fn alpha_default() -> f64 {
    1.0
}

impl GemmProblem {
    /// Untiled, row-tiled `C = A * B` problem.
    pub fn new(m: usize, n: usize, k: usize, precision: Precision) -> Self {
        Self {
            m,
            n,
            k,
            m_tiles: 1,
            n_tiles: 1,
            k_tiles: 1,
            precision,
            trans_a: false,
            trans_b: false,
            alpha: 1.0,
            beta: 0.0,
            strategy: Strategy::RowTiled,
            broadcast_b: false,
            fast_path: false,
        }
    }

    /// Sets the number of tiles along M and N.
    pub fn with_tiles(mut self, m_tiles: usize, n_tiles: usize) -> Self {
        self.m_tiles = m_tiles;
        self.n_tiles = n_tiles;
        self
    }

    /// Switches to reduction-tiled mode with `k_tiles` slices of K.
    pub fn with_reduction_tiles(mut self, k_tiles: usize) -> Self {
        self.strategy = Strategy::ReductionTiled;
        self.k_tiles = k_tiles;
        self
    }

    /// Sets the transpose flags.
    pub fn with_transpose(mut self, trans_a: bool, trans_b: bool) -> Self {
        self.trans_a = trans_a;
        self.trans_b = trans_b;
        self
    }

    /// Sets alpha and beta.
    pub fn with_scaling(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    /// Enables the software multicast of B tiles.
    pub fn with_broadcast_b(mut self, broadcast_b: bool) -> Self {
        self.broadcast_b = broadcast_b;
        self
    }

    /// Selects the unrolled micro-kernel.
    pub fn with_fast_path(mut self, fast_path: bool) -> Self {
        self.fast_path = fast_path;
        self
    }

    /// Rows per output tile.
    pub fn frac_m(&self) -> usize {
        self.m / self.m_tiles
    }

    /// Columns per output tile.
    pub fn frac_n(&self) -> usize {
        self.n / self.n_tiles
    }

    /// Length of the K slice one cluster reduces over.
    pub fn frac_k(&self) -> usize {
        self.k / self.k_slices()
    }

    /// Number of K slices computed independently.
    pub fn k_slices(&self) -> usize {
        match self.strategy {
            Strategy::RowTiled => 1,
            Strategy::ReductionTiled => self.k_tiles,
        }
    }

    /// Bytes per element.
    pub fn elem_size(&self) -> usize {
        self.precision.size()
    }

    /// Leading dimension of A as stored.
    pub fn lda(&self) -> usize {
        if self.trans_a { self.m } else { self.k }
    }

    /// Leading dimension of B as stored.
    pub fn ldb(&self) -> usize {
        if self.trans_b { self.k } else { self.n }
    }

    /// Leading dimension of C.
    pub fn ldc(&self) -> usize {
        self.n
    }

    /// Size of the scratch buffer holding the partial products of clusters other than the
    /// first in reduction-tiled mode.
    pub fn workspace_size(&self) -> usize {
        (self.k_slices() - 1) * self.m * self.n * self.elem_size()
    }

    /// Checks the problem against the topology it will run on.
    ///
    /// Every geometry error is caught here; the engine itself assumes a valid problem.
    pub fn validate(&self, topology: &Topology) -> Result<(), GemmSetupError> {
        if topology.clusters == 0 || topology.compute_cores == 0 {
            return Err(GemmSetupError::Unavailable(format!(
                "a topology with {} clusters of {} compute cores can't run a GEMM",
                topology.clusters, topology.compute_cores
            )));
        }

        if self.m == 0 || self.n == 0 || self.k == 0 {
            return Err(GemmSetupError::invalid(format!(
                "empty problem {}x{}x{}",
                self.m, self.n, self.k
            )));
        }

        for (dim, tiles, name) in [
            (self.m, self.m_tiles, "M"),
            (self.n, self.n_tiles, "N"),
            (self.k, self.k_tiles, "K"),
        ] {
            if tiles == 0 || dim % tiles != 0 {
                return Err(GemmSetupError::invalid(format!(
                    "{name}={dim} is not evenly divisible into {tiles} tiles"
                )));
            }
        }

        if [self.m, self.n, self.k].iter().any(|dim| *dim > u32::MAX as usize) {
            return Err(GemmSetupError::invalid(
                "dimensions must fit in 32 bits".to_string(),
            ));
        }

        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(GemmSetupError::invalid(format!(
                "alpha={} and beta={} must be finite",
                self.alpha, self.beta
            )));
        }

        match self.strategy {
            Strategy::RowTiled if self.k_tiles != 1 => {
                return Err(GemmSetupError::invalid(format!(
                    "row-tiled mode doesn't tile K, got k_tiles={}",
                    self.k_tiles
                )));
            }
            Strategy::ReductionTiled if self.k_tiles != topology.clusters => {
                return Err(GemmSetupError::invalid(format!(
                    "reduction-tiled mode needs one K slice per cluster, got k_tiles={} for {} clusters",
                    self.k_tiles, topology.clusters
                )));
            }
            Strategy::ReductionTiled if self.broadcast_b => {
                return Err(GemmSetupError::invalid(
                    "B tiles differ between clusters in reduction-tiled mode and can't be broadcast"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if self.broadcast_b {
            if topology.clusters_per_quad == 0
                || topology.clusters_per_quad > MAX_CLUSTERS_PER_QUAD
                || topology.clusters % topology.clusters_per_quad != 0
            {
                return Err(GemmSetupError::Unavailable(format!(
                    "broadcast needs full quads of at most {MAX_CLUSTERS_PER_QUAD} clusters, got {} clusters in quads of {}",
                    topology.clusters, topology.clusters_per_quad
                )));
            }
            if self.m_tiles % topology.clusters != 0 {
                return Err(GemmSetupError::invalid(format!(
                    "broadcast needs every cluster to own as many row tiles, got {} tiles for {} clusters",
                    self.m_tiles, topology.clusters
                )));
            }
        }

        TileBufferLayout::new(self, topology.tcdm_size).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(clusters: usize) -> Topology {
        Topology::new(clusters, 8)
    }

    #[test]
    fn accepts_concrete_scenario() {
        let problem = GemmProblem::new(256, 256, 256, Precision::Fp32).with_tiles(4, 4);

        let topology = Topology::new(1, 4).with_tcdm_size(512 * 1024);

        assert_eq!(problem.validate(&topology), Ok(()));
        assert!(problem.validate(&Topology::new(1, 4)).is_err());
        assert_eq!(problem.frac_m(), 64);
        assert_eq!(problem.frac_k(), 256);
    }

    #[test]
    fn rejects_uneven_tiling() {
        let problem = GemmProblem::new(100, 64, 64, Precision::Fp32).with_tiles(3, 1);

        assert!(matches!(
            problem.validate(&topology(1)),
            Err(GemmSetupError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reduction_needs_one_slice_per_cluster() {
        let problem = GemmProblem::new(32, 32, 64, Precision::Fp64).with_reduction_tiles(2);

        assert!(problem.validate(&topology(2)).is_ok());
        assert!(problem.validate(&topology(4)).is_err());
        assert_eq!(problem.frac_k(), 32);
        assert_eq!(problem.workspace_size(), 32 * 32 * 8);
    }

    #[test]
    fn row_tiled_mode_rejects_k_tiles() {
        let mut problem = GemmProblem::new(32, 32, 64, Precision::Fp32);
        problem.k_tiles = 2;

        assert!(problem.validate(&topology(2)).is_err());
    }

    #[test]
    fn broadcast_needs_full_quads() {
        let problem = GemmProblem::new(64, 64, 64, Precision::Fp32)
            .with_tiles(4, 2)
            .with_broadcast_b(true);
        let quads = Topology::new(4, 2).with_clusters_per_quad(2);
        let partial_quad = Topology::new(3, 2).with_clusters_per_quad(2);

        assert!(problem.validate(&quads).is_ok());
        assert!(matches!(
            problem.validate(&partial_quad),
            Err(GemmSetupError::Unavailable(_))
        ));
    }

    #[test]
    fn oversized_tiles_exhaust_local_memory() {
        let problem = GemmProblem::new(256, 256, 256, Precision::Fp64);

        assert!(matches!(
            problem.validate(&topology(1)),
            Err(GemmSetupError::LocalMemoryExhausted { .. })
        ));
    }

    #[test]
    fn deserializes_with_defaults() {
        let problem: GemmProblem = toml::from_str(
            r#"
            m = 64
            n = 32
            k = 16
            precision = "fp16"
            strategy = "reduction_tiled"
            k_tiles = 2
            "#,
        )
        .unwrap();

        assert_eq!(
            problem,
            GemmProblem::new(64, 32, 16, Precision::Fp16).with_reduction_tiles(2)
        );
    }
}
