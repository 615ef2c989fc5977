use bytemuck::{Pod, Zeroable};
use cluster_common::Precision;
use cluster_runtime::memory::SharedAddr;

use super::{GemmProblem, Strategy};

/// Base addresses of the matrices of one GEMM in shared memory.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GemmOperands {
    /// Operand A, stored transposed if requested by the problem.
    pub a: SharedAddr,
    /// Operand B, stored transposed if requested by the problem.
    pub b: SharedAddr,
    /// Output C, also read when beta is non-zero.
    pub c: SharedAddr,
    /// Scratch for partial products, at least [GemmProblem::workspace_size] bytes.
    pub workspace: Option<SharedAddr>,
}

/// The descriptor of one GEMM invocation as it lives in memory.
///
/// The host writes it to shared memory; each cluster copies it once into the start of its local
/// memory and reads it from there for the rest of the invocation.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GemmArgs {
    pub alpha: f64,
    pub beta: f64,
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub workspace: u64,
    pub m: u32,
    pub n: u32,
    pub k: u32,
    pub m_tiles: u32,
    pub n_tiles: u32,
    pub k_tiles: u32,
    /// Element size in bytes.
    pub prec: u32,
    pub trans_a: u32,
    pub trans_b: u32,
    /// 0 for row-tiled, 1 for reduction-tiled.
    pub strategy: u32,
    pub broadcast_b: u32,
    pub fast_path: u32,
}

impl GemmArgs {
    /// Encodes a validated problem.
    pub fn new(problem: &GemmProblem, operands: &GemmOperands) -> Self {
        Self {
            alpha: problem.alpha,
            beta: problem.beta,
            a: operands.a.0,
            b: operands.b.0,
            c: operands.c.0,
            workspace: operands.workspace.map(|addr| addr.0).unwrap_or_default(),
            m: problem.m as u32,
            n: problem.n as u32,
            k: problem.k as u32,
            m_tiles: problem.m_tiles as u32,
            n_tiles: problem.n_tiles as u32,
            k_tiles: problem.k_tiles as u32,
            prec: problem.precision.size() as u32,
            trans_a: problem.trans_a as u32,
            trans_b: problem.trans_b as u32,
            strategy: match problem.strategy {
                Strategy::RowTiled => 0,
                Strategy::ReductionTiled => 1,
            },
            broadcast_b: problem.broadcast_b as u32,
            fast_path: problem.fast_path as u32,
        }
    }

    /// Decodes the descriptor, or `None` if a tag is unknown.
    pub fn decode(&self) -> Option<(GemmProblem, GemmOperands)> {
        let strategy = match self.strategy {
            0 => Strategy::RowTiled,
            1 => Strategy::ReductionTiled,
            _ => return None,
        };
        let problem = GemmProblem {
            m: self.m as usize,
            n: self.n as usize,
            k: self.k as usize,
            m_tiles: self.m_tiles as usize,
            n_tiles: self.n_tiles as usize,
            k_tiles: self.k_tiles as usize,
            precision: Precision::from_size(self.prec)?,
            trans_a: self.trans_a != 0,
            trans_b: self.trans_b != 0,
            alpha: self.alpha,
            beta: self.beta,
            strategy,
            broadcast_b: self.broadcast_b != 0,
            fast_path: self.fast_path != 0,
        };
        let operands = GemmOperands {
            a: SharedAddr(self.a),
            b: SharedAddr(self.b),
            c: SharedAddr(self.c),
            workspace: (problem.workspace_size() > 0).then_some(SharedAddr(self.workspace)),
        };

        Some((problem, operands))
    }
}
