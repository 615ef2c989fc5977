use crate::components::{GemmArgs, GemmProblem, GemmSetupError};

/// Alignment of every region of the local memory.
const LOCAL_ALIGNMENT: usize = 8;

/// One half of a double buffer.
///
/// Tile `t` of a pipeline lives in [StageBuffer::of]`(t)`, so consecutive tiles alternate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageBuffer {
    /// Even tiles.
    First,
    /// Odd tiles.
    Second,
}

impl StageBuffer {
    /// Buffer holding the tile at index `tile` of a pipeline.
    pub fn of(tile: usize) -> Self {
        match tile % 2 {
            0 => StageBuffer::First,
            _ => StageBuffer::Second,
        }
    }

    fn index(self) -> usize {
        match self {
            StageBuffer::First => 0,
            StageBuffer::Second => 1,
        }
    }
}

/// Identifies one of the matrices of a GEMM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    A,
    B,
    C,
}

/// Byte offsets of every tile slot in a cluster's local memory.
///
/// The descriptor sits at offset 0. The GEMM phase follows with two slots for each of A, B and
/// C. The reduction phase of reduction-tiled mode reuses the same space for two pairs of output
/// tiles once the GEMM phase is over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileBufferLayout {
    a: [usize; 2],
    b: [usize; 2],
    c: [usize; 2],
    acc: [usize; 2],
    partial: [usize; 2],
    size: usize,
}

impl TileBufferLayout {
    /// Lays out the slots of `problem`, failing if they don't fit in `tcdm_size` bytes.
    pub fn new(problem: &GemmProblem, tcdm_size: usize) -> Result<Self, GemmSetupError> {
        let elem_size = problem.elem_size();
        let tile_a = aligned(problem.frac_m() * problem.frac_k() * elem_size);
        let tile_b = aligned(problem.frac_k() * problem.frac_n() * elem_size);
        let tile_c = aligned(problem.frac_m() * problem.frac_n() * elem_size);

        let mut heap = aligned(size_of::<GemmArgs>());
        let mut reserve = |size: usize| {
            let offset = heap;
            heap += size;
            offset
        };
        let (a0, b0, c0) = (reserve(tile_a), reserve(tile_b), reserve(tile_c));
        let (a1, b1, c1) = (reserve(tile_a), reserve(tile_b), reserve(tile_c));
        let gemm_end = heap;

        let base = aligned(size_of::<GemmArgs>());
        let acc = [base, base + 2 * tile_c];
        let partial = [base + tile_c, base + 3 * tile_c];
        let reduction_end = base + 4 * tile_c;

        let size = usize::max(gemm_end, reduction_end);
        if size > tcdm_size {
            return Err(GemmSetupError::LocalMemoryExhausted {
                required: size,
                available: tcdm_size,
            });
        }

        Ok(Self {
            a: [a0, a1],
            b: [b0, b1],
            c: [c0, c1],
            acc,
            partial,
            size,
        })
    }

    /// Offset of the slot of `operand` in `buffer` during the GEMM phase.
    pub fn slot(&self, operand: Operand, buffer: StageBuffer) -> usize {
        match operand {
            Operand::A => self.a[buffer.index()],
            Operand::B => self.b[buffer.index()],
            Operand::C => self.c[buffer.index()],
        }
    }

    /// Offset of the slot receiving a sum during the reduction phase.
    pub fn acc_slot(&self, buffer: StageBuffer) -> usize {
        self.acc[buffer.index()]
    }

    /// Offset of the slot holding the added partial product during the reduction phase.
    pub fn partial_slot(&self, buffer: StageBuffer) -> usize {
        self.partial[buffer.index()]
    }

    /// Bytes of local memory used, descriptor included.
    pub fn size(&self) -> usize {
        self.size
    }
}

fn aligned(size: usize) -> usize {
    size.next_multiple_of(LOCAL_ALIGNMENT)
}
