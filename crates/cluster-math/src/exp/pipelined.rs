use super::ExpContext;
use crate::VectorKernelError;

/// Elements processed by one phase at a time.
pub const BATCH_SIZE: usize = 8;

/// Rotating `kd` and `z` buffers, written by the first phase and read by the two others.
const KD_BUFFERS: usize = 3;
/// Rotating scale buffers, written by the second phase and read by the third.
const SCALE_BUFFERS: usize = 2;

/// Batches handled by each phase during one iteration.
///
/// With `batches` batches the pipeline runs `batches + 2` iterations. During iteration `i` the
/// first phase reduces batch `i`, the second looks up the scales of batch `i - 1` and the third
/// evaluates batch `i - 2`. Batch `b` uses `kd` buffer `b % 3` and scale buffer `b % 2`, so no
/// phase writes a buffer another phase still reads in the same iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpStage {
    pub reduce: Option<usize>,
    pub lookup: Option<usize>,
    pub evaluate: Option<usize>,
}

impl ExpStage {
    pub fn iterations(batches: usize) -> usize {
        batches + 2
    }

    pub fn at(iteration: usize, batches: usize) -> Self {
        let batch = |lag: usize| iteration.checked_sub(lag).filter(|batch| *batch < batches);

        Self {
            reduce: batch(0),
            lookup: batch(1),
            evaluate: batch(2),
        }
    }
}

#[derive(Default)]
struct ExpBuffers {
    kd: [[f64; BATCH_SIZE]; KD_BUFFERS],
    z: [[f64; BATCH_SIZE]; KD_BUFFERS],
    scale: [[u64; BATCH_SIZE]; SCALE_BUFFERS],
}

/// `exp` of every input, batch by batch, with the reduction, table lookup and polynomial phases
/// of consecutive batches interleaved.
///
/// Produces the same bits as [vexpf_naive](super::vexpf_naive). The length must be a multiple of
/// [BATCH_SIZE].
pub fn vexpf_pipelined(
    context: &ExpContext,
    input: &[f32],
    output: &mut [f32],
) -> Result<(), VectorKernelError> {
    if input.len() != output.len() {
        return Err(VectorKernelError::LengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }
    if input.len() % BATCH_SIZE != 0 {
        return Err(VectorKernelError::UnalignedLength {
            len: input.len(),
            batch: BATCH_SIZE,
        });
    }

    let batches = input.len() / BATCH_SIZE;
    let mut buffers = ExpBuffers::default();
    log::trace!("Pipelined exp over {batches} batches");

    for iteration in 0..ExpStage::iterations(batches) {
        let stage = ExpStage::at(iteration, batches);

        if let Some(batch) = stage.reduce {
            let slot = batch % KD_BUFFERS;
            let xs = &input[batch * BATCH_SIZE..(batch + 1) * BATCH_SIZE];
            for (i, x) in xs.iter().enumerate() {
                let (kd, z) = context.reduce(*x);
                buffers.kd[slot][i] = kd;
                buffers.z[slot][i] = z;
            }
        }

        if let Some(batch) = stage.lookup {
            let kd = &buffers.kd[batch % KD_BUFFERS];
            let scale = &mut buffers.scale[batch % SCALE_BUFFERS];
            for (kd, scale) in kd.iter().zip(scale.iter_mut()) {
                *scale = context.scale_bits(kd.to_bits());
            }
        }

        if let Some(batch) = stage.evaluate {
            let slot = batch % KD_BUFFERS;
            let ys = &mut output[batch * BATCH_SIZE..(batch + 1) * BATCH_SIZE];
            for (i, y) in ys.iter_mut().enumerate() {
                *y = context.evaluate(
                    buffers.kd[slot][i],
                    buffers.z[slot][i],
                    buffers.scale[batch % SCALE_BUFFERS][i],
                );
            }
        }
    }

    Ok(())
}
