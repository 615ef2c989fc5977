use super::ExpContext;
use crate::VectorKernelError;

/// `exp` of every input, one element at a time through all three phases.
pub fn vexpf_naive(
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

    for (x, y) in input.iter().zip(output.iter_mut()) {
        let (kd, z) = context.reduce(*x);
        let scale = context.scale_bits(kd.to_bits());
        *y = context.evaluate(kd, z, scale);
    }

    Ok(())
}
