/// Errors raised before a vector kernel runs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VectorKernelError {
    /// The kernel processes whole batches only.
    #[error("Length {len} is not a multiple of the batch size {batch}")]
    UnalignedLength { len: usize, batch: usize },

    /// Input and output don't have the same length.
    #[error("Input has {input} elements but output has {output}")]
    LengthMismatch { input: usize, output: usize },
}
