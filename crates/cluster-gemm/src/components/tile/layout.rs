/// Where the elements of a matrix operand live inside a flat buffer.
///
/// Element `(row, col)` is at `offset + row * row_stride + col * col_stride`.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StridedLayout {
    pub offset: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl StridedLayout {
    /// Row-major layout with leading dimension `ld`.
    pub fn row_major(ld: usize) -> Self {
        Self::new(0, ld, 1)
    }

    /// Layout of an operand stored row-major with leading dimension `ld`, or stored as its
    /// transpose when `transposed` is set.
    pub fn from_ld(ld: usize, transposed: bool) -> Self {
        match transposed {
            false => Self::new(0, ld, 1),
            true => Self::new(0, 1, ld),
        }
    }

    /// Keeps rows `first, first + step, first + 2 * step, ...` and renumbers them from 0.
    pub fn interleaved(self, first: usize, step: usize) -> Self {
        Self {
            offset: self.offset + first * self.row_stride,
            row_stride: self.row_stride * step,
            col_stride: self.col_stride,
        }
    }

    /// Index of element `(row, col)`.
    #[inline(always)]
    pub fn index(&self, row: usize, col: usize) -> usize {
        self.offset + row * self.row_stride + col * self.col_stride
    }
}
