use core::fmt::Display;
use std::sync::mpsc;

use crate::memory::Addr;

/// One block copy executed by a transfer engine.
///
/// `repeat` rows of `size` bytes are copied; consecutive rows start `src_stride` bytes apart in
/// the source and `dst_stride` bytes apart in the destination.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// First destination byte.
    pub dst: Addr,
    /// First source byte.
    pub src: Addr,
    /// Bytes per row.
    pub size: usize,
    /// Distance between destination rows.
    pub dst_stride: usize,
    /// Distance between source rows.
    pub src_stride: usize,
    /// Number of rows.
    pub repeat: usize,
}

impl Transfer {
    /// A contiguous copy of `size` bytes.
    pub fn contiguous(dst: Addr, src: Addr, size: usize) -> Self {
        Self::new(dst, src, size, size, size, 1)
    }

    /// Total number of bytes moved.
    pub fn bytes(&self) -> usize {
        self.size * self.repeat
    }
}

impl Display for Transfer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.repeat == 1 {
            write!(f, "{:?} <- {:?} [{} bytes]", self.dst, self.src, self.size)
        } else {
            write!(
                f,
                "{:?} <- {:?} [{} x {} bytes, strides {}/{}]",
                self.dst, self.src, self.repeat, self.size, self.dst_stride, self.src_stride
            )
        }
    }
}

/// Message processed in order by a transfer engine worker.
#[derive(Debug)]
pub(crate) enum TransferRequest {
    Copy(Transfer),
    /// Acknowledged once every previous request has been executed.
    Fence(mpsc::Sender<()>),
}
