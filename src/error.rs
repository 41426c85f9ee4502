//! Error types shared by the allocator tiers and the containers.

use thiserror::Error;

/// Failure of an allocator request.
///
/// Out-of-memory is the only condition an allocator reports. It surfaces once the
/// system has refused the request and either no out-of-memory handler is
/// installed or the handler's retry loop gave up.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AllocError {
    /// The request could not be satisfied.
    #[error("out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Size of the request in bytes.
        size: usize,
    },
}

impl AllocError {
    /// Size of the failed request in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::OutOfMemory { size } => *size,
        }
    }
}

/// Errors returned by fallible container operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
#[must_use = "errors should be handled"]
pub enum ContainerError {
    /// An allocation made on behalf of the container failed. The container was
    /// rolled back to its state before the call.
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// Bounds-checked positional access outside `0..len`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Container length at the time of the call.
        len: usize,
    },

    /// Bounds-checked keyed access for a key that is not stored.
    #[error("key not found")]
    KeyNotFound,
}

impl ContainerError {
    /// Whether the error came from memory exhaustion.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::Alloc(_))
    }

    /// Stable error code for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Alloc(_) => "CONTAINER:OUT_OF_MEMORY",
            Self::IndexOutOfRange { .. } => "CONTAINER:INDEX_OUT_OF_RANGE",
            Self::KeyNotFound => "CONTAINER:KEY_NOT_FOUND",
        }
    }
}

/// Result alias for container operations.
pub type ContainerResult<T> = core::result::Result<T, ContainerError>;

/// Red-black invariant breach found by [`RbTree::verify`](crate::prelude::RbTree::verify).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RbViolation {
    /// The root node is red.
    #[error("root is red")]
    RedRoot,
    /// A red node has a red child.
    #[error("red node has a red child")]
    RedRedEdge,
    /// Two root-to-leaf paths cross different numbers of black nodes.
    #[error("black height differs between paths ({left} vs {right})")]
    BlackHeightMismatch {
        /// Black height of the left subtree.
        left: usize,
        /// Black height of the right subtree.
        right: usize,
    },
    /// In-order traversal is not sorted under the comparator.
    #[error("in-order traversal is out of order")]
    OutOfOrder,
    /// A child's parent link does not point back at its parent.
    #[error("parent link does not match tree shape")]
    BrokenParentLink,
    /// The cached leftmost or rightmost node is stale.
    #[error("cached leftmost/rightmost node is stale")]
    StaleExtremum,
    /// The stored length disagrees with the number of reachable nodes.
    #[error("length mismatch: recorded {recorded}, counted {counted}")]
    LenMismatch {
        /// Length recorded by the tree.
        recorded: usize,
        /// Nodes reachable from the root.
        counted: usize,
    },
}

/// Routes an allocation failure to the global alloc-error hook.
///
/// Used by trait impls whose signatures cannot report failure.
pub(crate) fn oom_abort(err: AllocError) -> ! {
    let layout = core::alloc::Layout::from_size_align(err.size().max(1), crate::ALIGN)
        .unwrap_or(core::alloc::Layout::new::<u64>());
    alloc::alloc::handle_alloc_error(layout)
}

/// [`oom_abort`] for container errors; any other error is a caller bug.
pub(crate) fn oom_abort_container(err: ContainerError) -> ! {
    match err {
        ContainerError::Alloc(err) => oom_abort(err),
        other => panic!("unexpected container error: {other}"),
    }
}
