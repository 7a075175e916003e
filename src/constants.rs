//! Centralized constants for the ellmat sparse matrix engine
//!
//! All new constants should be added here rather than scattered throughout the code.

// ============================================================================
// MEMORY LAYOUT
// ============================================================================

/// Alignment in bytes of the value and index buffers (one cache line)
pub const STORAGE_ALIGN: usize = 64;

// ============================================================================
// PARALLEL EXECUTION
// ============================================================================

/// Fewest rows handed to a single worker block; shorter local ranges run
/// on fewer workers
pub const MIN_ROWS_PER_BLOCK: usize = 64;

// ============================================================================
// PRINTING
// ============================================================================

/// Rows and columns shown by `print_leading`
pub const DEFAULT_PRINT_WINDOW: usize = 10;
