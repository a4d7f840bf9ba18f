//! Property-based tests for batch scheduling guarantees

mod window_bounds;
