//! Fixed-size batching for size-limited remote calls.

/// Split `items` into consecutive chunks of at most `max` items.
///
/// Chunks cover the input exactly once, in order. Empty input yields no
/// chunks. A `max` of zero is treated as one.
pub fn chunk<T>(items: &[T], max: usize) -> Vec<&[T]> {
    items.chunks(max.max(1)).collect()
}
