//! Configuration partitioning
//!
//! Splits one [`Config`] into independently runnable configurations whose
//! source path groups together cover the original exactly once.
//!
//! Each group is cut on its own into `min(n, len)` contiguous chunks taken in
//! insertion order. Chunks differ in size by at most one, and the larger ones
//! come first: eight paths over three partitions give 3, 3, 2. A group never
//! gets an empty entry, so a group of two paths over three partitions only
//! appears in the first two configurations.
//!
//! The JDK path names a single resource and stays with partition 0.

use crate::config::{Config, SourcePaths};
use indexmap::IndexSet;
use std::ops::Range;

/// Contiguous chunk bounds for `len` items over at most `n` chunks
fn chunk_ranges(len: usize, n: usize) -> Vec<Range<usize>> {
    let k = n.min(len);
    if k == 0 {
        return Vec::new();
    }

    let base = len / k;
    let remainder = len % k;

    let mut ranges = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = base + usize::from(i < remainder);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Partition `config` into at most `n` configurations.
///
/// `n` below 1 is treated as 1. The result always holds at least one
/// configuration, so a configuration with only a JDK path still runs.
pub fn partition_config(config: &Config, n: usize) -> Vec<Config> {
    let n = n.max(1);

    let count = config
        .source_paths()
        .values()
        .map(|paths| n.min(paths.len()))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut slices: Vec<SourcePaths> = vec![SourcePaths::new(); count];

    for (group, paths) in config.source_paths() {
        let ordered: Vec<&String> = paths.iter().collect();
        for (index, range) in chunk_ranges(ordered.len(), n).into_iter().enumerate() {
            let chunk: IndexSet<String> = ordered[range].iter().map(|p| (*p).clone()).collect();
            slices[index].insert(group.clone(), chunk);
        }
    }

    slices
        .into_iter()
        .enumerate()
        .map(|(index, source_paths)| {
            let jdk_path = if index == 0 {
                config.jdk_path().map(|p| p.to_path_buf())
            } else {
                None
            };
            config.derive(source_paths, jdk_path)
        })
        .collect()
}
