//! Allocation strategy tags.

use std::fmt;

/// Which allocator produced a block's memory.
///
/// This is only the tag. The block itself stores a tagged union whose
/// variants carry each strategy's metadata, and reports its strategy by
/// inspecting the active variant, so the tag can never drift away from the
/// real allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AllocStrategy {
    /// General-purpose process heap. Resizable in place. The default.
    #[default]
    ProcessHeap,
    /// Process heap, over-allocated so the exposed start meets a requested
    /// alignment. The true base is stashed just before the aligned start.
    Aligned,
    /// Page-granular region straight from the OS virtual-memory manager.
    Virtual,
    /// Distinct buffer allocator with no resize primitive and no size query.
    Network,
    /// Task allocator used for buffers handed across component boundaries.
    ComTask,
}

impl AllocStrategy {
    /// All strategies, in declaration order.
    pub const ALL: [AllocStrategy; 5] = [
        AllocStrategy::ProcessHeap,
        AllocStrategy::Aligned,
        AllocStrategy::Virtual,
        AllocStrategy::Network,
        AllocStrategy::ComTask,
    ];

    /// Whether the underlying allocator can change a block's size without
    /// an allocate-copy-release round trip.
    pub fn resizes_in_place(self) -> bool {
        matches!(self, AllocStrategy::ProcessHeap | AllocStrategy::ComTask)
    }

    /// Short lowercase name, stable for logs.
    pub fn name(self) -> &'static str {
        match self {
            AllocStrategy::ProcessHeap => "process_heap",
            AllocStrategy::Aligned => "aligned",
            AllocStrategy::Virtual => "virtual",
            AllocStrategy::Network => "network",
            AllocStrategy::ComTask => "com_task",
        }
    }
}

impl fmt::Display for AllocStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_heap_and_task_resize_in_place() {
        let in_place: Vec<_> = AllocStrategy::ALL
            .iter()
            .copied()
            .filter(|s| s.resizes_in_place())
            .collect();
        assert_eq!(
            in_place,
            vec![AllocStrategy::ProcessHeap, AllocStrategy::ComTask]
        );
    }

    #[test]
    fn display_uses_stable_names() {
        assert_eq!(AllocStrategy::Virtual.to_string(), "virtual");
        assert_eq!(AllocStrategy::ComTask.to_string(), "com_task");
    }
}
