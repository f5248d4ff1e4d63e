use core::fmt;

/// Counters of one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Entries begun, `Null` and `Ref` entries included.
    pub entries: usize,
    /// Shared objects registered in the identity registry.
    pub shared_objects: usize,
    /// Back references written or resolved.
    pub back_refs: usize,
    /// Open dispatch sites visited.
    pub runtime_lookups: usize,
    /// Open dispatch sites resolved by the candidate list.
    pub candidate_hits: usize,
    /// Open dispatch sites resolved by the process-wide registry.
    pub registry_fallbacks: usize,
}

impl fmt::Display for TraversalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} shared, {} refs, {} lookups ({} candidate, {} registry)",
            self.entries,
            self.shared_objects,
            self.back_refs,
            self.runtime_lookups,
            self.candidate_hits,
            self.registry_fallbacks,
        )
    }
}
