/// Options of one [`Engine`](crate::Engine).
///
/// ```
/// use vc_pickle::PickleConfig;
///
/// const COMPACT: PickleConfig = PickleConfig::new()
///     .with_elide_closed_tags(true)
///     .with_max_depth(64);
///
/// assert!(COMPACT.elide_closed_tags);
/// assert!(COMPACT.size_hints);
/// assert_eq!(PickleConfig::new().max_depth, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickleConfig {
    /// Omit the tags of closed types at closed sites.
    ///
    /// Streams written with this option can only be read back into the same
    /// static types.
    pub elide_closed_tags: bool,
    /// Maximum entry nesting, both when encoding and decoding.
    ///
    /// `None` by default: the traversal grows its stack on demand, so depth
    /// is only bounded by the graph.
    pub max_depth: Option<usize>,
    /// Pass collection sizes to the format.
    pub size_hints: bool,
}

impl PickleConfig {
    pub const fn new() -> Self {
        Self {
            elide_closed_tags: false,
            max_depth: None,
            size_hints: true,
        }
    }

    #[inline]
    pub const fn with_elide_closed_tags(mut self, elide: bool) -> Self {
        self.elide_closed_tags = elide;
        self
    }

    #[inline]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    #[inline]
    pub const fn with_size_hints(mut self, size_hints: bool) -> Self {
        self.size_hints = size_hints;
        self
    }
}

impl Default for PickleConfig {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
