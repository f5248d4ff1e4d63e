/// Advisory information passed with every begin marker.
///
/// Formats may use hints to produce smaller or more readable output.
/// A hint never changes the decoded value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hints {
    /// The static type at this site is closed, the reader already knows the tag.
    pub elided: bool,
    /// The object id allocated for a shared value, in pre-order.
    pub object_id: Option<u32>,
    /// Number of elements of a collection entry.
    pub size: Option<usize>,
}

impl Hints {
    /// No hints.
    pub const NONE: Hints = Hints {
        elided: false,
        object_id: None,
        size: None,
    };

    #[inline]
    pub const fn with_elided(mut self, elided: bool) -> Self {
        self.elided = elided;
        self
    }

    #[inline]
    pub const fn with_object_id(mut self, id: u32) -> Self {
        self.object_id = Some(id);
        self
    }

    #[inline]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}
