use core::fmt;

crate::cfg::debug! {
    use alloc::boxed::Box;
    use alloc::vec::Vec;
    use crate::tag::TypeTag;

    enum Segment {
        Entry(TypeTag),
        Field(Box<str>),
    }
}

#[cfg(not(all(debug_assertions, feature = "debug")))]
use crate::tag::TypeTag;

/// Path from the root entry to the entry being processed.
///
/// Only tracked in debug builds with the `debug` feature. Otherwise all
/// operations are no-ops and the path displays as `<untracked>`.
#[derive(Default)]
pub(crate) struct EntryTrace {
    #[cfg(all(debug_assertions, feature = "debug"))]
    stack: Vec<Segment>,
}

impl EntryTrace {
    #[inline]
    pub fn enter_entry(&mut self, tag: &TypeTag) {
        crate::cfg::debug! {
            self.stack.push(Segment::Entry(tag.clone()));
        }
        #[cfg(not(all(debug_assertions, feature = "debug")))]
        let _ = tag;
    }

    #[inline]
    pub fn enter_field(&mut self, name: &str) {
        crate::cfg::debug! {
            self.stack.push(Segment::Field(name.into()));
        }
        #[cfg(not(all(debug_assertions, feature = "debug")))]
        let _ = name;
    }

    /// Leaves the current entry and the field slot holding it.
    #[inline]
    pub fn exit_entry(&mut self) {
        crate::cfg::debug! {
            self.stack.pop();
            if matches!(self.stack.last(), Some(Segment::Field(_))) {
                self.stack.pop();
            }
        }
    }
}

#[cfg(all(debug_assertions, feature = "debug"))]
impl fmt::Display for EntryTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stack.is_empty() {
            return f.write_str("<root>");
        }
        for segment in &self.stack {
            match segment {
                Segment::Entry(tag) => write!(f, "`{tag}`")?,
                Segment::Field(name) => write!(f, ".{name} -> ")?,
            }
        }
        Ok(())
    }
}

#[cfg(not(all(debug_assertions, feature = "debug")))]
impl fmt::Display for EntryTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<untracked>")
    }
}
