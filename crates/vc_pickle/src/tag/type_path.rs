// -----------------------------------------------------------------------------
// TypePath

/// A static accessor to the canonical type path of a type.
///
/// The path is the key written into streams, so it must be unique among
/// pickled types and stable across builds. Unlike [`core::any::type_name`] it
/// does not change with compiler versions.
///
/// Paths must not carry the `::` prefix. Generic arguments are rendered
/// between `<` and `>`, separated by `", "`, e.g. `alloc::vec::Vec<i32>`.
///
/// # Implementation
///
/// For non generic types use [`impl_type_path!`](crate::impl_type_path)
/// or implement it by hand:
///
/// ```
/// use vc_pickle::tag::TypePath;
///
/// struct Foo;
///
/// impl TypePath for Foo {
///     fn type_path() -> &'static str { "my_crate::foo::Foo" }
/// }
/// ```
///
/// For generic types, [`GenericPathCell`] caches the path per instantiation.
///
/// [`GenericPathCell`]: crate::tag::GenericPathCell
pub trait TypePath: 'static {
    /// Returns the canonical path of the type.
    fn type_path() -> &'static str;
}

/// Implement [`TypePath`] for non generic types with a fixed path.
///
/// ```
/// use vc_pickle::impl_type_path;
/// use vc_pickle::tag::TypePath;
///
/// struct Meters(f64);
/// struct Seconds(f64);
///
/// impl_type_path! {
///     Meters => "units::Meters",
///     Seconds => "units::Seconds",
/// }
///
/// assert_eq!(Meters::type_path(), "units::Meters");
/// ```
#[macro_export]
macro_rules! impl_type_path {
    ($($ty:ty => $path:literal),* $(,)?) => {
        $(
            impl $crate::tag::TypePath for $ty {
                #[inline]
                fn type_path() -> &'static str {
                    $path
                }
            }
        )*
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::TypePath;

    struct Plain;

    crate::impl_type_path! {
        Plain => "tests::Plain",
    }

    #[test]
    fn macro_path() {
        assert!(Plain::type_path() == "tests::Plain");
    }
}
