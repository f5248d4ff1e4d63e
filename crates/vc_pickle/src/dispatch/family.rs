/// Declares an open type family over a trait.
///
/// The trait must have [`Dynamic`](crate::tag::Dynamic) as a supertrait.
/// The macro implements:
///
/// - [`TypePath`](crate::tag::TypePath) for `dyn Trait`, with the given key;
/// - [`Pickle`](crate::Pickle) for `dyn Trait`, through a lazily built
///   [`OpenDispatch`](crate::dispatch::OpenDispatch) with the listed candidates;
/// - [`UnpicklePointee`](crate::UnpicklePointee) for `dyn Trait`.
///
/// So `Box<dyn Trait>`, `Rc<dyn Trait>` and `Arc<dyn Trait>` can be pickled.
/// Runtime types outside the candidate list are looked up in the registry,
/// see [`PicklerRegistry::register_upcast`](crate::PicklerRegistry::register_upcast).
///
/// ```
/// use vc_pickle::tag::{Dynamic, TypeTag};
/// use vc_pickle::{Pickle, PickleWriter, Unpickle, UnpickleReader, Result};
/// use vc_pickle::{impl_pickle_family, impl_type_path};
///
/// trait Shape: Dynamic {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 { self.0 * self.0 }
/// }
///
/// impl_type_path!(Square => "demo::Square");
///
/// impl Pickle for Square {
///     fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
///         w.begin_entry_of::<Self>()?;
///         w.put_field("side", &self.0)?;
///         w.end_entry()
///     }
/// }
///
/// impl Unpickle for Square {
///     fn unpickle_tagged(tag: TypeTag, r: &mut UnpickleReader<'_>) -> Result<Self> {
///         r.expect_tag::<Self>(&tag)?;
///         let side = r.read_field("side")?;
///         r.end_entry()?;
///         Ok(Square(side))
///     }
/// }
///
/// impl_pickle_family!(dyn Shape as "demo::Shape" => [Square]);
///
/// let shape: Box<dyn Shape> = Box::new(Square(3.0));
/// let bytes = vc_pickle::to_bytes(&shape).unwrap();
/// let back: Box<dyn Shape> = vc_pickle::from_bytes(&bytes).unwrap();
/// assert_eq!(back.area(), 9.0);
/// ```
#[macro_export]
macro_rules! impl_pickle_family {
    (dyn $family:path as $key:literal => [$($candidate:ty),* $(,)?]) => {
        impl $crate::tag::TypePath for dyn $family {
            #[inline]
            fn type_path() -> &'static str {
                $key
            }
        }

        const _: () = {
            use $crate::__macro_exports::{Arc, Box, OnceLock, Rc};
            use $crate::dispatch::OpenDispatch;
            use $crate::tag::TypeTag;
            use $crate::{PickleWriter, Result, UnpickleReader};

            fn dispatch() -> &'static OpenDispatch<dyn $family> {
                static DISPATCH: OnceLock<OpenDispatch<dyn $family>> = OnceLock::new();
                DISPATCH.get_or_init(|| {
                    OpenDispatch::new()
                        $(.with_candidate::<$candidate>(|value: $candidate| -> Box<dyn $family> {
                            Box::new(value)
                        }))*
                })
            }

            impl $crate::Pickle for dyn $family {
                #[inline]
                fn pickle(&self, w: &mut PickleWriter<'_>) -> Result<()> {
                    dispatch().pickle(self, w)
                }
            }

            impl $crate::UnpicklePointee for dyn $family {
                #[inline]
                fn pointee_tag() -> TypeTag {
                    TypeTag::of::<dyn $family>()
                }

                #[inline]
                fn unpickle_boxed(
                    tag: TypeTag,
                    r: &mut UnpickleReader<'_>,
                ) -> Result<Box<Self>> {
                    dispatch().unpickle_tagged(tag, r)
                }

                fn unpickle_rc(
                    tag: TypeTag,
                    id: u32,
                    r: &mut UnpickleReader<'_>,
                ) -> Result<Rc<Self>> {
                    let shared: Rc<Self> = Rc::from(dispatch().unpickle_tagged(tag, r)?);
                    r.fill(id, shared.clone())?;
                    Ok(shared)
                }

                fn unpickle_arc(
                    tag: TypeTag,
                    id: u32,
                    r: &mut UnpickleReader<'_>,
                ) -> Result<Arc<Self>> {
                    let shared: Arc<Self> = Arc::from(dispatch().unpickle_tagged(tag, r)?);
                    r.fill(id, shared.clone())?;
                    Ok(shared)
                }
            }
        };
    };
}
