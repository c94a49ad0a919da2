use proc_macro::TokenStream;

mod m_ext_repr;
mod m_packed_data;

/// Implements the [`golf_utils::packed::PackedData`] trait on given type.
///
/// There are two paths that this macro takes:
///  * **struct** - All fields must implement `PackedData`. The generated implementation reads and
///    writes struct fields in order of definition.
///  * **enum** - Enums must use `#[parse_as(T)]` alongside this derive macro, which causes the
///    implementation to read/write `T`, and then convert it to `Self`. `T` has to implement
///    `PackedData`, [`TryFrom<T>`] must be implemented for `Self` and [`From<Self>`] for `T`
///    (both are provided by `ext_repr`)
///
/// *(Note, at the moment tuple structs are not supported)*
#[proc_macro_derive(PackedData, attributes(parse_as))]
pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    m_packed_data::packed_data_derive(input)
}

/// Extended `#[repr(T)]` macro. Aside from invoking normal `#[repr(T)]`, it creates the following
/// trait implementations:
///  * [`From<Self>`] for the repr type
///  * [`TryFrom<T>`] for converting from repr type to self
///  * [`From<Self>`] for `&'static str`, giving the variant's name
///  * [`TryFrom<&str>`] for converting from the variant's name
///  * [`std::fmt::Display`], printing the variant's name
///
/// Failed conversions return a `golf_utils::EnumParseError`.
///
/// **Note:** The macro assumes that `golf_utils` is present and usable.
///
/// ## Example
/// ```norun
/// use golf_proc::ext_repr;
///
/// #[ext_repr(u32)]
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum EntityTag {
///     Model = 0,
///     BallStart = 1,
///     Hole = 2,
/// }
///
/// assert_eq!(EntityTag::try_from(2u32), Ok(EntityTag::Hole));
/// assert_eq!(u32::from(EntityTag::BallStart), 1);
/// assert!(EntityTag::try_from(7u32).is_err());
///
/// assert_eq!(EntityTag::try_from("Model"), Ok(EntityTag::Model));
/// assert_eq!(EntityTag::Hole.to_string(), "Hole");
/// ```
#[proc_macro_attribute]
pub fn ext_repr(input: TokenStream, source_item: TokenStream) -> TokenStream {
    m_ext_repr::ext_repr(input, source_item)
}
