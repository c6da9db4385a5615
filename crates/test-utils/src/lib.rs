//! Test utilities shared between the workspace crates.

/// A result type useful in tests, that wraps any error implementation.
pub type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Shortcut for `<string>.parse().unwrap()`.
#[macro_export]
macro_rules! parse {
    ($string:literal) => {
        $string.parse().unwrap()
    };
}

/// Macro for creating parametrized tests.
///
/// The `param_test!` macro accepts the name of an existing function, followed by a list of case
/// names and their arguments. It expands to a module with a `#[test]` function for each of the
/// cases. Each test case calls the existing, named function with their provided arguments.
///
/// # Examples
///
/// Calling a simple test function can be done as follows
///
/// ```
/// # use test_utils::param_test;
/// #
/// param_test! {
///     masks_to_width: [
///         full_byte: (0xff, 8, 0xff),
///         nibble: (0xff, 4, 0x0f)
///     ]
/// }
/// fn masks_to_width(value: u8, bits: u32, masked: u8) {
///     assert_eq!(value & ((1u16 << bits) - 1) as u8, masked);
/// }
/// ```
///
/// Additionally, test functions can also have return types, such as a [`Result`]:
///
/// ```
/// # use std::error::Error;
/// # use test_utils::param_test;
/// #
/// param_test! {
///     parses_address -> Result<(), Box<dyn Error>>: [
///         loopback: ("127.0.0.1", [127, 0, 0, 1]),
///         documentation: ("192.0.2.7", [192, 0, 2, 7])
///     ]
/// }
/// fn parses_address(to_parse: &str, octets: [u8; 4]) -> Result<(), Box<dyn Error>> {
///     assert_eq!(to_parse.parse::<std::net::Ipv4Addr>()?.octets(), octets);
///     Ok(())
/// }
/// ```
///
/// Finally, attributes such as `#[ignore]` may be added to individual tests:
///
/// ```
/// # use std::error::Error;
/// # use test_utils::param_test;
/// #
/// param_test! {
///     parses_address -> Result<(), Box<dyn Error>>: [
///         #[ignore] loopback: ("127.0.0.1", [127, 0, 0, 1]),
///         documentation: ("192.0.2.7", [192, 0, 2, 7])
///     ]
/// }
/// fn parses_address(to_parse: &str, octets: [u8; 4]) -> Result<(), Box<dyn Error>> {
///     assert_eq!(to_parse.parse::<std::net::Ipv4Addr>()?.octets(), octets);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! param_test {
    ($func_name:ident -> $return_ty:ty: [
        $( $(#[$outer:meta])* $case_name:ident: ( $($args:expr),+ )  ),+$(,)?
    ]) => {
        mod $func_name {
            use super::*;

            $(
                #[test]
                $(#[$outer])*
                fn $case_name() -> $return_ty {
                    $func_name($($args),+)
                }
            )*
        }
    };
    ($func_name:ident: [
        $( $(#[$outer:meta])* $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        param_test!($func_name -> (): [ $( $(#[$outer])* $case_name: ( $($args),+ ) ),+ ]);
    };
}
