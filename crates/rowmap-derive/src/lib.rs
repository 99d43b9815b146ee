use proc_macro::TokenStream;
use syn::parse_macro_input;
use syn::DeriveInput;

mod from_row;
mod opts;
mod sql_enum;
mod util;

/// Map rows onto a struct.
///
/// Named structs match columns by field name, ignoring case; tuple structs
/// read columns by position. Named structs must implement `Default`.
#[proc_macro_derive(FromRow, attributes(rowmap))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match from_row::expand(input) {
        Ok(ts) => ts.into(),
        Err(e) => e.write_errors().into(),
    }
}

/// Map an integer column onto a fieldless enum by discriminant.
#[proc_macro_derive(SqlEnum, attributes(rowmap))]
pub fn derive_sql_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match sql_enum::expand(input) {
        Ok(ts) => ts.into(),
        Err(e) => e.write_errors().into(),
    }
}
