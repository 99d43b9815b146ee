use darling::FromDeriveInput;
use quote::quote;
use syn::DeriveInput;

use crate::opts::EnumOpts;
use crate::util::lit;

pub fn expand(input: DeriveInput) -> Result<proc_macro2::TokenStream, darling::Error> {
    let opts = EnumOpts::from_derive_input(&input)?;

    if !opts.generics.params.is_empty() {
        return Err(darling::Error::unsupported_shape("generic type parameters are not supported"));
    }

    let variants = match &opts.data {
        darling::ast::Data::Enum(v) => v,
        _ => return Err(darling::Error::unsupported_shape("only enums can derive SqlEnum")),
    };
    let Some(first) = variants.first() else {
        return Err(darling::Error::custom("SqlEnum requires at least one variant").with_span(&opts.ident));
    };

    let ident = &opts.ident;
    let name_lit = lit(&ident.to_string());
    let first = &first.ident;
    let arms = variants.iter().map(|v| {
        let v = &v.ident;
        quote! {
            if n == #ident::#v as i64 {
                return ::std::result::Result::Ok(#ident::#v);
            }
        }
    });

    Ok(quote! {
        impl #ident {
            fn __rowmap_from_discriminant(n: i64) -> ::rowmap::core::Result<Self> {
                #( #arms )*
                ::std::result::Result::Err(::rowmap::core::RowMapError::InvalidEnumValue {
                    column: ::std::option::Option::None,
                    target: #name_lit,
                    value: n,
                })
            }
        }

        #[automatically_derived]
        impl ::rowmap::core::FromValue for #ident {
            const KIND: ::rowmap::core::TargetKind = ::rowmap::core::TargetKind::Enum(#name_lit);

            fn from_value(
                value: ::rowmap::core::Value,
                _options: &::rowmap::core::MapOptions,
            ) -> ::rowmap::core::Result<Self> {
                let n = ::rowmap::core::shape::enum_discriminant::<Self>(&value)?;
                Self::__rowmap_from_discriminant(n)
            }

            fn convert(
                value: ::rowmap::core::Value,
                options: &::rowmap::core::MapOptions,
            ) -> ::rowmap::core::Result<Self> {
                let n = <i64 as ::rowmap::core::FromValue>::convert(value, options)?;
                Self::__rowmap_from_discriminant(n)
            }

            fn zero() -> Self {
                #ident::#first
            }
        }

        #[automatically_derived]
        impl ::rowmap::core::FromRow for #ident {
            const SHAPE: ::rowmap::core::Shape = ::rowmap::core::Shape::Simple;

            fn from_row<R: ::rowmap::core::Row + ?Sized>(
                row: &R,
                _mapping: &::rowmap::core::SchemaMapping,
                options: &::rowmap::core::MapOptions,
            ) -> ::rowmap::core::Result<Self> {
                ::rowmap::core::materialize::simple(row, options)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_discriminant_checks() {
        let tokens = expand(syn::parse_quote! {
            enum Status { Active = 1, Banned = 7 }
        })
        .unwrap();
        let out = prettyplease::unparse(&syn::parse2(tokens).unwrap());

        assert!(out.contains("n == Status::Active as i64"));
        assert!(out.contains("n == Status::Banned as i64"));
        assert!(out.contains("TargetKind::Enum(\"Status\")"));
        assert!(out.contains("fn zero() -> Self"));
    }

    #[test]
    fn test_rejects_data_variants_and_empty_enums() {
        assert!(expand(syn::parse_quote! { enum Shape { Circle(f64) } }).is_err());
        assert!(expand(syn::parse_quote! { enum Never {} }).is_err());
        assert!(expand(syn::parse_quote! { struct NotAnEnum; }).is_err());
    }
}
