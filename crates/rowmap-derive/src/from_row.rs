use darling::FromDeriveInput;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::DeriveInput;

use crate::opts::{FieldOpts, RowOpts};
use crate::util::{is_option, lit};

pub fn expand(input: DeriveInput) -> Result<proc_macro2::TokenStream, darling::Error> {
    let opts = RowOpts::from_derive_input(&input)?;

    // guard: no generics
    if !opts.generics.params.is_empty() {
        return Err(darling::Error::unsupported_shape("generic type parameters are not supported"));
    }

    let fields = match &opts.data {
        darling::ast::Data::Struct(s) => s,
        _ => return Err(darling::Error::unsupported_shape("only structs can derive FromRow")),
    };

    match fields.style {
        darling::ast::Style::Tuple => expand_tuple(&opts.ident, &fields.fields),
        _ => expand_named(&opts, &fields.fields),
    }
}

fn expand_named(opts: &RowOpts, fields: &[FieldOpts]) -> Result<proc_macro2::TokenStream, darling::Error> {
    let ident = &opts.ident;
    let mut errors = darling::Error::accumulator();

    let mut accessors = Vec::new();
    let mut inits = Vec::new();

    for f in fields {
        let Some(fid) = f.ident.as_ref() else {
            continue;
        };
        if f.skip {
            if f.flatten || f.rename.is_some() {
                errors.push(
                    darling::Error::custom("`skip` cannot be combined with `rename` or `flatten`")
                        .with_span(fid),
                );
            }
            continue;
        }

        let ty = &f.ty;
        if f.flatten {
            if f.rename.is_some() {
                errors.push(darling::Error::custom("`flatten` cannot be combined with `rename`").with_span(fid));
                continue;
            }
            if is_option(ty) {
                errors.push(darling::Error::custom("`flatten` requires a non-optional struct field").with_span(fid));
                continue;
            }
            let access = format_ident!("__rowmap_access_{}", fid);
            accessors.push(quote! {
                fn #access(outer: &mut #ident) -> &mut #ty {
                    &mut outer.#fid
                }
            });
            inits.push(quote! {
                if let ::std::option::Option::Some(inner) = <#ty as ::rowmap::core::FromRow>::model() {
                    fields.extend(inner.fields.iter().map(|f| f.lift(#access)));
                }
            });
            continue;
        }

        let name = fid.unraw().to_string();
        let column = match (&f.rename, opts.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply(&name),
            (None, None) => name.clone(),
        };
        let name_lit = lit(&name);
        let column_lit = lit(&column);

        inits.push(quote! {
            fields.push(::rowmap::core::FieldModel::new::<#ty>(
                #name_lit,
                #column_lit,
                |target: &mut #ident, value: #ty| target.#fid = value,
            ));
        });
    }
    errors.finish()?;

    Ok(quote! {
        #[automatically_derived]
        impl ::rowmap::core::FromRow for #ident {
            const SHAPE: ::rowmap::core::Shape = ::rowmap::core::Shape::Composite;

            fn model() -> ::std::option::Option<&'static ::rowmap::core::RowModel<Self>> {
                #( #accessors )*

                static MODEL: ::std::sync::OnceLock<::rowmap::core::RowModel<#ident>> =
                    ::std::sync::OnceLock::new();
                ::std::option::Option::Some(MODEL.get_or_init(|| {
                    let mut fields: ::std::vec::Vec<::rowmap::core::FieldModel<#ident>> =
                        ::std::vec::Vec::new();
                    #( #inits )*
                    ::rowmap::core::RowModel::new(stringify!(#ident), fields)
                }))
            }

            fn from_row<R: ::rowmap::core::Row + ?Sized>(
                row: &R,
                mapping: &::rowmap::core::SchemaMapping,
                options: &::rowmap::core::MapOptions,
            ) -> ::rowmap::core::Result<Self> {
                ::rowmap::core::materialize::composite(row, mapping, options)
            }
        }
    })
}

fn expand_tuple(ident: &syn::Ident, fields: &[FieldOpts]) -> Result<proc_macro2::TokenStream, darling::Error> {
    let mut errors = darling::Error::accumulator();
    for f in fields {
        if f.skip || f.flatten || f.rename.is_some() {
            errors.push(
                darling::Error::custom("tuple structs map columns by position and take no field attributes")
                    .with_span(&f.ty),
            );
        }
    }
    errors.finish()?;

    let reads = fields.iter().enumerate().map(|(i, f)| {
        let ty = &f.ty;
        quote! { ::rowmap::core::materialize::tuple_field::<#ty, R>(row, #i, options)? }
    });

    Ok(quote! {
        #[automatically_derived]
        impl ::rowmap::core::FromRow for #ident {
            const SHAPE: ::rowmap::core::Shape = ::rowmap::core::Shape::Tuple;

            fn from_row<R: ::rowmap::core::Row + ?Sized>(
                row: &R,
                _mapping: &::rowmap::core::SchemaMapping,
                options: &::rowmap::core::MapOptions,
            ) -> ::rowmap::core::Result<Self> {
                ::std::result::Result::Ok(Self( #( #reads ),* ))
            }
        }
    })
}
