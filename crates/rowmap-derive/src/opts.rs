use darling::{ast, FromDeriveInput, FromField, FromVariant};

use crate::util::RenameRule;

#[derive(Debug, FromField)]
#[darling(attributes(rowmap))]
pub struct FieldOpts {
    pub ident: Option<syn::Ident>,
    pub ty: syn::Type,

    /// Never populated from a column.
    #[darling(default)]
    pub skip: bool,

    #[darling(default)]
    pub rename: Option<String>,

    /// Embed the fields of another `FromRow` struct.
    #[darling(default)]
    pub flatten: bool,
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(rowmap), supports(struct_named, struct_tuple))]
pub struct RowOpts {
    pub ident: syn::Ident,
    pub generics: syn::Generics,

    #[darling(default)]
    pub rename_all: Option<RenameRule>,

    pub data: ast::Data<darling::util::Ignored, FieldOpts>,
}

#[derive(Debug, FromVariant)]
#[darling(attributes(rowmap))]
pub struct VariantOpts {
    pub ident: syn::Ident,
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(rowmap), supports(enum_unit))]
pub struct EnumOpts {
    pub ident: syn::Ident,
    pub generics: syn::Generics,

    pub data: ast::Data<VariantOpts, darling::util::Ignored>,
}
