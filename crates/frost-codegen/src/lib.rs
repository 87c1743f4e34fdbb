// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DataEnum, DataStruct, DeriveInput, Fields,
    GenericArgument, LitInt, LitStr, PathArguments, Type,
};

/// Struct or enum level `#[frost(...)]` options.
#[derive(Default)]
struct TypeAttrs {
    name: Option<String>,
    parent: Option<String>,
    is_abstract: bool,
    freezable: bool,
    version: Option<u32>,
}

/// Field level `#[frost(...)]` options.
#[derive(Default)]
struct FieldAttrs {
    ty: Option<String>,
    transient: bool,
    immutable: bool,
    skip_text: bool,
    skip: bool,
}

/// `#[derive(Described)]`: implements `frost::Described` for a struct with
/// named fields or a fieldless enum.
///
/// Rust field types map onto declared types:
/// - `bool`, `i8`, `u16`, `i16`, `i32`, `f32`, `i64`, `f64` to the scalar
///   kinds
/// - `u8` is rejected: `byte` is signed. Use `i8`, or opt in to the
///   reinterpretation with `#[frost(ty = "byte")]`
/// - `String` and `&str` to `str`
/// - `Vec<T>`, `[T; N]` and `Box<[T]>` to arrays of `T`
/// - `Option<T>` and `Box<T>` to `T`
/// - any other path to the named type of its last segment
///
/// Example:
/// ```ignore
/// #[derive(Described)]
/// #[frost(name = "geo.Point", parent = "Iced", version = 2)]
/// struct Point {
///     pub x: i32,
///     pub y: i32,
///     #[frost(ty = "geo.Unit")]
///     unit: Unit,
///     #[frost(transient)]
///     cache: i64,
/// }
/// ```
#[proc_macro_derive(Described, attributes(frost))]
pub fn derive_described(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let attrs = type_attrs(&input.attrs)?;
    let type_name = attrs.name.clone().unwrap_or_else(|| input.ident.to_string());

    let body = match &input.data {
        Data::Struct(data) => describe_struct(&type_name, &attrs, data, input)?,
        Data::Enum(data) => describe_enum(&type_name, &attrs, data, input)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(input, "Unions cannot be described"));
        }
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::frost::Described for #ident #ty_generics #where_clause {
            fn type_def() -> ::frost::TypeDef {
                #body
            }
        }
    })
}

fn describe_struct(
    type_name: &str,
    attrs: &TypeAttrs,
    data: &DataStruct,
    input: &DeriveInput,
) -> syn::Result<TokenStream2> {
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(input, "Only structs with named fields are supported"));
    };

    let mut builder = quote! { ::frost::TypeDefBuilder::new(#type_name) };
    if let Some(parent) = &attrs.parent {
        builder = quote! { #builder.extends(#parent) };
    }
    if attrs.is_abstract {
        builder = quote! { #builder.abstract_() };
    }
    if attrs.freezable {
        builder = quote! { #builder.freezable() };
    }
    if let Some(version) = attrs.version {
        builder = quote! { #builder.version(#version) };
    }

    for field in &named.named {
        let fattrs = field_attrs(&field.attrs)?;
        if fattrs.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let name = ident.to_string();
        let ty = match &fattrs.ty {
            Some(text) => declared_type_tokens(text),
            None => rust_type_tokens(&field.ty).ok_or_else(|| unsupported_field_type(&field.ty))?,
        };
        let visibility = match &field.vis {
            syn::Visibility::Public(_) => quote! { ::frost::Visibility::Public },
            syn::Visibility::Restricted(_) => quote! { ::frost::Visibility::Package },
            syn::Visibility::Inherited => quote! { ::frost::Visibility::Private },
        };

        let mut def = quote! { ::frost::FieldDef::new(#name, #ty).visibility(#visibility) };
        if fattrs.immutable {
            def = quote! { #def.final_() };
        }
        if fattrs.transient {
            def = quote! { #def.transient() };
        }
        if fattrs.skip_text {
            def = quote! { #def.hidden_from_text() };
        }
        builder = quote! { #builder.field_def(#def) };
    }

    Ok(quote! { #builder.build() })
}

fn describe_enum(
    type_name: &str,
    attrs: &TypeAttrs,
    data: &DataEnum,
    input: &DeriveInput,
) -> syn::Result<TokenStream2> {
    if attrs.parent.is_some() || attrs.is_abstract || attrs.freezable {
        return Err(syn::Error::new_spanned(
            input,
            "Enums take no parent, abstract or freezable option",
        ));
    }
    let mut constants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(variant, "Only fieldless variants are supported"));
        }
        constants.push(variant.ident.to_string());
    }
    Ok(quote! {
        ::frost::TypeDef::enumeration(#type_name, [#(#constants),*])
    })
}

fn type_attrs(attrs: &[Attribute]) -> syn::Result<TypeAttrs> {
    let mut out = TypeAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("frost")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("parent") {
                out.parent = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("abstract") {
                out.is_abstract = true;
            } else if meta.path.is_ident("freezable") {
                out.freezable = true;
            } else if meta.path.is_ident("version") {
                out.version = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else {
                return Err(meta.error("expected one of: name, parent, abstract, freezable, version"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("frost")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ty") {
                out.ty = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("transient") {
                out.transient = true;
            } else if meta.path.is_ident("immutable") {
                out.immutable = true;
            } else if meta.path.is_ident("skip_text") {
                out.skip_text = true;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else {
                return Err(meta.error("expected one of: ty, transient, immutable, skip_text, skip"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Tokens for a declared type written as text (`"[int]"`, `"geo.Point"`).
fn declared_type_tokens(text: &str) -> TokenStream2 {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let inner = declared_type_tokens(inner);
        return quote! { ::frost::TypeRef::array_of(#inner) };
    }
    if let Some(kind) = scalar_tokens(text) {
        return quote! { ::frost::TypeRef::Scalar(#kind) };
    }
    match text {
        "str" | "String" => quote! { ::frost::TypeRef::Str },
        _ => quote! { ::frost::TypeRef::named(#text) },
    }
}

fn scalar_tokens(name: &str) -> Option<TokenStream2> {
    let kind = match name {
        "bool" | "boolean" => quote! { Boolean },
        "i8" | "byte" => quote! { Byte },
        "u16" | "char" => quote! { Char },
        "i16" | "short" => quote! { Short },
        "i32" | "int" => quote! { Int },
        "f32" | "float" => quote! { Float },
        "i64" | "long" => quote! { Long },
        "f64" | "double" => quote! { Double },
        _ => return None,
    };
    Some(quote! { ::frost::ScalarKind::#kind })
}

/// Tokens for the declared type of a Rust field type.
fn rust_type_tokens(ty: &Type) -> Option<TokenStream2> {
    match ty {
        Type::Array(array) => {
            let inner = rust_type_tokens(&array.elem)?;
            Some(quote! { ::frost::TypeRef::array_of(#inner) })
        }
        Type::Slice(slice) => {
            let inner = rust_type_tokens(&slice.elem)?;
            Some(quote! { ::frost::TypeRef::array_of(#inner) })
        }
        Type::Reference(reference) => match &*reference.elem {
            Type::Path(p) if p.path.is_ident("str") => Some(quote! { ::frost::TypeRef::Str }),
            other => rust_type_tokens(other),
        },
        Type::Group(group) => rust_type_tokens(&group.elem),
        Type::Paren(paren) => rust_type_tokens(&paren.elem),
        Type::Path(type_path) => {
            let segment = type_path.path.segments.last()?;
            let ident = segment.ident.to_string();
            if let Some(kind) = scalar_tokens(&ident).filter(|_| segment.arguments.is_empty()) {
                return Some(quote! { ::frost::TypeRef::Scalar(#kind) });
            }
            match ident.as_str() {
                "String" | "str" => Some(quote! { ::frost::TypeRef::Str }),
                "u8" => None,
                "Vec" => {
                    let inner = rust_type_tokens(generic_arg(&segment.arguments)?)?;
                    Some(quote! { ::frost::TypeRef::array_of(#inner) })
                }
                "Option" | "Box" | "Arc" | "Rc" => rust_type_tokens(generic_arg(&segment.arguments)?),
                _ if segment.arguments.is_empty() => Some(quote! { ::frost::TypeRef::named(#ident) }),
                _ => None,
            }
        }
        _ => None,
    }
}

fn unsupported_field_type(ty: &Type) -> syn::Error {
    if mentions_u8(quote! { #ty }) {
        return syn::Error::new_spanned(
            ty,
            "u8 has no scalar kind (byte is signed); use i8 or #[frost(ty = \"byte\")]",
        );
    }
    syn::Error::new_spanned(
        ty,
        "Unsupported field type; name it with #[frost(ty = \"...\")] or skip it with #[frost(skip)]",
    )
}

fn mentions_u8(tokens: TokenStream2) -> bool {
    tokens.into_iter().any(|tt| match tt {
        proc_macro2::TokenTree::Ident(ident) => ident == "u8",
        proc_macro2::TokenTree::Group(group) => mentions_u8(group.stream()),
        _ => false,
    })
}

/// The single type argument of `Vec<T>`, `Option<T>` and the like.
fn generic_arg(args: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = args else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(ty) if args.args.len() == 1 => Some(ty),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_signed_scalars_map() {
        let ty: Type = parse_quote!(Vec<i8>);
        let tokens = rust_type_tokens(&ty).unwrap().to_string();
        assert!(tokens.contains("array_of"));
        assert!(tokens.contains("Byte"));
    }

    #[test]
    fn test_u8_is_rejected() {
        let types: [Type; 3] = [parse_quote!(u8), parse_quote!(Vec<u8>), parse_quote!([u8; 4])];
        for ty in &types {
            assert!(rust_type_tokens(ty).is_none());
            assert!(unsupported_field_type(ty).to_string().contains("byte is signed"));
        }
    }

    #[test]
    fn test_explicit_byte_declaration() {
        let tokens = declared_type_tokens("[byte]").to_string();
        assert!(tokens.contains("array_of"));
        assert!(tokens.contains("Byte"));
    }
}
