//! `#[derive(Classify)]`: build-time generation of type descriptors.
//!
//! Structs with named fields classify as objects; enums whose variants all
//! carry no data classify as simple enum scalars. Field behavior is tuned
//! with `#[classify(...)]` attributes:
//!
//! - `ignore` — excluded from both read and write
//! - `parent` — receives the enclosing parent handle on read, skipped on write
//! - `mandatory` — absence on read is an error when enforcement is enabled
//! - `ignore_if_default` — omitted on write when equal to the type's default
//! - `ignore_if_empty` — omitted on write when the collection is empty
//! - `ignore_if = expr` — omitted on write when equal to the expression
//! - `rename = "name"` — overrides the wire name
//!
//! Container attributes: `no_default` (the type deliberately has no
//! parameterless constructor; deserialization fails at runtime) and
//! `processor` (the type implements the `Processor` hooks).

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Expr, Fields, LitStr, parse_macro_input, parse_quote};

#[derive(Default)]
struct ContainerAttrs {
    no_default: bool,
    processor: bool,
}

#[derive(Default)]
struct FieldAttrs {
    ignore: bool,
    parent: bool,
    mandatory: bool,
    ignore_if_default: bool,
    ignore_if_empty: bool,
    ignore_if: Option<Expr>,
    rename: Option<String>,
}

/// Generate a `Classify` implementation for a struct or unit-only enum.
#[proc_macro_derive(Classify, attributes(classify))]
pub fn derive_classify(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let container = parse_container_attrs(&input.attrs)?;
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => expand_struct(&input, &container, fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Classify can only be derived for structs with named fields",
            )),
        },
        Data::Enum(data) => expand_enum(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Classify cannot be derived for unions",
        )),
    }
}

fn parse_container_attrs(attrs: &[syn::Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("classify") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("no_default") {
                out.no_default = true;
                Ok(())
            } else if meta.path.is_ident("processor") {
                out.processor = true;
                Ok(())
            } else {
                Err(meta.error("unrecognized classify container attribute"))
            }
        })?;
    }
    Ok(out)
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("classify") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                out.ignore = true;
            } else if meta.path.is_ident("parent") {
                out.parent = true;
            } else if meta.path.is_ident("mandatory") {
                out.mandatory = true;
            } else if meta.path.is_ident("ignore_if_default") {
                out.ignore_if_default = true;
            } else if meta.path.is_ident("ignore_if_empty") {
                out.ignore_if_empty = true;
            } else if meta.path.is_ident("ignore_if") {
                out.ignore_if = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit.value());
            } else {
                return Err(meta.error("unrecognized classify field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// The stable wire name: the source name with the leading private-storage
/// markers stripped, unless renamed.
fn wire_name(ident: &syn::Ident, attrs: &FieldAttrs) -> String {
    match &attrs.rename {
        Some(name) => name.clone(),
        None => ident.to_string().trim_start_matches('_').to_owned(),
    }
}

fn expand_struct(
    input: &DeriveInput,
    container: &ContainerAttrs,
    fields: &syn::FieldsNamed,
) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let declaring = ident.to_string();

    let mut field_entries = Vec::new();
    for field in &fields.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.ignore {
            continue;
        }
        let fident = field.ident.as_ref().expect("named field");
        let fty = &field.ty;
        let name = wire_name(fident, &attrs);

        if attrs.parent {
            field_entries.push(quote! {
                ::classify::Field {
                    name: #name,
                    declaring: #declaring,
                    flags: ::classify::FieldFlags {
                        mandatory: false,
                        parent: true,
                        ignore_if_default: false,
                        ignore_if_empty: false,
                    },
                    descriptor: ::core::option::Option::None,
                    get: ::core::option::Option::None,
                    set: ::core::option::Option::None,
                    assign_parent: ::core::option::Option::Some(|instance, handle| {
                        match <#fty as ::classify::FromParentHandle>::from_parent_handle(handle) {
                            ::core::option::Option::Some(value) => {
                                ::classify::cast::cast_mut::<Self>(instance).#fident = value;
                                true
                            }
                            ::core::option::Option::None => false,
                        }
                    }),
                    is_default: ::core::option::Option::None,
                    is_empty: ::core::option::Option::None,
                    skip_if: ::core::option::Option::None,
                }
            });
            continue;
        }

        let mandatory = attrs.mandatory;
        let ignore_if_default = attrs.ignore_if_default;
        let ignore_if_empty = attrs.ignore_if_empty;

        let is_default = if ignore_if_default {
            quote! {
                ::core::option::Option::Some(|member: &dyn ::core::any::Any| {
                    *::classify::cast::cast_ref::<#fty>(member)
                        == <#fty as ::core::default::Default>::default()
                })
            }
        } else {
            quote!(::core::option::Option::None)
        };
        let is_empty = if ignore_if_empty {
            quote! {
                ::core::option::Option::Some(|member: &dyn ::core::any::Any| {
                    ::classify::cast::cast_ref::<#fty>(member).is_empty()
                })
            }
        } else {
            quote!(::core::option::Option::None)
        };
        let skip_if = match &attrs.ignore_if {
            Some(expr) => quote! {
                ::core::option::Option::Some(|member: &dyn ::core::any::Any| {
                    *::classify::cast::cast_ref::<#fty>(member) == (#expr)
                })
            },
            None => quote!(::core::option::Option::None),
        };

        field_entries.push(quote! {
            ::classify::Field {
                name: #name,
                declaring: #declaring,
                flags: ::classify::FieldFlags {
                    mandatory: #mandatory,
                    parent: false,
                    ignore_if_default: #ignore_if_default,
                    ignore_if_empty: #ignore_if_empty,
                },
                descriptor: ::core::option::Option::Some(::classify::descriptor_of::<#fty>),
                get: ::core::option::Option::Some(
                    |object: &dyn ::core::any::Any| -> &dyn ::core::any::Any {
                        &::classify::cast::cast_ref::<Self>(object).#fident
                    },
                ),
                set: ::core::option::Option::Some(|object, value| {
                    ::classify::cast::cast_mut::<Self>(object).#fident =
                        ::classify::cast::take::<#fty>(value);
                }),
                assign_parent: ::core::option::Option::None,
                is_default: #is_default,
                is_empty: #is_empty,
                skip_if: #skip_if,
            }
        });
    }

    let default = if container.no_default {
        quote!(::core::option::Option::None)
    } else {
        quote! {
            ::core::option::Option::Some(|| {
                ::std::boxed::Box::new(<Self as ::core::default::Default>::default())
                    as ::std::boxed::Box<dyn ::core::any::Any>
            })
        }
    };

    let (before_ser, after_ser, before_de, after_de) = if container.processor {
        (
            quote! {
                ::core::option::Option::Some(|object: &dyn ::core::any::Any| {
                    ::classify::Processor::before_serialize(
                        ::classify::cast::cast_ref::<Self>(object),
                    )
                })
            },
            quote! {
                ::core::option::Option::Some(
                    |object: &dyn ::core::any::Any, element: &mut dyn ::core::any::Any| {
                        ::classify::Processor::after_serialize(
                            ::classify::cast::cast_ref::<Self>(object),
                            element,
                        )
                    },
                )
            },
            quote! {
                ::core::option::Option::Some(
                    |object: &mut dyn ::core::any::Any, element: &dyn ::core::any::Any| {
                        ::classify::Processor::before_deserialize(
                            ::classify::cast::cast_mut::<Self>(object),
                            element,
                        )
                    },
                )
            },
            quote! {
                ::core::option::Option::Some(
                    |object: &mut dyn ::core::any::Any, element: &dyn ::core::any::Any| {
                        ::classify::Processor::after_deserialize(
                            ::classify::cast::cast_mut::<Self>(object),
                            element,
                        )
                    },
                )
            },
        )
    } else {
        let none = quote!(::core::option::Option::None);
        (none.clone(), none.clone(), none.clone(), none)
    };

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::classify::Classify));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::classify::Classify for #ident #ty_generics #where_clause {
            fn build_descriptor() -> ::classify::Descriptor {
                ::classify::Descriptor::of::<Self>(::classify::Shape::Object(
                    ::classify::ObjectVt {
                        fields: ::std::vec![#(#field_entries),*],
                        default: #default,
                        before_serialize: #before_ser,
                        after_serialize: #after_ser,
                        before_deserialize: #before_de,
                        after_deserialize: #after_de,
                    },
                ))
            }
        }
    })
}

fn expand_enum(input: &DeriveInput, data: &syn::DataEnum) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Classify cannot be derived for generic enums",
        ));
    }
    let mut names = Vec::new();
    let mut idents = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                "Classify enums must have unit variants only",
            ));
        }
        names.push(variant.ident.to_string());
        idents.push(&variant.ident);
    }
    let label = ident.to_string();

    Ok(quote! {
        #[automatically_derived]
        impl ::classify::Classify for #ident {
            fn build_descriptor() -> ::classify::Descriptor {
                ::classify::Descriptor::of::<Self>(::classify::Shape::Simple(
                    ::classify::SimpleVt {
                        kind: ::classify::SimpleKind::Enum,
                        to_scalar: |value| {
                            ::classify::Scalar::Str(
                                match ::classify::cast::cast_ref::<Self>(value) {
                                    #(Self::#idents => #names,)*
                                }
                                .to_owned(),
                            )
                        },
                        from_scalar: |scalar| {
                            let text = match scalar {
                                ::classify::Scalar::Str(t) => t.as_str(),
                                other => {
                                    return ::core::result::Result::Err(
                                        ::classify::Error::conversion(::std::format!(
                                            "cannot convert {} to enum {}",
                                            other.kind_name(),
                                            #label,
                                        )),
                                    );
                                }
                            };
                            match text {
                                #(#names => ::core::result::Result::Ok(
                                    ::std::boxed::Box::new(Self::#idents)
                                        as ::std::boxed::Box<dyn ::core::any::Any>,
                                ),)*
                                other => ::core::result::Result::Err(
                                    ::classify::Error::conversion(::std::format!(
                                        "`{}` is not a variant of {}",
                                        other,
                                        #label,
                                    )),
                                ),
                            }
                        },
                    },
                ))
            }
        }
    })
}
