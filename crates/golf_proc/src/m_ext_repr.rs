use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, Ident, ItemEnum, Type};

pub fn ext_repr(input: TokenStream, source_item: TokenStream) -> TokenStream {
    let source_item_ts2 = TokenStream2::from(source_item.clone());
    let item = parse_macro_input!(source_item as ItemEnum);
    let enum_name = item.ident;
    let target_type = parse_macro_input!(input as Type);

    // Every variant gets a constant holding its discriminant, so that match arms can compare
    // against it regardless of how the discriminant was written.
    let value_consts = item
        .variants
        .iter()
        .map(|variant| {
            let const_name = Ident::new(
                &format!("{}_VALUE", variant.ident.to_string().to_uppercase()),
                Span::call_site(),
            );
            (const_name, &variant.ident)
        })
        .collect::<Vec<_>>();

    let try_from_t = {
        let const_decls = value_consts.iter().map(|(const_name, variant)| {
            quote! {
                const #const_name: #target_type = #enum_name::#variant as #target_type;
            }
        });

        let match_arms = value_consts.iter().map(|(const_name, variant)| {
            quote! {
                #const_name => Ok(#enum_name::#variant),
            }
        });

        quote! {
            impl TryFrom<#target_type> for #enum_name {
                type Error = ::golf_utils::EnumParseError;
                fn try_from(value: #target_type) -> Result<Self, ::golf_utils::EnumParseError> {
                    #(#const_decls)*
                    match value {
                        #(#match_arms)*
                        _ => Err(::golf_utils::EnumParseError {
                            type_name: stringify!(#enum_name),
                            value: value as u64,
                        }),
                    }
                }
            }
        }
    };

    let from_self = quote! {
        impl From<#enum_name> for #target_type {
            fn from(value: #enum_name) -> #target_type {
                value as #target_type
            }
        }
    };

    let try_from_str = {
        let conditionals = item.variants.iter().map(|variant| {
            let ident = &variant.ident;
            quote! {
                if value == stringify!(#ident) {
                    return Ok(Self::#ident);
                }
            }
        });

        quote! {
            impl<'a> TryFrom<&'a str> for #enum_name {
                type Error = ::golf_utils::EnumParseError;
                fn try_from(value: &'a str) -> Result<Self, ::golf_utils::EnumParseError> {
                    #(#conditionals)*
                    Err(::golf_utils::EnumParseError {
                        type_name: stringify!(#enum_name),
                        value: u64::MAX,
                    })
                }
            }
        }
    };

    let name_impls = {
        let match_arms = item.variants.iter().map(|variant| {
            let ident = &variant.ident;
            quote! {
                #enum_name::#ident => stringify!(#ident),
            }
        });

        quote! {
            impl From<#enum_name> for &'static str {
                fn from(value: #enum_name) -> &'static str {
                    match value {
                        #(#match_arms)*
                    }
                }
            }

            impl ::std::fmt::Display for #enum_name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    let name: &'static str = self.clone().into();
                    f.write_str(name)
                }
            }
        }
    };

    quote! {
        #[repr(#target_type)]
        #source_item_ts2

        #try_from_t
        #from_self

        #try_from_str
        #name_impls
    }
    .into()
}
