use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    match packed_data_derive_impl(parse_macro_input!(input as DeriveInput)) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn packed_data_derive_impl(parsed: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &parsed.ident;

    let (reader, writer) = match &parsed.data {
        Data::Struct(data) => {
            let Fields::Named(fields) = &data.fields else {
                return Err(syn::Error::new_spanned(
                    &parsed,
                    "only structs with named fields are supported",
                ));
            };

            let field_names = fields.named.iter().map(|field| &field.ident);
            let field_types = fields.named.iter().map(|field| &field.ty);
            let writer_names = fields.named.iter().map(|field| &field.ident);

            (
                quote! {
                    Ok(Self {
                        #(#field_names: <#field_types as ::golf_utils::packed::PackedData>::read_packed(r)?,)*
                    })
                },
                quote! {
                    #(::golf_utils::packed::PackedData::write_packed(&self.#writer_names, w)?;)*
                    Ok(())
                },
            )
        }
        Data::Enum(_) => {
            let parse_as = parsed
                .attrs
                .iter()
                .find(|attribute| attribute.path.is_ident("parse_as"))
                .ok_or_else(|| {
                    syn::Error::new_spanned(&parsed, "enums require a #[parse_as(T)] attribute")
                })?;
            let parse_type: Type = parse_as.parse_args()?;

            (
                quote! {
                    Ok(<#parse_type as ::golf_utils::packed::PackedData>::read_packed(r)?.try_into()?)
                },
                quote! {
                    ::golf_utils::packed::PackedData::write_packed(
                        &<#parse_type>::from(self.clone()),
                        w,
                    )?;
                    Ok(())
                },
            )
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &parsed,
                "expected a struct or an enum",
            ))
        }
    };

    Ok(quote! {
        impl ::golf_utils::packed::PackedData for #name {
            fn read_packed<R: ::std::io::Read>(
                r: &mut R,
            ) -> ::golf_utils::AnyResult<Self> {
                #reader
            }

            fn write_packed<W: ::std::io::Write>(
                &self,
                w: &mut W,
            ) -> ::golf_utils::AnyResult {
                #writer
            }
        }
    })
}
