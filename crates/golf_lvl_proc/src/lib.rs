//! Internal implementation of `golf_lvl` macros. Any relevant macros are re-exported by the main library.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DataStruct, DeriveInput, Ident, LitStr, Type};

/// Implements the [`golf_lvl::node::NodeRead`] and [`golf_lvl::node::NodeWrite`] traits on
/// the type, interpreting its fields as a representation of a hierarchical node tree.
///
/// Every field must be marked with either attribute:
///  * `#[node("NAME")]` - Means that the node structure only expects a single node matching that
///     name. The field type must implement `NodeRead`/`NodeWrite` itself (every `PackedData` does).
///  * `#[nodes("NAME")]` - Means that the node reader will expect a variable amount of nodes
///     matching that name, in order. The field's type must be a `Vec<T>`.
///
/// The implementation currently only accepts non-tuple structs.
///
/// ## Implementation details
/// The writer implementation follows field definition order while outputting the nodes.
///
/// The reader implementation doesn't rely on any particular order of child nodes. Children with
/// names that don't match any field are skipped.
#[proc_macro_derive(NodeData, attributes(node, nodes))]
pub fn node_data_derive(input: TokenStream) -> TokenStream {
    match node_data_derive_impl(parse_macro_input!(input as DeriveInput)) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn node_data_derive_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    // The macro is also used inside golf_lvl itself, where it has to be referred to with
    // the crate keyword
    let golf_lvl = if std::env::var("CARGO_PKG_NAME").as_deref() == Ok("golf_lvl") {
        quote!(crate)
    } else {
        quote!(::golf_lvl)
    };

    let name = &input.ident;
    let fields = extract_field_metadata(match &input.data {
        syn::Data::Struct(s) => s,
        _ => return Err(syn::Error::new_spanned(&input, "expected struct")),
    })?;

    let read_impl = {
        // Glossary of the generated names:
        //  - _R        - name of the generic Read + Seek parameter
        //  - _r        - the reader &mut _R instance
        //  - _header   - the NodeHeader instance
        //  - _children - Vec<NodeHeader> of the passed node _header
        //  - _child    - each iterated child of _children
        //
        // Every field gets a local variable (Option<T> for single fields, the Vec<T> itself for
        // multiple ones), filled while iterating over the children, and then moved into Self.

        let variables = fields.iter().map(|field| match field {
            NodeField::Single {
                field_name,
                field_type,
                ..
            } => quote! {
                // Option<T> catches both missing nodes and nodes present more than once
                let mut #field_name: Option<#field_type> = None;
            },
            NodeField::Multiple {
                field_name,
                field_type,
                ..
            } => quote! {
                let mut #field_name: #field_type = Vec::new();
            },
        });

        let conditionals = fields.iter().map(|field| match field {
            NodeField::Single {
                node_name,
                field_name,
                ..
            } => quote! {
                if _child.name.as_ref() == #node_name.as_bytes() {
                    ::anyhow::ensure!(
                        #field_name.is_none(),
                        concat!("node ", #node_name, " duplicated")
                    );

                    #field_name = Some(
                        #golf_lvl::node::NodeRead::read_node_at(_r, _child)?
                    );
                }
            },
            NodeField::Multiple {
                node_name,
                field_name,
                ..
            } => quote! {
                if _child.name.as_ref() == #node_name.as_bytes() {
                    #field_name.push(
                        #golf_lvl::node::NodeRead::read_node_at(_r, _child)?
                    );
                }
            },
        });

        let return_expressions = fields.iter().map(|field| match field {
            NodeField::Single {
                field_name,
                node_name,
                ..
            } => quote! {
                #field_name: #field_name.ok_or_else(|| {
                    ::anyhow::Error::from(#golf_lvl::FormatError::MissingNode(#node_name))
                })?,
            },
            NodeField::Multiple { field_name, .. } => quote! {
                #field_name,
            },
        });

        quote! {
            #(#variables)*

            let _children = #golf_lvl::node::read_node_children(_r, _header)?;

            for _child in _children {
                #(#conditionals)*
            }

            Ok(Self {
                #(#return_expressions)*
            })
        }
    };

    let write_impl = {
        let field_writers = fields.iter().map(|field| match field {
            NodeField::Single {
                node_name,
                field_name,
                ..
            } => quote! {
                _writer.write_node(
                    #golf_lvl::node::NodeName::from_str(#node_name),
                    &self.#field_name,
                )?;
            },
            NodeField::Multiple {
                node_name,
                field_name,
                ..
            } => quote! {
                for field in self.#field_name.iter() {
                    _writer.write_node(
                        #golf_lvl::node::NodeName::from_str(#node_name),
                        field,
                    )?;
                }
            },
        });

        quote! {
            #(#field_writers)*
            Ok(())
        }
    };

    Ok(quote! {
        impl #golf_lvl::node::NodeRead for #name {
            fn read_node_payload<_R: ::std::io::Read + ::std::io::Seek>(
                _r: &mut _R,
                _header: #golf_lvl::node::NodeHeader,
            ) -> ::golf_utils::AnyResult<Self> {
                #read_impl
            }
        }

        impl #golf_lvl::node::NodeWrite for #name {
            fn write_node<_W: ::std::io::Write + ::std::io::Seek>(
                &self,
                _writer: &mut #golf_lvl::node::NodeWriter<'_, _W>,
            ) -> ::golf_utils::AnyResult {
                #write_impl
            }
        }
    })
}

enum NodeField {
    /// Created via a `#[node("NAME")]` attribute
    Single {
        node_name: String,
        field_name: Ident,
        field_type: Type,
    },
    /// Created via a `#[nodes("NAME")]` attribute
    Multiple {
        node_name: String,
        field_name: Ident,
        field_type: Type,
    },
}

/// Goes through every field of the structure, collecting info about each field.
///
/// ## Errors
/// Returns an error if:
///  * the struct is a tuple struct
///  * any field is unattributed
///  * any field has duplicate node/nodes attributes
///  * any node name isn't exactly 4 bytes long
fn extract_field_metadata(st: &DataStruct) -> syn::Result<Vec<NodeField>> {
    let mut result = Vec::with_capacity(st.fields.len());

    for field in &st.fields {
        let field_error = |msg| Err(syn::Error::new_spanned(field, msg));

        let Some(field_ident) = &field.ident else {
            return field_error("tuple structs are not supported");
        };

        let mut result_field = None;

        for attribute in &field.attrs {
            let is_single = attribute.path.is_ident("node");
            let is_multiple = attribute.path.is_ident("nodes");
            if !is_single && !is_multiple {
                continue;
            }

            if result_field.is_some() {
                return field_error("duplicate node attribute");
            }

            let node_name_lit = attribute.parse_args::<LitStr>()?;
            let node_name = node_name_lit.value();
            if node_name.len() != 4 {
                return Err(syn::Error::new_spanned(
                    node_name_lit,
                    "node names must be 4 bytes long",
                ));
            }

            let field_name = field_ident.clone();
            let field_type = field.ty.clone();

            result_field = Some(if is_single {
                NodeField::Single {
                    node_name,
                    field_name,
                    field_type,
                }
            } else {
                NodeField::Multiple {
                    node_name,
                    field_name,
                    field_type,
                }
            });
        }

        match result_field {
            Some(result_field) => result.push(result_field),
            None => return field_error("unattributed field"),
        }
    }

    Ok(result)
}
