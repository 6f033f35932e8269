use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Item};

/// Procedural macro to automatically register ops in the catalog.
///
/// Usage:
/// ```ignore
/// #[register_op]
/// #[derive(Default)]
/// pub struct MyOp {}
/// ```
///
/// Registration happens at link time via `inventory`; the agent picks the
/// op up when it builds its registry from the catalog.
#[proc_macro_attribute]
pub fn register_op(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as Item);

    let (struct_item, name) = match &input {
        Item::Struct(item_struct) => (input.clone(), item_struct.ident.clone()),
        _ => panic!("register_op can only be used on structs"),
    };

    let expanded = quote! {
        #struct_item

        ::inventory::submit! {
            #[allow(clippy::redundant_closure)]
            crate::OpConstructor::new(|| {
                ::std::sync::Arc::new(#name::default()) as ::std::sync::Arc<dyn ::opswarm::op::OpLogic>
            })
        }
    };

    TokenStream::from(expanded)
}
