use proc_macro::{Span, TokenStream};
use darling::ast::NestedMeta;
use darling::FromMeta;
use quote::quote;
use syn::{ItemFn, parse_macro_input};


#[derive(Debug, FromMeta)]
enum TestArgsArg {
    Postgres(i32),
}

impl TestArgsArg {
    fn get_mod_part_name(&self) -> String {
        match self {
            TestArgsArg::Postgres(v) => format!("postgres_{}", v),
        }
    }

    /// Every supported version runs on its own port, `54xx` where `xx` is the major version.
    fn get_port(&self) -> Result<u16, darling::Error> {
        match self {
            TestArgsArg::Postgres(v @ 12..=17) => Ok(5400 + *v as u16),
            _ => Err(darling::Error::custom("Unknown postgres version, expected 12 through 17"))
        }
    }
}

#[derive(Debug, FromMeta)]
struct TestArgs {
    #[darling(multiple, rename = "arg")]
    args: Vec<TestArgsArg>,
}

impl TestArgs {
    fn get_module_name(&self) -> String {
        self.args
            .iter()
            .map(|a| a.get_mod_part_name())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Runs the annotated function against one freshly created database per `arg(postgres = N)`.
///
/// The databases are dropped again when the test succeeds. `test_helpers` must be in scope
/// at the call site, either `crate::test_helpers` or `chado_tools::test_helpers`.
#[proc_macro_attribute]
pub fn pg_test(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let function_name = &input.sig.ident;

    let attr_args = match NestedMeta::parse_meta_list(args.into()) {
        Ok(v) => v,
        Err(e) => { return TokenStream::from(darling::Error::from(e).write_errors()); }
    };

    let args = match TestArgs::from_list(&attr_args) {
        Ok(v) => v,
        Err(e) => { return TokenStream::from(e.write_errors()); }
    };

    if args.args.is_empty() {
        return TokenStream::from(darling::Error::custom("At least one postgres version must be specified").write_errors());
    }

    if input.sig.inputs.len() != args.args.len() {
        return TokenStream::from(darling::Error::custom(format!("Function is declared to have {} args, however attribute defines {} args", input.sig.inputs.len(), args.args.len())).write_errors());
    }

    let module_name = syn::Ident::new(&args.get_module_name(), Span::call_site().into());

    let mut test_helpers_create = Vec::with_capacity(args.args.len());
    let mut test_helpers_stop = Vec::with_capacity(args.args.len());
    let mut arg_idents = Vec::with_capacity(args.args.len());

    for (arg, input) in args.args.iter().zip(input.sig.inputs.iter()) {
        let port = match arg.get_port() {
            Ok(p) => p,
            Err(e) => { return TokenStream::from(e.write_errors()); }
        };

        let arg_ident = match &input {
            syn::FnArg::Typed(t) => match &*t.pat {
                syn::Pat::Ident(i) => &i.ident,
                _ => { return TokenStream::from(darling::Error::custom("Only simple identifiers are supported as function arguments").write_errors()); }
            },
            _ => { return TokenStream::from(darling::Error::custom("Only simple identifiers are supported as function arguments").write_errors()); }
        };
        arg_idents.push(arg_ident.clone());

        let arg_name = arg_ident.to_string();

        test_helpers_create.push(quote! {
            let #arg_ident = test_helpers::get_test_helper_on_port(#arg_name, #port).await;
        });
        test_helpers_stop.push(quote! {
            #arg_ident.stop().await;
        });
    }
    test_helpers_stop.reverse();

    let actual_test_function_name = quote::format_ident!("{module_name}_{function_name}");

    let invoke_actual_function = if input.sig.asyncness.is_some() {
        quote! {
            #function_name(
                #(&#arg_idents),*
            ).await;
        }
    } else {
        quote! {
            #function_name(
                #(&#arg_idents),*
            );
        }
    };

    let test_function = quote! {

            #input

            #[tokio::test]
            async fn #actual_test_function_name() {
                #(#test_helpers_create)*

                #invoke_actual_function

                #(#test_helpers_stop)*
            }
        };

    TokenStream::from(test_function)
}
