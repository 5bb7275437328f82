//! Procedural macros for xbridge operations
//!
//! `#[operation]` and `#[operation_group]` attach metadata to operation
//! structs so the CLI, HTTP router, and MCP tool list are all generated from
//! one definition:
//! - per-operation consts (name, description, HTTP route, CLI pattern)
//! - a cached JSON schema derived from the operation's input type
//! - per-group `register_all` / `register_http_routes` / `register_mcp_tools`

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Ident, ItemMod, ItemStruct, LitStr, Token,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

struct OperationGroupArgs {
    group_name: Ident,
}

impl Parse for OperationGroupArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let group_name: Ident = input.parse()?;
        Ok(OperationGroupArgs { group_name })
    }
}

/// Attribute macro for operation groups
///
/// Usage: #[operation_group(accounts)]
#[proc_macro_attribute]
pub fn operation_group(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as OperationGroupArgs);
    let input = parse_macro_input!(item as ItemMod);

    let group_name = args.group_name.to_string();
    let mod_name = &input.ident;
    let vis = &input.vis;

    let (_brace, items) = match input.content {
        Some((brace, items)) => (brace, items),
        None => {
            return syn::Error::new_spanned(input, "Module must have content")
                .to_compile_error()
                .into();
        }
    };

    // Operation structs are identified by their injected `deps` field; plain
    // input/output structs in the same module are left alone.
    let operation_structs: Vec<&Ident> = items
        .iter()
        .filter_map(|item| {
            if let syn::Item::Struct(s) = item {
                let has_deps_field = if let syn::Fields::Named(fields) = &s.fields {
                    fields
                        .named
                        .iter()
                        .any(|f| f.ident.as_ref().map(|i| i == "deps").unwrap_or(false))
                } else {
                    false
                };

                if has_deps_field { Some(&s.ident) } else { None }
            } else {
                None
            }
        })
        .collect();

    let registration_calls = operation_structs.iter().map(|struct_name| {
        quote! {
            registry.register(
                #struct_name::new(deps.clone()),
                #struct_name::OPERATION_NAME,
            );
        }
    });

    let http_route_calls = operation_structs.iter().map(|struct_name| {
        quote! {
            router = router.merge(#struct_name::http_route(deps.clone()));
        }
    });

    // MCP tools carry the bare operation name so AI clients see the same
    // vocabulary the CLI and HTTP API use.
    let mcp_tool_calls = operation_structs.iter().map(|struct_name| {
        quote! {
            tools.push(rmcp::model::Tool::new(
                #struct_name::OPERATION_NAME,
                #struct_name::DESCRIPTION,
                std::sync::Arc::new(#struct_name::metadata().schema),
            ));
        }
    });

    let expanded = quote! {
        #vis mod #mod_name {
            pub const GROUP_NAME: &str = #group_name;

            #(#items)*

            /// Auto-generated: register every operation in this group
            pub fn register_all(
                registry: &mut super::super::OperationRegistry,
                deps: std::sync::Arc<super::Dependencies>,
            ) {
                #(#registration_calls)*
            }

            /// Auto-generated: HTTP routes for every operation in this group
            pub fn register_http_routes(deps: std::sync::Arc<super::Dependencies>) -> axum::Router {
                let mut router = axum::Router::new();
                #(#http_route_calls)*
                router
            }

            /// Auto-generated: MCP tool descriptors for every operation in this group
            pub fn register_mcp_tools(_deps: std::sync::Arc<super::Dependencies>) -> Vec<rmcp::model::Tool> {
                let mut tools = Vec::new();
                #(#mcp_tool_calls)*
                tools
            }
        }
    };

    TokenStream::from(expanded)
}

struct OperationArgs {
    name: Option<String>,
    http: Option<String>,
    cli: Option<String>,
    description: Option<String>,
    group: Option<String>,
    input: Option<Ident>,
}

impl Parse for OperationArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut http = None;
        let mut cli = None;
        let mut description = None;
        let mut group = None;
        let mut input_type = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "input" => {
                    let type_ident: Ident = input.parse()?;
                    input_type = Some(type_ident);
                }
                _ => {
                    let value: LitStr = input.parse()?;
                    match ident.to_string().as_str() {
                        "name" => name = Some(value.value()),
                        "http" => http = Some(value.value()),
                        "cli" => cli = Some(value.value()),
                        "description" => description = Some(value.value()),
                        "group" => group = Some(value.value()),
                        _ => return Err(syn::Error::new_spanned(ident, "Unknown attribute")),
                    }
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(OperationArgs {
            name,
            http,
            cli,
            description,
            group,
            input: input_type,
        })
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();

    for ch in s.chars() {
        if ch.is_uppercase() {
            if !result.is_empty() {
                result.push('_');
            }
            result.push(ch.to_lowercase().next().unwrap());
        } else {
            result.push(ch);
        }
    }

    result
}

/// Split "PATCH /accounts/{username}/deactivate" into method and path
fn parse_http_route(http: &str) -> (String, String) {
    let parts: Vec<&str> = http.splitn(2, ' ').collect();
    if parts.len() == 2 {
        (parts[0].to_string(), parts[1].to_string())
    } else {
        ("GET".to_string(), http.to_string())
    }
}

fn extract_path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                Some(segment[1..segment.len() - 1].to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Generate the `http_route` builder for an operation.
///
/// Route shapes are deliberately narrow: either no path parameter (input comes
/// from the query string for GET/DELETE, the JSON body otherwise) or exactly
/// one path parameter that maps onto a single-field input struct. Nested ids
/// are not part of this API.
fn generate_http_route_method(
    http_method: &str,
    http_path: &str,
    input_type: &Option<Ident>,
) -> proc_macro2::TokenStream {
    use proc_macro2::Span;

    let path_params = extract_path_params(http_path);
    let method_lower = http_method.to_lowercase();
    let method_ident = Ident::new(&method_lower, Span::call_site());

    let (extractors, input_construction) = match input_type {
        Some(input_ty) if path_params.is_empty() => {
            if http_method == "GET" || http_method == "DELETE" {
                (
                    quote! { axum::extract::Query(input): axum::extract::Query<#input_ty> },
                    quote! { input },
                )
            } else {
                (
                    quote! { axum::extract::Json(input): axum::extract::Json<#input_ty> },
                    quote! { input },
                )
            }
        }
        Some(input_ty) if path_params.len() == 1 => {
            let param_ident = Ident::new(&path_params[0], Span::call_site());
            (
                quote! { axum::extract::Path(#param_ident): axum::extract::Path<String> },
                quote! { #input_ty { #param_ident } },
            )
        }
        Some(_) => {
            return syn::Error::new(
                Span::call_site(),
                "operations support at most one path parameter",
            )
            .to_compile_error();
        }
        None => (quote! {}, quote! { () }),
    };

    quote! {
        /// Auto-generated HTTP route for this operation
        pub fn http_route(deps: std::sync::Arc<super::Dependencies>) -> axum::Router {
            axum::Router::new().route(
                Self::HTTP_PATH.unwrap(),
                axum::routing::#method_ident({
                    move |#extractors| async move {
                        let op = Self::new(deps.clone());
                        let result = op.execute(#input_construction).await
                            .map_err(crate::http::AppError::from)?;
                        Ok::<axum::Json<_>, crate::http::AppError>(axum::Json(result))
                    }
                })
            )
        }
    }
}

/// Attribute macro for individual operations
///
/// Usage: #[operation(name = "get_account", input = GetAccountInput,
///                    http = "GET /accounts/{username}", cli = "accounts get <USERNAME>")]
#[proc_macro_attribute]
pub fn operation(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as OperationArgs);
    let input = parse_macro_input!(item as ItemStruct);

    let struct_name = &input.ident;
    let vis = &input.vis;
    let fields = &input.fields;
    let attrs = &input.attrs;

    let operation_name = args
        .name
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    // Doc comment doubles as the description when none is given explicitly
    let doc_comment = attrs
        .iter()
        .filter_map(|attr| {
            if attr.path().is_ident("doc")
                && let syn::Meta::NameValue(meta) = &attr.meta
                && let syn::Expr::Lit(expr_lit) = &meta.value
                && let syn::Lit::Str(lit_str) = &expr_lit.lit
            {
                return Some(lit_str.value().trim().to_string());
            }
            None
        })
        .collect::<Vec<_>>()
        .join(" ");

    let description = args.description.unwrap_or_else(|| {
        if doc_comment.is_empty() {
            format!("{} operation", struct_name)
        } else {
            doc_comment
        }
    });

    let (http_method_const, http_path_const, http_route_method) = if let Some(http) = &args.http {
        let (method, path) = parse_http_route(http);
        let http_method_helper = generate_http_route_method(&method, &path, &args.input);
        (
            quote! { Some(#method) },
            quote! { Some(#path) },
            http_method_helper,
        )
    } else {
        (
            quote! { None },
            quote! { None },
            quote! {
                /// No HTTP route defined for this operation
                pub fn http_route(_deps: std::sync::Arc<super::Dependencies>) -> axum::Router {
                    axum::Router::new()
                }
            },
        )
    };

    let cli_pattern = if let Some(cli) = args.cli {
        quote! { Some(#cli) }
    } else {
        quote! { None }
    };

    let group_value = if let Some(group) = args.group {
        quote! { #group }
    } else {
        quote! { GROUP_NAME }
    };

    // Input schema, generated once per operation and cached
    let schema_generation = if let Some(input_type) = args.input {
        quote! {
            {
                use std::sync::OnceLock;
                use schemars::schema_for;

                static SCHEMA: OnceLock<serde_json::Map<String, serde_json::Value>> = OnceLock::new();

                SCHEMA.get_or_init(|| {
                    let schema = schema_for!(#input_type);
                    match serde_json::to_value(&schema) {
                        Ok(serde_json::Value::Object(map)) => map,
                        _ => fallback_schema(),
                    }
                }).clone()
            }
        }
    } else {
        quote! {
            {
                use std::sync::OnceLock;

                static SCHEMA: OnceLock<serde_json::Map<String, serde_json::Value>> = OnceLock::new();

                SCHEMA.get_or_init(fallback_schema).clone()
            }
        }
    };

    let expanded = quote! {
        #[derive(Clone)]
        #(#attrs)*
        #vis struct #struct_name #fields

        impl #struct_name {
            pub const OPERATION_NAME: &'static str = #operation_name;
            pub const DESCRIPTION: &'static str = #description;
            pub const GROUP: &'static str = #group_value;
            pub const HTTP_METHOD: Option<&'static str> = #http_method_const;
            pub const HTTP_PATH: Option<&'static str> = #http_path_const;
            pub const CLI_PATTERN: Option<&'static str> = #cli_pattern;

            pub fn new(deps: std::sync::Arc<super::Dependencies>) -> Self {
                Self { deps }
            }

            #http_route_method
        }

        impl super::super::HasMetadata for #struct_name {
            fn metadata() -> super::super::OperationMetadata {
                fn fallback_schema() -> serde_json::Map<String, serde_json::Value> {
                    let mut schema = serde_json::Map::new();
                    schema.insert("type".to_string(), serde_json::Value::String("object".to_string()));
                    schema.insert("properties".to_string(), serde_json::Value::Object(serde_json::Map::new()));
                    schema.insert("additionalProperties".to_string(), serde_json::Value::Bool(true));
                    schema
                }

                super::super::OperationMetadata {
                    name: Self::OPERATION_NAME,
                    description: Self::DESCRIPTION,
                    group: Self::GROUP,
                    http_method: Self::HTTP_METHOD,
                    http_path: Self::HTTP_PATH,
                    cli_pattern: Self::CLI_PATTERN,
                    schema: #schema_generation,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
