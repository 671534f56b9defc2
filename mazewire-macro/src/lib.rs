/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Mazewire Macro Library
//!
//! Procedural macros that remove the boilerplate around Mazewire actor state
//! types, method parameter types and application entry points.
//!
//! # Actor Macro
//!
//! ```ignore
//! #[mazewire_actor]
//! pub struct Multiplier {
//!     calls: usize,
//! }
//! ```
//!
//! # Params Macro
//!
//! Named parameters arrive on the wire as a mapping; [`mazewire_params`] makes a
//! struct decodable from one:
//!
//! ```ignore
//! #[mazewire_params]
//! pub struct MoveTo {
//!     pub x: i64,
//!     pub y: i64,
//! }
//! ```
//!
//! # Main Entry Point
//!
//! ```ignore
//! use mazewire::prelude::*;
//!
//! #[mazewire_main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = MazewireApp::launch_async().await;
//!     // ...
//!     runtime.shutdown_all().await
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, ItemFn};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Options parsed from `#[mazewire_actor(...)]`.
#[derive(Default)]
struct ActorOptions {
    /// Skip deriving Default (the user implements it).
    no_default: bool,
}

impl ActorOptions {
    fn parse(attr: &TokenStream) -> Self {
        let mut options = Self::default();
        for part in attr.to_string().split(',') {
            if part.trim() == "no_default" {
                options.no_default = true;
            }
        }
        options
    }
}

/// Derives `Clone`, `Debug`, `serde::Serialize` and `serde::Deserialize` for a
/// method parameter type, and asserts at compile time that it is
/// `Send + Sync + 'static`.
///
/// Structs with named fields decode from named params (`{"x": 1, "y": 2}`);
/// tuple structs decode from positional params (`[1, 2]`).
///
/// ```ignore
/// use mazewire::prelude::*;
///
/// #[mazewire_params]
/// pub struct Factors(pub i64, pub i64, pub i64);
/// ```
///
/// Requires `serde` to be reachable from the calling crate.
#[proc_macro_attribute]
pub fn mazewire_params(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(serde::Serialize));
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(serde::Deserialize));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertMazewireParams_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Derives `Default` and `Debug` for an actor state type and asserts at compile
/// time that it is `Send + 'static`.
///
/// ```ignore
/// use mazewire_macro::mazewire_actor;
///
/// #[mazewire_actor]
/// pub struct Scoreboard {
///     points: u32,
/// }
/// ```
///
/// Use `#[mazewire_actor(no_default)]` when a field has no `Default` and you
/// provide the implementation yourself. State types need `Default` because an
/// actor is built with its default state before handlers are registered.
#[proc_macro_attribute]
pub fn mazewire_actor(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = ActorOptions::parse(&attr);

    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let need_default = !options.no_default && !has_derive(&input, "Default");
    let need_debug = !has_derive(&input, "Debug");

    let derives = {
        let mut traits = Vec::new();
        if need_default {
            traits.push(quote!(Default));
        }
        if need_debug {
            traits.push(quote!(Debug));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertMazewireActor_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Entry point macro for Mazewire applications.
///
/// Wraps an `async fn main` in a tokio runtime built through the `mazewire`
/// prelude, so binaries do not need a direct tokio dependency.
///
/// - `flavor = "current_thread"` selects the single-threaded runtime.
/// - `worker_threads = N` sizes the multi-threaded runtime.
#[proc_macro_attribute]
pub fn mazewire_main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            sig.fn_token,
            "the async keyword is missing from the function declaration",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return syn::Error::new_spanned(
            &sig.ident,
            "mazewire_main can only be applied to the main function",
        )
        .to_compile_error()
        .into();
    }

    let attr_string = attr.to_string();
    let use_current_thread = attr_string.contains("current_thread");
    let worker_threads: Option<usize> = attr_string
        .split(',')
        .find(|s| s.contains("worker_threads"))
        .and_then(|s| s.split('=').nth(1).and_then(|v| v.trim().parse().ok()));

    let runtime_builder = if use_current_thread {
        quote! {
            ::mazewire::prelude::tokio::runtime::Builder::new_current_thread()
        }
    } else if let Some(threads) = worker_threads {
        quote! {
            ::mazewire::prelude::tokio::runtime::Builder::new_multi_thread()
                .worker_threads(#threads)
        }
    } else {
        quote! {
            ::mazewire::prelude::tokio::runtime::Builder::new_multi_thread()
        }
    };

    let fn_name = &sig.ident;
    let fn_inputs = &sig.inputs;
    let fn_output = &sig.output;

    let expanded = quote! {
        #(#attrs)*
        #vis fn #fn_name(#fn_inputs) #fn_output {
            #runtime_builder
                .enable_all()
                .build()
                .expect("Failed to build Mazewire runtime")
                .block_on(async #body)
        }
    };

    TokenStream::from(expanded)
}
