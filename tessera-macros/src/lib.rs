//! Procedural macros for the tessera runtime.
//!
//! Re-exported from `tessera`; use them as `tessera::join!`,
//! `tessera::select!`, `#[tessera::main]` and `#[tessera::test]`.

mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Polls every future concurrently and waits for all of them.
///
/// Evaluates to a tuple of the outputs, in argument order. Must be used
/// inside an `async` context.
///
/// ```rust,ignore
/// let (a, b) = tessera::join!(async { 1 }, async { "two" });
/// ```
#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);

    if args.is_empty() {
        return utils::parse_generated("join", "async {}.await");
    }

    let mut source = String::from("{\n");

    for (i, tokens) in args.iter().enumerate() {
        let future = utils::to_source(tokens);
        source.push_str(&format!(
            "let mut __join{i} = ::tessera::future::MaybeDone::new({future});\n"
        ));
    }

    source.push_str("::std::future::poll_fn(|__cx| {\n");
    source.push_str("    let mut __done = true;\n");
    for i in 0..args.len() {
        source.push_str(&format!("    __done &= __join{i}.poll_done(__cx);\n"));
    }
    source.push_str("    if !__done {\n");
    source.push_str("        return ::std::task::Poll::Pending;\n");
    source.push_str("    }\n");

    let outputs = (0..args.len())
        .map(|i| format!("__join{i}.take_output()"))
        .collect::<Vec<_>>()
        .join(", ");

    source.push_str(&format!("    ::std::task::Poll::Ready(({outputs},))\n"));
    source.push_str("}).await\n");
    source.push_str("}\n");

    utils::parse_generated("join", &source)
}

/// Waits for the first of several futures and runs its handler.
///
/// Each branch is `future => handler`, where `handler` is a closure
/// receiving that future's output. Futures are polled in branch order; as
/// soon as one is ready the others are dropped, which cancels them, and
/// the whole expression evaluates to the winning handler's result.
///
/// ```rust,ignore
/// let winner = tessera::select!(
///     sleep(Duration::from_millis(10)) => |_| "timer",
///     rx.recv() => |_| "message",
/// );
/// ```
#[proc_macro]
pub fn select(input: TokenStream) -> TokenStream {
    let branches = match utils::parse_select_branches(input) {
        Ok(branches) if branches.is_empty() => {
            return utils::compile_error("select! requires at least one branch");
        }
        Ok(branches) => branches,
        Err(message) => return utils::compile_error(&message),
    };

    let count = branches.len();
    let mut source = String::from("{\n");

    let generics = (0..count)
        .map(|i| format!("__T{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    source.push_str(&format!("enum __Selected<{generics}> {{\n"));
    for i in 0..count {
        source.push_str(&format!("    __B{i}(__T{i}),\n"));
    }
    source.push_str("}\n");

    // The futures are moved into the closure, so they are dropped as soon
    // as the winner is known, before its handler runs.
    for (i, (future, _)) in branches.iter().enumerate() {
        source.push_str(&format!(
            "let mut __select{i} = ::std::boxed::Box::pin({future});\n"
        ));
    }

    source.push_str("let __selected = ::std::future::poll_fn(move |__cx| {\n");
    for i in 0..count {
        source.push_str(&format!(
            "    if let ::std::task::Poll::Ready(__value) = \
             ::std::future::Future::poll(__select{i}.as_mut(), __cx) {{\n\
                 return ::std::task::Poll::Ready(__Selected::__B{i}(__value));\n\
             }}\n"
        ));
    }
    source.push_str("    ::std::task::Poll::Pending\n");
    source.push_str("}).await;\n");

    source.push_str("match __selected {\n");
    for (i, (_, handler)) in branches.iter().enumerate() {
        source.push_str(&format!(
            "    __Selected::__B{i}(__value) => ({handler})(__value),\n"
        ));
    }
    source.push_str("}\n");
    source.push_str("}\n");

    utils::parse_generated("select", &source)
}

/// Runs an `async fn main` on a fresh tessera runtime.
///
/// Accepts `worker_threads = N`; the default is one worker per CPU.
///
/// ```rust,ignore
/// #[tessera::main(worker_threads = 4)]
/// async fn main() {
///     tessera::time::sleep(std::time::Duration::from_millis(10)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let worker_threads = match utils::parse_worker_threads(attr) {
        Ok(n) => n,
        Err(message) => return utils::compile_error(&message),
    };

    match utils::wrap_in_runtime(item, worker_threads) {
        Ok(tokens) => tokens.into_iter().collect(),
        Err(message) => utils::compile_error(&message),
    }
}

/// Runs an `async fn` test on a fresh tessera runtime.
///
/// Accepts `worker_threads = N` like [`macro@main`].
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let worker_threads = match utils::parse_worker_threads(attr) {
        Ok(n) => n,
        Err(message) => return utils::compile_error(&message),
    };

    let tokens = match utils::wrap_in_runtime(item, worker_threads) {
        Ok(tokens) => tokens,
        Err(message) => return utils::compile_error(&message),
    };

    let mut output: Vec<TokenTree> = "#[::core::prelude::v1::test]"
        .parse::<TokenStream>()
        .map(|attr| attr.into_iter().collect())
        .unwrap_or_default();
    output.extend(tokens);

    output.into_iter().collect()
}
