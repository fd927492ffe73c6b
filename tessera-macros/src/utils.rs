use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Splits a `TokenStream` on top-level commas.
///
/// Commas nested inside groups (parentheses, brackets, braces) belong to
/// their group's single `TokenTree` and never split an argument. Empty
/// arguments, e.g. from a trailing comma, are skipped.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Renders tokens back to source, letting `proc_macro` decide spacing.
pub(crate) fn to_source(tokens: &[TokenTree]) -> String {
    tokens.iter().cloned().collect::<TokenStream>().to_string()
}

/// Splits `select!` branches of the form `future => handler`.
///
/// Returns `(future, handler)` source pairs, or an error naming the first
/// branch without an arrow.
pub(crate) fn parse_select_branches(input: TokenStream) -> Result<Vec<(String, String)>, String> {
    let mut branches = Vec::new();

    for (index, tokens) in split_args(input).into_iter().enumerate() {
        let arrow = (0..tokens.len().saturating_sub(1)).find(|&i| is_arrow(&tokens, i));

        let Some(arrow) = arrow else {
            return Err(format!("select! branch {index} must be `future => handler`"));
        };

        let future = &tokens[..arrow];
        let handler = &tokens[arrow + 2..];

        if future.is_empty() || handler.is_empty() {
            return Err(format!("select! branch {index} is incomplete"));
        }

        branches.push((to_source(future), to_source(handler)));
    }

    Ok(branches)
}

fn is_arrow(tokens: &[TokenTree], i: usize) -> bool {
    matches!(
        (&tokens[i], &tokens[i + 1]),
        (TokenTree::Punct(p1), TokenTree::Punct(p2))
            if p1.as_char() == '=' && p2.as_char() == '>'
    )
}

/// Parses the `worker_threads = N` argument of `main`/`test`.
pub(crate) fn parse_worker_threads(attr: TokenStream) -> Result<Option<usize>, String> {
    let mut worker_threads = None;

    for arg in split_args(attr) {
        let source = to_source(&arg);
        let Some((key, value)) = source.split_once('=') else {
            return Err(format!("expected `key = value`, found `{source}`"));
        };

        match key.trim() {
            "worker_threads" => {
                let n = value.trim().parse::<usize>().map_err(|_| {
                    format!("worker_threads must be an integer, found `{}`", value.trim())
                })?;

                if n == 0 {
                    return Err("worker_threads must be > 0".to_owned());
                }

                worker_threads = Some(n);
            }
            other => return Err(format!("unknown attribute argument `{other}`")),
        }
    }

    Ok(worker_threads)
}

/// Rewrites `async fn name(..) { body }` so that `body` runs inside a fresh
/// runtime's `block_on`, and drops the `async` keyword.
pub(crate) fn wrap_in_runtime(
    item: TokenStream,
    worker_threads: Option<usize>,
) -> Result<Vec<TokenTree>, String> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return Err("the function must be declared `async`".to_owned());
    };
    tokens.remove(async_pos);

    let Some(body_pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return Err("expected a function body".to_owned());
    };

    let TokenTree::Group(body) = &tokens[body_pos] else {
        return Err("expected a function body".to_owned());
    };

    let mut builder = String::from("::tessera::RuntimeBuilder::new()");
    if let Some(n) = worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    let source = format!(
        "{{
            let runtime = {builder}
                .build()
                .expect(\"failed to build the tessera runtime\");
            runtime.block_on(async move {{ {} }})
        }}",
        body.stream()
    );

    let stream = source.parse::<TokenStream>().map_err(|err| err.to_string())?;
    tokens[body_pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Ok(tokens)
}

/// Expands to a `compile_error!` carrying `message`.
pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("::core::compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}

/// Parses generated source, turning a generation bug into a compile error.
pub(crate) fn parse_generated(macro_name: &str, source: &str) -> TokenStream {
    source
        .parse()
        .unwrap_or_else(|err| compile_error(&format!("{macro_name}! expansion failed: {err}")))
}
