/// Appends `token` to a whitespace-separated token list unless it is already
/// present. Existing tokens keep their order; the result is single-space joined.
pub fn increase_in_list(list: Option<&str>, token: &str) -> String {
    let mut tokens: Vec<&str> = list.unwrap_or("").split_whitespace().collect();
    let token = token.trim();
    if !token.is_empty() && !tokens.contains(&token) {
        tokens.push(token);
    }
    tokens.join(" ")
}

pub fn contains_token(list: Option<&str>, token: &str) -> bool {
    list.map(|value| value.split_whitespace().any(|t| t == token))
        .unwrap_or(false)
}
