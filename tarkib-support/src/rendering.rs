//! Text rendering helpers for diagnostics.
//!
//! Resolution errors mention types by their full `type_name`, which is
//! noisy (`alloc::boxed::Box<dyn my_app::store::Store>`). These helpers
//! shorten names and render the chain of types that was being built when
//! something failed.

/// Renders a chain of type names, shortening every element.
///
/// # Examples
/// ```
/// use tarkib_support::rendering::render_chain;
///
/// let chain = ["app::Service", "app::net::Connection", "app::net::Socket"];
/// assert_eq!(render_chain(&chain), "Service → Connection → Socket");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|name| shorten_type_name(name.as_ref()))
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// Every path inside the name keeps only its last segment, generic
/// arguments included.
///
/// ```
/// use tarkib_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::services::UserService"), "UserService");
/// assert_eq!(
///     shorten_type_name("alloc::boxed::Box<dyn app::store::Store>"),
///     "Box<dyn Store>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Picks names from `available` that look like `requested`.
///
/// Used to hint at an existing mapping when a slot type could not be
/// constructed. Results are ordered best match first.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let short = shorten_type_name(name).to_lowercase();
            if short == wanted {
                return None;
            }
            if short.contains(&wanted) || wanted.contains(&short) {
                return Some((name, 100));
            }

            let common = short
                .chars()
                .zip(wanted.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| shorten_type_name(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_is_shortened_and_joined() {
        let chain = ["a::Service", "b::Connection"];
        assert_eq!(render_chain(&chain), "Service → Connection");
    }

    #[test]
    fn single_and_empty_chain() {
        assert_eq!(render_chain(&["x::Root"]), "Root");
        let empty: [&str; 0] = [];
        assert_eq!(render_chain(&empty), "");
    }

    #[test]
    fn shorten_plain_name() {
        assert_eq!(shorten_type_name("Connection"), "Connection");
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<std::sync::Mutex<app::Pool>>"),
            "Arc<Mutex<Pool>>"
        );
    }

    #[test]
    fn shorten_tuple_and_reference() {
        assert_eq!(shorten_type_name("(a::A, &b::B)"), "(A, &B)");
    }

    #[test]
    fn suggests_close_names() {
        let available = ["app::Store", "app::SqlStore", "app::Logger"];
        let hints = suggest_similar("app::Stor", &available, 2);
        assert_eq!(hints.len(), 2);
        assert!(hints.iter().all(|h| h.contains("Store")));
    }

    #[test]
    fn exact_match_is_not_a_suggestion() {
        let available = ["app::Store"];
        assert!(suggest_similar("other::Store", &available, 3).is_empty());
    }

    #[test]
    fn unrelated_names_are_ignored() {
        let available = ["app::Database"];
        assert!(suggest_similar("Xyz", &available, 3).is_empty());
    }
}
