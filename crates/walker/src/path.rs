//! Dotted path construction.

/// Path separator between browse names.
pub const SEPARATOR: char = '.';

/// Append `name` to `parent`.
///
/// A plain join: names that themselves contain `.` are not escaped, so such
/// paths cannot be split back apart unambiguously.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        return name.to_string();
    }
    let mut path = String::with_capacity(parent.len() + 1 + name.len());
    path.push_str(parent);
    path.push(SEPARATOR);
    path.push_str(name);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_from_root() {
        let foo = join("", "Foo");
        assert_eq!(foo, "Foo");
        assert_eq!(join(&foo, "Bar"), "Foo.Bar");
    }

    #[test]
    fn test_join_does_not_escape() {
        assert_eq!(join("Foo", "a.b"), "Foo.a.b");
        assert_eq!(join("Foo", ""), "Foo.");
    }
}
