//! Helpers for the [RFC-6761][RFC-6761] `.test` TLD.
//!
//! Names handed to the stub resolver should be rooted under `.test.` so they can never collide
//! with a real, resolvable domain.
//!
//! [RFC-6761]: https://www.rfc-editor.org/rfc/rfc6761#section-6.2

/// The TLD reserved specifically for testing usages.
pub const TEST_TLD: &str = "test";

/// Transform `dn` into a lower-cased, fully qualified name rooted under [`TEST_TLD`].
///
/// ```
/// assert_eq!(testacme::rfc6761::canonical_test("Foo.Bar"), "foo.bar.test.");
/// assert_eq!(testacme::rfc6761::canonical_test("foo.test."), "foo.test.");
/// ```
#[must_use]
pub fn canonical_test(dn: &str) -> String {
    let mut name = dn.to_ascii_lowercase();
    if !name.ends_with('.') {
        name.push('.');
    }
    if name == "test." || name.ends_with(".test.") {
        return name;
    }
    name.push_str(TEST_TLD);
    name.push('.');
    name
}
