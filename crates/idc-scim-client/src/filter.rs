//! Filter expressions accepted by the directory.
//!
//! The directory only understands the `eq` comparison and the `and`
//! conjunction, so those are the only ways to build a [`Filter`].

use std::fmt;
use std::ops::BitAnd;

/// Right-hand side of an `eq` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Rendered as a double-quoted string literal.
    Str(String),
    /// Rendered as a bare `true` / `false`.
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A filter predicate, ready to be sent as the `filter` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(String);

impl Filter {
    /// `attr eq value`.
    pub fn eq(attr: &str, value: impl Into<FilterValue>) -> Self {
        let rendered = match value.into() {
            FilterValue::Str(s) => format!("\"{}\"", escape_filter_value(&s)),
            FilterValue::Bool(true) => "true".to_string(),
            FilterValue::Bool(false) => "false".to_string(),
        };
        Self(format!("{attr} eq {rendered}"))
    }

    /// `(self) and (other)`.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        Self(format!("({}) and ({})", self.0, other.0))
    }

    pub fn user_name(user_name: &str) -> Self {
        Self::eq("userName", user_name)
    }

    pub fn display_name(display_name: &str) -> Self {
        Self::eq("displayName", display_name)
    }

    pub fn external_id(external_id: &str) -> Self {
        Self::eq("externalId", external_id)
    }

    pub fn active(active: bool) -> Self {
        Self::eq("active", active)
    }

    /// Groups having `user_id` as a member.
    ///
    /// Group listings never carry members, so this reverse query is the only
    /// way to learn membership.
    pub fn member(user_id: &str) -> Self {
        Self::eq("members.value", user_id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape backslashes and double-quotes inside a filter string literal.
fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_quotes_strings() {
        assert_eq!(
            Filter::eq("userName", "a@b.com").as_str(),
            r#"userName eq "a@b.com""#
        );
    }

    #[test]
    fn test_eq_lowers_booleans() {
        assert_eq!(Filter::eq("active", true).as_str(), "active eq true");
        assert_eq!(Filter::active(false).as_str(), "active eq false");
    }

    #[test]
    fn test_and_wraps_both_sides() {
        let filter = Filter::display_name("Eng").and(Filter::active(true));
        assert_eq!(
            filter.to_string(),
            r#"(displayName eq "Eng") and (active eq true)"#
        );

        let via_operator = Filter::display_name("Eng") & Filter::active(true);
        assert_eq!(via_operator, filter);
    }

    #[test]
    fn test_member_predicate() {
        assert_eq!(
            Filter::member("9067729b3d-1234").as_str(),
            r#"members.value eq "9067729b3d-1234""#
        );
    }

    #[test]
    fn test_escapes_quotes() {
        assert_eq!(
            Filter::external_id(r#"a"b"#).as_str(),
            r#"externalId eq "a\"b""#
        );
    }
}
