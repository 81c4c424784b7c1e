//! Cursor pagination.
//!
//! The directory pages with an opaque `nextCursor`. The first request has two
//! quirks: an unfiltered listing only returns a cursor when an empty
//! `cursor=` parameter is sent, while a filtered listing is rejected when
//! that empty parameter is present.

use crate::error::{ScimClientError, ScimClientResult};
use crate::filter::Filter;
use crate::models::ListPage;
use crate::transport::Transport;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::debug;

/// Page size. This is the directory's documented maximum.
pub const PAGE_SIZE: usize = 100;

enum Cursor {
    First,
    Next(String),
    Done,
}

/// Build the query for one page request.
fn page_query(filter: Option<&Filter>, cursor: &Cursor) -> Vec<(&'static str, String)> {
    let mut query = vec![("count", PAGE_SIZE.to_string())];
    if let Some(filter) = filter {
        query.push(("filter", filter.to_string()));
    }
    match cursor {
        Cursor::First if filter.is_none() => query.push(("cursor", String::new())),
        Cursor::Next(cursor) => query.push(("cursor", cursor.clone())),
        Cursor::First | Cursor::Done => {}
    }
    query
}

/// Lazily stream every resource under `path`.
///
/// Pages are fetched on demand; the stream ends after the page whose
/// continuation cursor is absent or empty. Each call starts a fresh listing.
pub fn paginate<'a, T: Transport + ?Sized>(
    transport: &'a T,
    path: &'a str,
    filter: Option<Filter>,
) -> impl Stream<Item = ScimClientResult<Value>> + Send + 'a {
    stream::try_unfold(Cursor::First, move |cursor| {
        let filter = filter.clone();
        async move {
            if matches!(cursor, Cursor::Done) {
                return Ok(None);
            }
            let query = page_query(filter.as_ref(), &cursor);
            let body = transport.get(path, &query).await?.ok_or_else(|| {
                ScimClientError::ParseError(format!("empty list response from {path}"))
            })?;
            let page: ListPage = serde_json::from_value(body)
                .map_err(|e| ScimClientError::ParseError(format!("invalid list response: {e}")))?;

            debug!(
                path,
                resources = page.resources.len(),
                has_next = page.next_cursor.is_some(),
                "SCIM page fetched"
            );

            let next = match page.next_cursor {
                Some(cursor) => Cursor::Next(cursor),
                None => Cursor::Done,
            };
            let items = page.resources.into_iter().map(Ok::<Value, ScimClientError>);
            Ok::<_, ScimClientError>(Some((stream::iter(items), next)))
        }
    })
    .try_flatten()
}

/// First resource of a listing, fetching at most one page.
pub async fn first<T: Transport + ?Sized>(
    transport: &T,
    path: &str,
    filter: Option<Filter>,
) -> ScimClientResult<Option<Value>> {
    let stream = paginate(transport, path, filter);
    futures::pin_mut!(stream);
    stream.next().await.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<'q>(query: &'q [(&str, String)], key: &str) -> Option<&'q str> {
        query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_first_unfiltered_sends_empty_cursor() {
        let query = page_query(None, &Cursor::First);
        assert_eq!(value_of(&query, "cursor"), Some(""));
        assert_eq!(value_of(&query, "count"), Some("100"));
    }

    #[test]
    fn test_first_filtered_omits_cursor() {
        let filter = Filter::user_name("a@b.com");
        let query = page_query(Some(&filter), &Cursor::First);
        assert_eq!(value_of(&query, "cursor"), None);
        assert_eq!(value_of(&query, "filter"), Some(r#"userName eq "a@b.com""#));
    }

    #[test]
    fn test_next_sends_cursor_verbatim() {
        let filter = Filter::member("u1");
        let query = page_query(Some(&filter), &Cursor::Next("c/2==".into()));
        assert_eq!(value_of(&query, "cursor"), Some("c/2=="));
    }
}
