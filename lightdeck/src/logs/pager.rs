use super::LogEvent;
use crate::control_plane::{ControlPlane, LogQuery};
use crate::error::{Error, Result};
use futures::stream::{self, Stream};
use tracing::trace;

enum Cursor {
    First,
    Next(String),
    Done,
}

/// Pages of events for one container, fetched one after another until the
/// control plane stops returning a continuation token.
pub fn container_pages<'a, C: ControlPlane>(
    client: &'a C,
    query: LogQuery,
) -> impl Stream<Item = Result<Vec<LogEvent>>> + 'a {
    stream::try_unfold((Cursor::First, query), move |(cursor, query)| async move {
        let token = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::First => None,
            Cursor::Next(token) => Some(token),
        };

        let page = client.get_container_log_page(&query, token.as_deref()).await?;
        trace!(
            container = %query.container_name,
            events = page.events.len(),
            more = page.next_page_token.is_some(),
            "log page"
        );

        let events: Vec<LogEvent> = page
            .events
            .into_iter()
            .map(|event| LogEvent {
                timestamp: event.created_at,
                container_name: query.container_name.clone(),
                message: event.message,
            })
            .collect();
        let next = match page.next_page_token {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };
        Ok::<_, Error>(Some((events, (next, query))))
    })
}
