//! Stream helpers over tokio watch channels

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::watch;

/// Stream the current value of a watch channel, then every change
///
/// Ends when the sender is dropped.
pub fn watch_stream<T>(rx: watch::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + Sync + 'static,
{
    stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first {
            rx.changed().await.ok()?;
        }
        let value = rx.borrow_and_update().clone();
        Some((value, (rx, false)))
    })
    .boxed()
}

/// Like [`watch_stream`], projecting each value and skipping repeats
pub fn watch_distinct<T, U, F>(rx: watch::Receiver<T>, project: F) -> BoxStream<'static, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + PartialEq + Send + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    let mut last: Option<U> = None;
    watch_stream(rx)
        .filter_map(move |value| {
            let next = project(&value);
            let changed = last.as_ref() != Some(&next);
            if changed {
                last = Some(next.clone());
            }
            futures::future::ready(changed.then_some(next))
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watch_stream_emits_current_then_changes() {
        let (tx, rx) = watch::channel(1);
        let mut s = watch_stream(rx);
        assert_eq!(s.next().await, Some(1));

        tx.send_replace(2);
        assert_eq!(s.next().await, Some(2));

        drop(tx);
        assert_eq!(s.next().await, None);
    }

    #[tokio::test]
    async fn test_watch_distinct_skips_repeats() {
        let (tx, rx) = watch::channel((1u32, "a"));
        let mut s = watch_distinct(rx, |(n, _)| *n);
        assert_eq!(s.next().await, Some(1));

        tx.send_replace((1, "b"));
        tx.send_replace((2, "b"));
        assert_eq!(s.next().await, Some(2));
    }
}
