use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

use super::errors::StoreError;
use super::Change;

type Matcher = Box<dyn Fn(&Change) -> bool + Send + Sync>;
type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, StoreError>> + Send + Sync>;

/// Live view over a query.
///
/// The first item is the current result set; afterwards every committed change
/// the matcher accepts re-runs the query and yields the complete new result.
/// Dropping the subscription (or calling [`Subscription::cancel`]) detaches it
/// from the change feed.
pub struct Subscription<T> {
    name: &'static str,
    receiver: broadcast::Receiver<Change>,
    matches: Matcher,
    load: Loader<T>,
    primed: bool,
}

impl<T: Send + 'static> Subscription<T> {
    pub fn new(
        name: &'static str,
        receiver: broadcast::Receiver<Change>,
        matches: impl Fn(&Change) -> bool + Send + Sync + 'static,
        load: impl Fn() -> BoxFuture<'static, Result<T, StoreError>> + Send + Sync + 'static,
    ) -> Self {
        trace!("Opening {name} subscription");
        Self {
            name,
            receiver,
            matches: Box::new(matches),
            load: Box::new(load),
            primed: false,
        }
    }

    /// Waits for the next result set. `None` once the store shuts its feed.
    pub async fn next(&mut self) -> Option<Result<T, StoreError>> {
        if !self.primed {
            self.primed = true;
            return Some((self.load)().await);
        }

        loop {
            match self.receiver.recv().await {
                Ok(change) if (self.matches)(&change) => return Some((self.load)().await),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // missed changes may have been ours, reload to be safe
                    warn!("{} subscription skipped {skipped} changes", self.name);
                    return Some((self.load)().await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn cancel(self) {}

    pub fn into_stream(self) -> impl Stream<Item = Result<T, StoreError>> + Send {
        stream::unfold(self, |mut subscription| async move {
            let item = subscription.next().await?;
            Some((item, subscription))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        trace!("Closing {} subscription", self.name);
    }
}
