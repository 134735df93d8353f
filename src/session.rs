//! Paging session orchestration.

use tracing::debug;

use crate::context::Context;
use crate::engine::Accumulator;
use crate::transport::RequestExecutor;
use crate::{Result, SearchError};

/// Drives one query's sequence of page requests.
///
/// Requests are strictly sequential: page N+1 is never requested before page
/// N has been handled. The session holds the executor for its whole lifetime
/// and releases the executor's connection resources when dropped, whichever
/// way the run ends.
pub struct PagingSession<'a, E: RequestExecutor> {
    executor: &'a mut E,
    context: Context,
}

impl<'a, E: RequestExecutor> PagingSession<'a, E> {
    /// Starts a session with an empty context.
    pub fn new(executor: &'a mut E) -> Self {
        Self {
            executor,
            context: Context::new(),
        }
    }

    /// Runs pages until the accumulator completes the context.
    ///
    /// Fails with whatever the executor or the accumulator fails with. A run
    /// that completes before any page was handled fails with
    /// [`SearchError::Parse`].
    pub async fn run<A: Accumulator>(mut self, accumulator: &mut A) -> Result<A::Output> {
        let mut value = None;
        let mut page = 0usize;

        while !self.context.is_completed() {
            let request = accumulator.build_request(&self.context)?;
            page += 1;
            debug!(engine = accumulator.name(), page, url = %request.url(), "Requesting page");

            let response = self.executor.execute(&request).await?;
            value = Some(accumulator.handle(response, value.take(), &mut self.context)?);
            accumulator.advance(&mut self.context);
        }

        debug!(engine = accumulator.name(), pages = page, "Session complete");
        value.ok_or_else(|| {
            SearchError::Parse(format!(
                "{} completed without handling a page",
                accumulator.name()
            ))
        })
    }
}

impl<E: RequestExecutor> Drop for PagingSession<'_, E> {
    fn drop(&mut self) {
        self.executor.release();
    }
}
