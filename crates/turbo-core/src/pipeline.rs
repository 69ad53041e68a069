//! Steps shared by the server and client runtimes.

use std::time::Instant;

use turbo_observability::{LoadSource, MetricsCollector, StructuredLogger};
use turbo_router::RouteRegistry;

use crate::dispatch::default_error_html;
use crate::{
    DispatchError, DispatchTargets, Dispatched, Invocation, LoadContext, LoadInvoker, LoadOutcome,
    Page, RedirectLoopError, Renderer,
};

/// Invoke a page's routine, then log and time the result.
pub(crate) async fn load(
    invoker: &LoadInvoker,
    page: &Page,
    ctx: &LoadContext,
    logger: &StructuredLogger,
    metrics: &mut MetricsCollector,
) -> LoadOutcome {
    let started = Instant::now();
    let invocation = invoker.invoke(page.load_routine(), ctx).await;
    let elapsed = started.elapsed();

    let source = match invocation {
        Invocation::Skipped => LoadSource::NoRoutine,
        _ => LoadSource::Invoked,
    };
    metrics.record_load(source, elapsed);

    match &invocation {
        Invocation::Skipped => logger.debug("page has no load routine"),
        Invocation::Failed(err) => logger
            .error_builder("load routine failed")
            .field("error", err.to_string())
            .duration_ms("load_ms", elapsed)
            .emit(),
        Invocation::Returned(_) => logger
            .debug_builder("load routine settled")
            .duration_ms("load_ms", elapsed)
            .emit(),
    }

    let failed = matches!(invocation, Invocation::Failed(_));
    let outcome = invocation.into_outcome();
    if let LoadOutcome::ErrorPage { status, message } = &outcome {
        // Deliberate error outcomes are not system faults.
        if !failed {
            logger
                .info_builder("load routine returned an error page")
                .field_i64("status", i64::from(*status))
                .field("message", message.clone())
                .emit();
        }
    }
    outcome
}

/// Components for dispatching a navigation to `path`.
pub(crate) fn targets<'a>(
    routes: &'a RouteRegistry<Page>,
    page: Option<&'a Page>,
    path: &str,
    renderer: &'a dyn Renderer,
) -> DispatchTargets<'a> {
    DispatchTargets {
        page: page.map(Page::component),
        error_boundary: routes.nearest_error_boundary(path).map(Page::component),
        renderer,
    }
}

/// Split a dispatch error into the redirect loop it carries, if any.
///
/// A fresh dispatcher never reports `AlreadyDispatched`; should it happen,
/// the navigation degrades to the default error page.
pub(crate) fn settle(
    result: Result<Dispatched, DispatchError>,
    logger: &StructuredLogger,
) -> Result<Dispatched, RedirectLoopError> {
    match result {
        Ok(dispatched) => Ok(dispatched),
        Err(DispatchError::RedirectLoop(loop_error)) => {
            logger
                .error_builder("redirect loop")
                .field("error", loop_error.to_string())
                .emit();
            Err(loop_error)
        }
        Err(err @ DispatchError::AlreadyDispatched { .. }) => {
            let message = err.to_string();
            logger.error(&message);
            Ok(Dispatched::ErrorRendered {
                status: 500,
                html: default_error_html(500, &message),
                message,
            })
        }
    }
}
