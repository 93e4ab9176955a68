use std::future::Future;
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use tracing_subscriber::{EnvFilter, prelude::*};

pub mod mock;

pub use mock::{GatedCall, MockCall, MockListService, Pet, pets};

static LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per test binary.
///
/// Honors `RUST_LOG`; defaults to warnings from the dashboard so failed
/// calls show up next to a failing assertion.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("error,dashboard=warn"));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .without_time();

        // another harness may already own the global subscriber
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();

        tracing::debug!("Initialized test logs");
    });
}

/// Yield once to the executor so sibling futures in a `join!` get polled.
pub fn yield_now() -> impl Future<Output = ()> {
    YieldNow { yielded: false }
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
