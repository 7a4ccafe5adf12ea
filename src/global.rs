//! The process-wide active engine.
//!
//! A single `tracing` layer is registered once; every event it sees is
//! handed to whatever engine currently sits in the slot. Installing a new
//! engine is one atomic pointer store, so a log call either sees the old
//! engine or the new one, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::{Lazy, OnceCell};
use tracing::span::{Attributes, Id, Record};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

use crate::engine::Engine;

static ACTIVE: Lazy<ArcSwap<Engine>> = Lazy::new(|| ArcSwap::from_pointee(Engine::default()));

/// Whether the global `tracing` subscriber carries an [`ActiveLayer`].
static DISPATCH: OnceCell<bool> = OnceCell::new();

/// Swap `engine` in as the active logger.
///
/// The first call also registers the global `tracing` subscriber. If the
/// application already set one, the engine is still swapped in and takes
/// effect wherever [`layer`] was composed.
pub fn install(engine: Engine) -> Arc<Engine> {
    let engine = Arc::new(engine);
    ACTIVE.store(Arc::clone(&engine));
    ensure_dispatch();
    engine
}

/// Snapshot of the active engine.
pub fn active() -> Arc<Engine> {
    ACTIVE.load_full()
}

/// Flush the outputs of the active engine.
pub fn flush() {
    ACTIVE.load().flush();
}

/// A layer that forwards events to the active engine, for applications that
/// build their own subscriber.
pub fn layer() -> ActiveLayer {
    ActiveLayer { _priv: () }
}

fn ensure_dispatch() {
    DISPATCH.get_or_init(|| match tracing_subscriber::registry().with(layer()).try_init() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "global subscriber already set, relying on a composed layer");
            false
        }
    });
}

/// Routes `tracing` events to the active engine.
///
/// The layer must sit directly on a [`Registry`]; span bookkeeping is kept
/// in the registry's extensions by the engine's `fmt` layer.
#[derive(Debug)]
pub struct ActiveLayer {
    _priv: (),
}

impl Layer<Registry> for ActiveLayer {
    // The threshold changes at runtime, so callsites must not be cached.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, Registry>) -> bool {
        ACTIVE.load().is_enabled(metadata)
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, Registry>) {
        ACTIVE.load().on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, Registry>) {
        ACTIVE.load().on_record(id, values, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, Registry>) {
        ACTIVE.load().on_event(event, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use crate::output::testing::Capture;

    #[test]
    fn test_composed_layer_follows_installs() {
        let first = Capture::default();
        let second = Capture::default();

        let subscriber = tracing_subscriber::registry().with(layer());
        tracing::subscriber::with_default(subscriber, || {
            install(Engine::default().with_output(first.fan_out()));
            let span = tracing::info_span!("request");
            let _enter = span.enter();
            tracing::info!("to first");

            install(
                Engine::default()
                    .with_level(Level::Error)
                    .with_output(second.fan_out()),
            );
            tracing::info!("dropped");
            tracing::error!("to second");
        });

        let first = first.text();
        let second = second.text();
        assert!(first.contains("[request]: to first"));
        assert!(!first.contains("second"));
        assert!(!second.contains("dropped"));
        assert!(second.contains("[request]: to second"));
        assert_eq!(active().level(), Level::Error);
    }
}
