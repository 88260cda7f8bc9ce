//! Custom tracing layers for Arbor

use tracing::{Subscriber, span};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::context::{SwitchContextData, SwitchContextGuard};

/// Layer that attaches the active switch context to new spans
///
/// Spans opened while a [`SwitchContextGuard`] is alive carry a
/// [`SwitchContextExtension`], so later consumers can tell which switch
/// and which run produced them even when events are recorded elsewhere.
pub struct SwitchContextLayer;

impl SwitchContextLayer {
    /// Create a new switch context layer
    pub fn new() -> Self {
        Self
    }
}

impl Default for SwitchContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct SwitchContextExtension {
    pub data: SwitchContextData,
}

impl<S> Layer<S> for SwitchContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(switch_ctx) = SwitchContextGuard::current() {
                span.extensions_mut()
                    .insert(SwitchContextExtension { data: switch_ctx });
            }
        }
    }
}

/// Create a JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(
    writer: W,
    config: &crate::JsonlConfig,
) -> tracing_subscriber::fmt::Layer<
    S,
    tracing_subscriber::fmt::format::JsonFields,
    tracing_subscriber::fmt::format::Format<tracing_subscriber::fmt::format::Json>,
    W,
>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
}
