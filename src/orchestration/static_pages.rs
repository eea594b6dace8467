//! One sitemap per non-streamed page type.

use super::context::{Admission, RunContext, StepProduct};
use crate::error::PipelineResult;
use crate::models::StaticKind;
use crate::scoring;
use crate::source::RecordFilter;

pub fn step_name(kind: StaticKind) -> String {
    format!("static:{}", kind)
}

/// Writes `sitemap-<kind>.xml`. Blocked pages are left out.
#[tracing::instrument(skip(ctx), fields(run_id = %ctx.run_id))]
pub async fn generate_static(ctx: &RunContext, kind: StaticKind) -> PipelineResult<StepProduct> {
    ctx.write_sitemap_stream(
        RecordFilter::page_type(kind.page_type()),
        &format!("sitemap-{}", kind),
        ctx.config.static_defaults(kind),
        |row| {
            if scoring::score_candidate(row).is_blocked {
                Admission::Blocked
            } else {
                Admission::Admit
            }
        },
    )
    .await
}
