//! Temperature-bucket sitemaps over the piece universe.

use super::context::{Admission, RunContext, StepProduct};
use crate::error::PipelineResult;
use crate::models::{Bucket, PageType};
use crate::scoring;
use crate::source::RecordFilter;

pub fn step_name(bucket: Bucket) -> String {
    format!("bucket:{}", bucket)
}

pub fn file_stem(bucket: Bucket) -> String {
    format!("sitemap-{}-pieces", bucket)
}

/// Streams pieces cached under `bucket`, re-scoring each one. Rows whose
/// fresh score lands elsewhere are skipped; they surface in their new
/// bucket once the cache is refreshed.
#[tracing::instrument(skip(ctx), fields(run_id = %ctx.run_id))]
pub async fn stream_bucket(ctx: &RunContext, bucket: Bucket) -> PipelineResult<StepProduct> {
    ctx.write_sitemap_stream(
        RecordFilter::page_type(PageType::Piece).bucket(bucket),
        &file_stem(bucket),
        ctx.config.bucket_defaults(bucket),
        |row| {
            let result = scoring::score_candidate(row);
            if result.is_blocked {
                Admission::Blocked
            } else if result.bucket != bucket {
                Admission::BucketMismatch
            } else {
                Admission::Admit
            }
        },
    )
    .await
}
