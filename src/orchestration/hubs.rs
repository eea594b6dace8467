//! Hub collection across all configured groups.

use super::context::RunContext;
use crate::error::SourceError;
use crate::hub::{collect_group, CollectedGroup, HubGroupDef};
use crate::source::RecordSource;
use std::collections::VecDeque;
use tokio::task::JoinHandle;

type Collected = Result<CollectedGroup, SourceError>;

/// Collects hub groups ahead of the writer, handing them back in config
/// order. At most `window` groups are in flight or waiting at any time, so
/// memory is bounded by the window rather than by the whole hub config.
pub struct HubPrefetch {
    source: RecordSource,
    page_size: usize,
    window: usize,
    upcoming: VecDeque<HubGroupDef>,
    in_flight: VecDeque<(HubGroupDef, JoinHandle<Collected>)>,
}

impl HubPrefetch {
    pub fn start(ctx: &RunContext, groups: &[HubGroupDef]) -> Self {
        let mut prefetch = Self {
            source: ctx.source.clone(),
            page_size: ctx.config.limits.fetch_page_size,
            window: ctx.config.limits.max_concurrent_fetches.max(1),
            upcoming: groups.iter().cloned().collect(),
            in_flight: VecDeque::new(),
        };
        prefetch.refill();
        prefetch
    }

    fn refill(&mut self) {
        while self.in_flight.len() < self.window {
            let Some(def) = self.upcoming.pop_front() else {
                break;
            };
            let source = self.source.clone();
            let page_size = self.page_size;
            let task_def = def.clone();
            let handle = tokio::spawn(async move { collect_group(&source, &task_def, page_size).await });
            self.in_flight.push_back((def, handle));
        }
    }

    /// Next group in config order, `None` once every group was handed out.
    pub async fn next(&mut self) -> Option<(HubGroupDef, Collected)> {
        let (def, handle) = self.in_flight.pop_front()?;
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(group = %def.step_name(), error = %e, "hub collection task panicked");
                Err(SourceError::unavailable(0, format!("collection task failed: {}", e)))
            }
        };
        self.refill();
        Some((def, result))
    }

    /// Groups collected or being collected but not handed out yet.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}

impl Drop for HubPrefetch {
    fn drop(&mut self) {
        for (_, handle) in &self.in_flight {
            handle.abort();
        }
    }
}
