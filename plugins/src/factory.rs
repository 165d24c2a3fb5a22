use std::sync::Arc;

use anyhow::{Context, Result};

use arbor_core::config::{FilterConfig, OrderConfig, OrderStrategy, ReportConfig, ReportFormat};
use arbor_core::scheduler::{ChildOrder, IncludeAll, NodeFilter, NodeLifecycle, StructuralOrder};
use uuid::Uuid;

use crate::filter::PatternFilter;
use crate::order::{ReverseOrder, SeededShuffle};
use crate::reporter::{JsonlReporter, TextReporter};

pub fn build_child_order(cfg: &OrderConfig) -> Arc<dyn ChildOrder> {
    match cfg.strategy {
        OrderStrategy::Structural => Arc::new(StructuralOrder),
        OrderStrategy::Reverse => Arc::new(ReverseOrder),
        OrderStrategy::Random => {
            let seed = cfg.seed.unwrap_or_else(|| Uuid::new_v4().as_u128() as u64);
            // Logged so a failing order can be replayed with --seed.
            tracing::info!(seed, "random child order");
            Arc::new(SeededShuffle::new(seed))
        }
    }
}

pub fn build_filter(cfg: &FilterConfig) -> Result<Arc<dyn NodeFilter>> {
    match cfg.pattern.as_deref().map(str::trim) {
        Some(pattern) if !pattern.is_empty() => {
            let filter = PatternFilter::new(pattern)
                .with_context(|| format!("invalid filter pattern: {pattern}"))?;
            Ok(Arc::new(filter))
        }
        _ => Ok(Arc::new(IncludeAll)),
    }
}

pub fn build_lifecycle(cfg: &ReportConfig, run_id: &str) -> Arc<dyn NodeLifecycle> {
    match cfg.format {
        ReportFormat::Jsonl => Arc::new(JsonlReporter::new(run_id)),
        ReportFormat::Text => Arc::new(TextReporter::new(cfg.verbose)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::node::BasicTask;

    #[test]
    fn test_build_filter() {
        let none = build_filter(&FilterConfig::default()).unwrap();
        let blank = build_filter(&FilterConfig {
            pattern: Some("  ".into()),
        })
        .unwrap();
        let task = BasicTask::new("slow test", |_| Ok(()));
        assert!(!none.excludes(&task));
        assert!(!blank.excludes(&task));

        let fast_only = build_filter(&FilterConfig {
            pattern: Some("fast".into()),
        })
        .unwrap();
        assert!(fast_only.excludes(&task));

        let err = build_filter(&FilterConfig {
            pattern: Some("[".into()),
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("invalid filter pattern"));
    }
}
