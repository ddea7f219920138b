//! Re-assembly of surviving articles into their tone buckets.

use crate::models::{Article, Task, ToneBin, ToneChart};
use itertools::Itertools;
use tracing::{debug, warn};

/// Build the task's [`ToneChart`] from the service's buckets and the articles
/// that survived fetching and extraction.
///
/// Every bucket keeps the `count` reported by the service. Any articles
/// still attached to `bins` are replaced by the survivors of that bucket.
pub fn aggregate(task: &Task, bins: Vec<ToneBin>, survivors: Vec<Article>) -> ToneChart {
    let mut by_bin = survivors.into_iter().into_group_map_by(|a| a.tone_bin);

    let bins: Vec<ToneBin> = bins
        .into_iter()
        .map(|bin| ToneBin {
            articles: by_bin.remove(&bin.bin_index).unwrap_or_default(),
            ..bin
        })
        .collect();

    for (bin_index, orphans) in by_bin {
        warn!(bin_index, count = orphans.len(), "Articles for unknown tone bin discarded");
    }

    let chart = ToneChart {
        country: task.country.clone(),
        window: task.window,
        bins,
    };
    debug!(
        country = %chart.country,
        window = %chart.window,
        bins = chart.bins.len(),
        articles = chart.article_count(),
        "Aggregated tone chart"
    );
    chart
}
