use prometheus::{Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// Counters for one pipeline instance, exposed in the Prometheus text format.
pub struct PipelineMetrics {
    pub registry: Registry,
    pub tiles_requested_total: IntCounter,
    pub tiles_fetched_total: IntCounter,
    pub tile_fetch_failures_total: IntCounter,
    pub tiles_missing_total: IntCounter,
    pub shapes_merged_total: IntCounter,
    pub points_snapped_total: IntCounter,
    pub points_unmatched_total: IntCounter,
    pub fetch_latency: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("footprint".into()), None)?;

        macro_rules! reg {
            ($m:expr) => {{
                let m = $m?;
                registry.register(Box::new(m.clone()))?;
                m
            }};
        }

        Ok(Self {
            tiles_requested_total: reg!(IntCounter::new(
                "tiles_requested_total",
                "Tile positions requested by combined tile builds"
            )),
            tiles_fetched_total: reg!(IntCounter::new(
                "tiles_fetched_total",
                "Tiles fetched from the tile source and cached"
            )),
            tile_fetch_failures_total: reg!(IntCounter::new(
                "tile_fetch_failures_total",
                "Tile fetches that failed or returned unreadable data"
            )),
            tiles_missing_total: reg!(IntCounter::new(
                "tiles_missing_total",
                "Requested tiles absent from the cache before filling"
            )),
            shapes_merged_total: reg!(IntCounter::new(
                "shapes_merged_total",
                "Buildings reassembled from more than one tile fragment"
            )),
            points_snapped_total: reg!(IntCounter::new(
                "points_snapped_total",
                "Points moved to a building centre"
            )),
            points_unmatched_total: reg!(IntCounter::new(
                "points_unmatched_total",
                "Points that matched no building"
            )),
            fetch_latency: reg!(Histogram::with_opts(
                HistogramOpts::new("tile_fetch_seconds", "Tile source request latency")
                    .buckets(prometheus::exponential_buckets(0.01, 2.0, 12)?)
            )),
            registry,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut out = String::new();
        TextEncoder::new().encode_utf8(&self.registry.gather(), &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_prefixed_counters() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.tiles_fetched_total.inc_by(3);
        metrics.fetch_latency.observe(0.05);

        let text = metrics.render().unwrap();
        assert!(text.contains("footprint_tiles_fetched_total 3"));
        assert!(text.contains("footprint_points_unmatched_total 0"));
        assert!(text.contains("footprint_tile_fetch_seconds_count 1"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = PipelineMetrics::new().unwrap();
        let b = PipelineMetrics::new().unwrap();
        a.points_snapped_total.inc();
        assert_eq!(a.points_snapped_total.get(), 1);
        assert_eq!(b.points_snapped_total.get(), 0);
    }
}
