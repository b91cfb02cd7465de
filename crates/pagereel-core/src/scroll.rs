//! Closed-loop scroll correction.
//!
//! Smooth scrolling on a live page is approximate: lazy-loaded content,
//! sticky headers and late layout shifts move the target while the animation
//! runs. `AutoScroller` closes the loop by re-reading the viewport after each
//! scroll and re-issuing adjustments until the target is framed within
//! tolerance or the iteration budget runs out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::driver::{BoundsLookup, PageDriver};
use crate::error::Result;
use crate::framing::{is_properly_framed, optimal_scroll};
use crate::geometry::{ElementBounds, FramingRule, ScrollResult, Viewport};
use crate::poll::Budget;

/// Iterative scroll corrector over a [`PageDriver`].
pub struct AutoScroller {
    driver: Arc<dyn PageDriver>,
    max_iterations: u32,
    min_adjustment: f64,
    scroll_duration: Duration,
    settle_margin: Duration,
}

impl AutoScroller {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            max_iterations: 5,
            min_adjustment: 5.0,
            scroll_duration: Duration::from_millis(500),
            settle_margin: Duration::from_millis(100),
        }
    }

    /// Cap on correction attempts before giving up.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Deltas smaller than this are treated as already in place.
    pub fn with_min_adjustment(mut self, min_adjustment: f64) -> Self {
        self.min_adjustment = min_adjustment;
        self
    }

    /// Duration of each corrective smooth scroll.
    pub fn with_scroll_duration(mut self, duration: Duration) -> Self {
        self.scroll_duration = duration;
        self
    }

    /// Scroll until `bounds` is framed per `rule`, correcting as needed.
    pub async fn scroll_to_frame(
        &self,
        bounds: &ElementBounds,
        rule: &FramingRule,
    ) -> Result<ScrollResult> {
        self.correct(|viewport| {
            (
                optimal_scroll(bounds, viewport, rule),
                is_properly_framed(bounds, viewport, rule),
            )
        })
        .await
    }

    /// Scroll until the viewport sits within `tolerance` of `target`.
    pub async fn scroll_to_position(&self, target: f64, tolerance: f64) -> Result<ScrollResult> {
        self.correct(|viewport| (target, (viewport.scroll_y - target).abs() <= tolerance))
            .await
    }

    /// Resolve a CSS selector and scroll its element into frame.
    ///
    /// Resolution failures are terminal and consume no iterations.
    pub async fn scroll_to_selector(
        &self,
        selector: &str,
        rule: &FramingRule,
    ) -> Result<ScrollResult> {
        let bounds = match self.driver.element_bounds(selector).await? {
            BoundsLookup::Found(bounds) => bounds,
            BoundsLookup::NotFound => {
                let viewport = self.driver.viewport().await?;
                return Ok(ScrollResult::failed(
                    viewport.scroll_y,
                    Vec::new(),
                    format!("element not found: {selector}"),
                ));
            }
            BoundsLookup::NoBoundingBox => {
                let viewport = self.driver.viewport().await?;
                return Ok(ScrollResult::failed(
                    viewport.scroll_y,
                    Vec::new(),
                    format!("no bounding box for: {selector}"),
                ));
            }
        };
        self.scroll_to_frame(&bounds, rule).await
    }

    /// The correction loop. `target` maps a fresh viewport snapshot to the
    /// optimal scroll position and whether the frame already satisfies the
    /// goal; the target is recomputed every pass so it may move between
    /// iterations.
    async fn correct<F>(&self, target: F) -> Result<ScrollResult>
    where
        F: Fn(&Viewport) -> (f64, bool),
    {
        let mut adjustments = Vec::new();
        let mut viewport = self.driver.viewport().await?;
        let mut budget = Budget::iterations(self.max_iterations);

        while budget.next().await {
            let (optimal, framed) = target(&viewport);
            let delta = optimal - viewport.scroll_y;
            if framed || delta.abs() < self.min_adjustment {
                debug!(
                    position = viewport.scroll_y,
                    iterations = adjustments.len(),
                    "Scroll converged"
                );
                return Ok(ScrollResult::converged(viewport.scroll_y, adjustments));
            }

            debug!(
                iteration = budget.steps(),
                from = viewport.scroll_y,
                delta,
                "Correcting scroll position"
            );
            adjustments.push((viewport.scroll_y, delta));
            self.driver
                .smooth_scroll_to(optimal, self.scroll_duration)
                .await?;
            tokio::time::sleep(self.settle_margin).await;
            viewport = self.driver.viewport().await?;
        }

        warn!(
            max_iterations = self.max_iterations,
            final_position = viewport.scroll_y,
            "Scroll correction exhausted its iteration budget"
        );
        Ok(ScrollResult::failed(
            viewport.scroll_y,
            adjustments,
            format!("not converged after {} iterations", self.max_iterations),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Alignment;
    use crate::testutil::MockPage;

    #[tokio::test(start_paused = true)]
    async fn test_converges_when_page_tracks_target() {
        let page = MockPage::new(4000.0);
        let scroller = AutoScroller::new(page.clone());
        let result = scroller.scroll_to_position(800.0, 30.0).await.unwrap();

        assert!(result.success);
        assert!(result.iterations <= 1);
        assert_eq!(result.iterations as usize, result.adjustments.len());
        assert!((result.final_position - 800.0).abs() <= 30.0);
        assert!(result.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_in_place_needs_no_adjustment() {
        let page = MockPage::new(4000.0);
        page.set_scroll(798.0);
        let scroller = AutoScroller::new(page.clone());
        let result = scroller.scroll_to_position(800.0, 30.0).await.unwrap();

        assert!(result.success);
        assert_eq!(result.iterations, 0);
        assert!(page.scroll_log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_on_frozen_page() {
        let page = MockPage::new(4000.0);
        page.freeze_scroll();
        let scroller = AutoScroller::new(page.clone()).with_max_iterations(3);
        let result = scroller.scroll_to_position(800.0, 30.0).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.adjustments.len(), 3);
        assert!(result.error.as_deref().unwrap().contains("3 iterations"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_to_frame_with_rule() {
        let page = MockPage::new(4000.0);
        let bounds = ElementBounds::new(1400.0, 0.0, 1280.0, 500.0);
        let rule = FramingRule::new(Alignment::Top).with_padding_top(50.0);
        let scroller = AutoScroller::new(page.clone());
        let result = scroller.scroll_to_frame(&bounds, &rule).await.unwrap();

        assert!(result.success);
        // The simulated page lands exactly where asked, so one pass suffices.
        assert!(result.iterations <= 1);
        assert!((result.final_position - 1350.0).abs() <= rule.tolerance);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_to_frame_exhaustion_on_frozen_page() {
        let page = MockPage::new(4000.0);
        page.freeze_scroll();
        let bounds = ElementBounds::new(1400.0, 0.0, 1280.0, 500.0);
        let rule = FramingRule::new(Alignment::Top).with_padding_top(50.0);
        let scroller = AutoScroller::new(page.clone()).with_max_iterations(3);
        let result = scroller.scroll_to_frame(&bounds, &rule).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.iterations, 3);
        // Every attempt targeted the same optimal position.
        assert!(page.scroll_log().iter().all(|&y| y == 1350.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_not_found_fails_fast() {
        let page = MockPage::new(4000.0);
        let scroller = AutoScroller::new(page.clone());
        let rule = FramingRule::new(Alignment::Center);
        let result = scroller.scroll_to_selector("#missing", &rule).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.iterations, 0);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("element not found: #missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_without_box_fails_fast() {
        let page = MockPage::new(4000.0);
        page.set_bounds("#hidden", BoundsLookup::NoBoundingBox);
        let scroller = AutoScroller::new(page.clone());
        let rule = FramingRule::new(Alignment::Center);
        let result = scroller.scroll_to_selector("#hidden", &rule).await.unwrap();

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("no bounding box for: #hidden"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_found_scrolls_into_frame() {
        let page = MockPage::new(4000.0);
        page.set_bounds(
            "#pricing",
            BoundsLookup::Found(ElementBounds::new(1400.0, 0.0, 1280.0, 500.0)),
        );
        let scroller = AutoScroller::new(page.clone());
        let rule = FramingRule::new(Alignment::Top).with_padding_top(0.0);
        let result = scroller.scroll_to_selector("#pricing", &rule).await.unwrap();

        assert!(result.success);
        assert!((result.final_position - 1400.0).abs() <= rule.tolerance);
    }
}
