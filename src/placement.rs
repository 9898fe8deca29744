//! Screen placement policy
//!
//! Pure geometry: given a preferred placement and the visible bounds of a
//! screen, compute a frame that never crosses the screen's usable edges.
//! Nothing here touches a window, so every rule is testable on its own.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, ScreenRect, Size};

/// Which side of an anchor a placed rectangle goes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Above,
    Below,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            other => Err(format!("Invalid direction: {}", other)),
        }
    }
}

/// Distance to keep from the visible screen edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insets {
    /// Applied to both the left and the right edge
    pub horizontal: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Insets {
    /// Bottom status overlay: hugs the bottom edge, stays clear of the top
    pub const OVERLAY: Insets = Insets {
        horizontal: 10.0,
        bottom: 10.0,
        top: 40.0,
    };

    pub const POPUP: Insets = Insets {
        horizontal: 8.0,
        bottom: 8.0,
        top: 8.0,
    };
}

/// Where a rectangle would like to be before clamping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Horizontally centered on `anchor`, `gap` points away from it vertically
    Anchored {
        anchor: ScreenRect,
        gap: f64,
        direction: Direction,
    },
    /// Horizontally centered on the screen, `offset` points above its bottom edge
    BottomCenter { offset: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPolicy {
    pub placement: Placement,
    pub insets: Insets,
}

impl PlacementPolicy {
    pub fn anchored(anchor: ScreenRect, gap: f64, direction: Direction) -> Self {
        Self {
            placement: Placement::Anchored {
                anchor,
                gap,
                direction,
            },
            insets: Insets::POPUP,
        }
    }

    pub fn bottom_center(offset: f64) -> Self {
        Self {
            placement: Placement::BottomCenter { offset },
            insets: Insets::OVERLAY,
        }
    }

    /// Unclamped rectangle for `size`.
    ///
    /// A bottom-centered placement without a screen has nothing to center on
    /// and is centered on the global origin instead.
    pub fn preferred(&self, size: Size, screen: Option<&ScreenRect>) -> ScreenRect {
        let origin = match self.placement {
            Placement::Anchored {
                anchor,
                gap,
                direction,
            } => {
                let x = anchor.mid_x() - size.width / 2.0;
                let y = match direction {
                    Direction::Above => anchor.max_y() + gap,
                    Direction::Below => anchor.min_y() - gap - size.height,
                };
                Point::new(x, y)
            }
            Placement::BottomCenter { offset } => match screen {
                Some(visible) => Point::new(visible.mid_x() - size.width / 2.0, visible.min_y() + offset),
                None => Point::new(-size.width / 2.0, offset),
            },
        };
        ScreenRect::from_origin_size(origin, size)
    }

    /// Final frame for `size` on the screen whose visible bounds are `screen`.
    ///
    /// Without a usable screen the preferred rectangle is returned as is.
    pub fn place(&self, size: Size, screen: Option<ScreenRect>) -> ScreenRect {
        let preferred = self.preferred(size, screen.as_ref());
        let Some(visible) = screen.filter(is_usable) else {
            return preferred;
        };

        let x = clamp_axis(
            preferred.min_x(),
            size.width,
            visible.min_x(),
            visible.max_x(),
            self.insets.horizontal,
            self.insets.horizontal,
        );
        let y = clamp_axis(
            preferred.min_y(),
            size.height,
            visible.min_y(),
            visible.max_y(),
            self.insets.bottom,
            self.insets.top,
        );

        ScreenRect::from_origin_size(Point::new(x, y), size)
    }
}

fn is_usable(screen: &ScreenRect) -> bool {
    !screen.is_degenerate()
        && screen.origin.x.is_finite()
        && screen.origin.y.is_finite()
        && screen.size.width.is_finite()
        && screen.size.height.is_finite()
}

/// Slide `origin` so `[origin, origin + length]` stays within
/// `[min + low, max - high]`, or pin it to `min + low` when it cannot fit.
fn clamp_axis(origin: f64, length: f64, min: f64, max: f64, low: f64, high: f64) -> f64 {
    let available = (max - min) - low - high;
    if length < available {
        let lo = min + low;
        let hi = max - high - length;
        if origin.is_nan() { lo } else { origin.clamp(lo, hi) }
    } else {
        min + low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn screen() -> ScreenRect {
        ScreenRect::new(0.0, 0.0, 1440.0, 900.0)
    }

    #[test]
    fn test_anchored_centers_on_anchor() {
        let anchor = ScreenRect::new(600.0, 400.0, 200.0, 30.0);
        let policy = PlacementPolicy::anchored(anchor, 6.0, Direction::Above);
        let frame = policy.place(Size::new(180.0, 120.0), Some(screen()));
        assert_eq!(frame.origin, Point::new(610.0, 436.0));
    }

    #[test]
    fn test_popup_off_bottom_edge_is_pinned_to_inset() {
        // Raw y = 50 - 6 - 120 = -76 which is off screen
        let anchor = ScreenRect::new(100.0, 50.0, 200.0, 30.0);
        let policy = PlacementPolicy::anchored(anchor, 6.0, Direction::Below);

        let preferred = policy.preferred(Size::new(180.0, 120.0), None);
        assert_eq!(preferred.origin, Point::new(110.0, -76.0));

        let frame = policy.place(Size::new(180.0, 120.0), Some(screen()));
        assert_eq!(frame.origin.x, 110.0);
        assert_eq!(frame.origin.y, screen().min_y() + Insets::POPUP.bottom);
    }

    #[test]
    fn test_bottom_center_offset_within_bounds() {
        let visible = ScreenRect::new(0.0, 0.0, 1440.0, 850.0);
        let policy = PlacementPolicy::bottom_center(200.0);
        let frame = policy.place(Size::new(400.0, 80.0), Some(visible));
        assert_eq!(frame.origin.y, 200.0);
        assert_eq!(frame.origin.x, 520.0);
    }

    #[test]
    fn test_bottom_center_offset_clamped_below_top_inset() {
        let visible = ScreenRect::new(0.0, 0.0, 1440.0, 850.0);
        let policy = PlacementPolicy::bottom_center(5000.0);
        let frame = policy.place(Size::new(400.0, 80.0), Some(visible));
        assert_eq!(frame.origin.y, 850.0 - 40.0 - 80.0);
    }

    #[test]
    fn test_negative_offset_clamped_to_bottom_inset() {
        let visible = ScreenRect::new(0.0, 25.0, 1440.0, 850.0);
        let policy = PlacementPolicy::bottom_center(-300.0);
        let frame = policy.place(Size::new(400.0, 80.0), Some(visible));
        assert_eq!(frame.origin.y, 35.0);
    }

    #[test]
    fn test_oversized_rect_is_pinned_to_left_inset() {
        let policy = PlacementPolicy::bottom_center(0.0);
        let frame = policy.place(Size::new(2000.0, 80.0), Some(screen()));
        assert_eq!(frame.origin.x, Insets::OVERLAY.horizontal);
    }

    #[test]
    fn test_anchor_near_right_edge_slides_left() {
        let anchor = ScreenRect::new(1400.0, 400.0, 40.0, 30.0);
        let policy = PlacementPolicy::anchored(anchor, 6.0, Direction::Above);
        let frame = policy.place(Size::new(180.0, 120.0), Some(screen()));
        assert_eq!(frame.max_x(), 1440.0 - Insets::POPUP.horizontal);
    }

    #[test]
    fn test_no_screen_returns_preferred() {
        let anchor = ScreenRect::new(-5000.0, -5000.0, 10.0, 10.0);
        let policy = PlacementPolicy::anchored(anchor, 6.0, Direction::Above);
        let size = Size::new(100.0, 100.0);
        assert_eq!(policy.place(size, None), policy.preferred(size, None));
    }

    #[test]
    fn test_degenerate_screen_treated_as_missing() {
        let anchor = ScreenRect::new(-5000.0, -5000.0, 10.0, 10.0);
        let policy = PlacementPolicy::anchored(anchor, 6.0, Direction::Above);
        let size = Size::new(100.0, 100.0);
        let frame = policy.place(size, Some(ScreenRect::ZERO));
        assert_eq!(frame, policy.preferred(size, None));
    }

    #[test]
    fn test_secondary_screen_with_negative_origin() {
        let visible = ScreenRect::new(-1920.0, 0.0, 1920.0, 1080.0);
        let policy = PlacementPolicy::bottom_center(0.0);
        let frame = policy.place(Size::new(400.0, 60.0), Some(visible));
        assert!(visible.inset(10.0, 10.0, 40.0).contains_rect(&frame));
        assert_eq!(frame.mid_x(), -960.0);
    }

    proptest! {
        #[test]
        fn prop_placed_rect_stays_inside_inset_bounds(
            sx in -4000.0f64..4000.0,
            sy in -2000.0f64..2000.0,
            sw in 200.0f64..5000.0,
            sh in 200.0f64..3000.0,
            ax in -10000.0f64..10000.0,
            ay in -10000.0f64..10000.0,
            aw in 0.0f64..500.0,
            ah in 0.0f64..200.0,
            w_frac in 0.01f64..0.99,
            h_frac in 0.01f64..0.99,
            gap in 0.0f64..40.0,
            below in any::<bool>(),
        ) {
            let visible = ScreenRect::new(sx, sy, sw, sh);
            let direction = if below { Direction::Below } else { Direction::Above };
            let policy = PlacementPolicy::anchored(ScreenRect::new(ax, ay, aw, ah), gap, direction);
            let insets = policy.insets;
            let bounds = visible.inset(insets.horizontal, insets.bottom, insets.top);
            let size = Size::new(bounds.width() * w_frac, bounds.height() * h_frac);

            let frame = policy.place(size, Some(visible));
            prop_assert!(bounds.contains_rect(&frame), "{} not inside {}", frame, bounds);
            prop_assert_eq!(frame.size, size);
        }

        #[test]
        fn prop_bottom_center_stays_inside_inset_bounds(
            sw in 200.0f64..5000.0,
            sh in 200.0f64..3000.0,
            offset in -5000.0f64..5000.0,
            w_frac in 0.01f64..0.99,
            h_frac in 0.01f64..0.99,
        ) {
            let visible = ScreenRect::new(0.0, 23.0, sw, sh);
            let policy = PlacementPolicy::bottom_center(offset);
            let bounds = visible.inset(Insets::OVERLAY.horizontal, Insets::OVERLAY.bottom, Insets::OVERLAY.top);
            let size = Size::new(bounds.width() * w_frac, bounds.height() * h_frac);

            let frame = policy.place(size, Some(visible));
            prop_assert!(bounds.contains_rect(&frame), "{} not inside {}", frame, bounds);
        }
    }
}
