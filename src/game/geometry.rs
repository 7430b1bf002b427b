//! Collision primitives: circles and axis-aligned rectangles

use glam::DVec2;

use crate::config::{ArenaSettings, NeutralZoneMode};
use crate::ws::protocol::{MapInfo, NeutralZoneInfo};

/// A circle in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: DVec2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: DVec2, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` with its top-left corner at `origin`
    pub fn square(origin: DVec2, size: f64) -> Self {
        Self::new(origin.x, origin.y, size, size)
    }

    /// Rectangle of the given size centred on `center`
    pub fn centered(center: DVec2, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Point of the rectangle (edge or interior) nearest to `point`
    pub fn closest_point(&self, point: DVec2) -> DVec2 {
        DVec2::new(
            point.x.clamp(self.x, self.right()),
            point.y.clamp(self.y, self.bottom()),
        )
    }
}

/// True when the circle touches or overlaps the rectangle.
/// A centre inside the rectangle has distance zero and always intersects.
pub fn circle_rect_intersect(circle: Circle, rect: Rect) -> bool {
    let closest = rect.closest_point(circle.center);
    closest.distance_squared(circle.center) <= circle.radius * circle.radius
}

/// Strict overlap of two rectangles; shared edges do not count
pub fn rect_rect_intersect(a: Rect, b: Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Distance between the two centres
pub fn circle_circle_distance(a: Circle, b: Circle) -> f64 {
    a.center.distance(b.center)
}

/// Circles collide when their centres are closer than the sum of the radii
pub fn circles_overlap(a: Circle, b: Circle) -> bool {
    circle_circle_distance(a, b) < a.radius + b.radius
}

/// Static map layout: bounds plus the optional central neutral zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapGeometry {
    pub bounds: Rect,
    pub neutral_zone: Option<Rect>,
    pub zone_mode: NeutralZoneMode,
}

impl MapGeometry {
    pub fn from_settings(settings: &ArenaSettings) -> Self {
        let bounds = Rect::new(0.0, 0.0, settings.map_width, settings.map_height);
        let neutral_zone = match settings.neutral_zone {
            NeutralZoneMode::None => None,
            _ => Some(Rect::centered(
                bounds.center(),
                settings.neutral_zone_size,
                settings.neutral_zone_size,
            )),
        };
        Self {
            bounds,
            neutral_zone,
            zone_mode: settings.neutral_zone,
        }
    }

    /// The neutral zone when it blocks players and projectiles
    pub fn solid_zone(&self) -> Option<Rect> {
        self.neutral_zone
            .filter(|_| self.zone_mode == NeutralZoneMode::Solid)
    }

    /// The neutral zone when it is reserved for the large tier
    pub fn spawn_area(&self) -> Option<Rect> {
        self.neutral_zone
            .filter(|_| self.zone_mode == NeutralZoneMode::SpawnArea)
    }

    pub fn map_info(&self) -> MapInfo {
        MapInfo {
            width: self.bounds.width,
            height: self.bounds.height,
        }
    }

    pub fn zone_info(&self) -> Option<NeutralZoneInfo> {
        self.neutral_zone.map(|zone| NeutralZoneInfo {
            x: zone.x,
            y: zone.y,
            width: zone.width,
            height: zone.height,
            mode: self.zone_mode,
        })
    }
}
