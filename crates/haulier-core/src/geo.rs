use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Milliseconds per hour; distances are in km and speeds in km/h, so travel
/// times convert through this factor.
pub const HOUR_MS: f64 = 3_600_000.0;

/// A position on the plane, in km.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Scale to unit length; zero stays zero.
    pub fn normalized(self) -> Point {
        let len = self.length();
        if len > 0.0 {
            Point::new(self.x / len, self.y / len)
        } else {
            self
        }
    }

    pub fn clamp_to(self, min: Point, max: Point) -> Point {
        Point::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Straight-line travel time in ms at the given speed. A non-positive speed
/// yields an infinite estimate rather than a panic.
pub fn travel_time_ms(from: Point, to: Point, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return f64::INFINITY;
    }
    from.distance(to) / speed_kmh * HOUR_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_ops() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
        assert_eq!((b - a).length(), 5.0);
        let unit = (b - a).normalized();
        assert!((unit.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_travel_time_units() {
        // 30 km at 60 km/h is half an hour.
        let t = travel_time_ms(Point::new(0.0, 0.0), Point::new(30.0, 0.0), 60.0);
        assert!((t - HOUR_MS / 2.0).abs() < 1e-6);
        assert!(travel_time_ms(Point::default(), Point::new(1.0, 0.0), 0.0).is_infinite());
    }
}
