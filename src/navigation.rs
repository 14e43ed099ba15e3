//! Navigable surface used to constrain knockback.
//!
//! A [`NavigationBounds`] is a flat walkable rectangle on the XZ plane at a
//! fixed height, with rectangular holes ([`NavWall`]) cut out for walls and
//! pillars. Positions are kept `edge_margin` inside the outer edge.
//!
//! Agents bind to a surface through [`NavAgent`]. Anything that warps an
//! agent (knockback) suspends its steering and restores it afterwards.
//!
//! ```rust
//! use bevy::prelude::*;
//! use pogo_character_controller::navigation::*;
//!
//! let bounds = NavigationBounds::new(Vec2::splat(-10.0), Vec2::splat(10.0), 0.0)
//!     .with_wall(Vec2::new(2.0, -10.0), Vec2::new(3.0, 10.0));
//!
//! // The wall blocks a path crossing it.
//! let hit = bounds.raycast(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0));
//! assert!(hit.is_some());
//! ```

use bevy::prelude::*;

/// Where a navigation raycast was blocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavHit {
    /// Last walkable point along the ray.
    pub position: Vec3,
    /// Horizontal normal of the blocking edge.
    pub normal: Vec3,
    pub distance: f32,
}

/// Queries against a navigable surface.
pub trait NavSurface {
    /// Nearest walkable point within `max_distance` of `point`.
    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3>;

    /// Walk the surface from `from` toward `to`; `Some` if an edge or wall blocks the way.
    fn raycast(&self, from: Vec3, to: Vec3) -> Option<NavHit>;
}

/// Rectangular hole in a navigable surface.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct NavWall {
    pub min: Vec2,
    pub max: Vec2,
}

impl NavWall {
    pub fn contains(&self, point: Vec2) -> bool {
        point.x > self.min.x && point.x < self.max.x && point.y > self.min.y && point.y < self.max.y
    }
}

/// Component defining a walkable area.
#[derive(Component, Clone, Debug, Reflect)]
pub struct NavigationBounds {
    /// Minimum XZ corner.
    pub min: Vec2,
    /// Maximum XZ corner.
    pub max: Vec2,
    /// Height (Y) of the walkable plane.
    pub height: f32,
    /// Safety margin from the outer edge.
    pub edge_margin: f32,
    pub walls: Vec<NavWall>,
}

impl Default for NavigationBounds {
    fn default() -> Self {
        Self {
            min: Vec2::splat(-50.0),
            max: Vec2::splat(50.0),
            height: 0.0,
            edge_margin: 0.0,
            walls: Vec::new(),
        }
    }
}

fn flat(point: Vec3) -> Vec2 {
    Vec2::new(point.x, point.z)
}

impl NavigationBounds {
    pub fn new(min: Vec2, max: Vec2, height: f32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            height,
            ..default()
        }
    }

    /// Builder: keep positions this far inside the outer edge.
    pub fn with_edge_margin(mut self, margin: f32) -> Self {
        self.edge_margin = margin.max(0.0);
        self
    }

    /// Builder: cut a wall out of the surface.
    pub fn with_wall(mut self, min: Vec2, max: Vec2) -> Self {
        self.walls.push(NavWall {
            min: min.min(max),
            max: min.max(max),
        });
        self
    }

    fn inner_min(&self) -> Vec2 {
        (self.min + Vec2::splat(self.edge_margin)).min(self.max)
    }

    fn inner_max(&self) -> Vec2 {
        (self.max - Vec2::splat(self.edge_margin)).max(self.inner_min())
    }

    /// Whether the XZ position is walkable (inside the margin, outside every wall).
    pub fn contains(&self, pos: Vec3) -> bool {
        let p = flat(pos);
        let (lo, hi) = (self.inner_min(), self.inner_max());
        p.x >= lo.x && p.x <= hi.x && p.y >= lo.y && p.y <= hi.y && !self.walls.iter().any(|w| w.contains(p))
    }

    /// Project a position onto the nearest walkable point of the surface.
    pub fn clamp_to_surface(&self, pos: Vec3) -> Vec3 {
        let (lo, hi) = (self.inner_min(), self.inner_max());
        let mut p = flat(pos).clamp(lo, hi);

        for wall in &self.walls {
            if !wall.contains(p) {
                continue;
            }
            // Push out through the closest wall edge that stays on the surface.
            let exits = [
                (p.x - wall.min.x, Vec2::new(wall.min.x, p.y)),
                (wall.max.x - p.x, Vec2::new(wall.max.x, p.y)),
                (p.y - wall.min.y, Vec2::new(p.x, wall.min.y)),
                (wall.max.y - p.y, Vec2::new(p.x, wall.max.y)),
            ];
            if let Some((_, exit)) = exits
                .iter()
                .filter(|(_, exit)| exit.cmpge(lo).all() && exit.cmple(hi).all())
                .min_by(|a, b| a.0.total_cmp(&b.0))
            {
                p = *exit;
            }
        }

        Vec3::new(p.x, self.height, p.y)
    }

    /// First parameter in `0..=1` where the segment `a -> b` leaves the walkable area.
    fn blocking_param(&self, a: Vec2, b: Vec2) -> Option<(f32, Vec2)> {
        let d = b - a;
        let (lo, hi) = (self.inner_min(), self.inner_max());
        let mut best: Option<(f32, Vec2)> = None;
        let mut consider = |t: f32, normal: Vec2| {
            if (0.0..=1.0).contains(&t) && best.is_none_or(|(bt, _)| t < bt) {
                best = Some((t, normal));
            }
        };

        // Leaving the outer rectangle.
        if d.x > 0.0 && b.x > hi.x {
            consider((hi.x - a.x) / d.x, Vec2::NEG_X);
        }
        if d.x < 0.0 && b.x < lo.x {
            consider((lo.x - a.x) / d.x, Vec2::X);
        }
        if d.y > 0.0 && b.y > hi.y {
            consider((hi.y - a.y) / d.y, Vec2::NEG_Y);
        }
        if d.y < 0.0 && b.y < lo.y {
            consider((lo.y - a.y) / d.y, Vec2::Y);
        }

        // Entering a wall (slab test).
        for wall in &self.walls {
            let mut t_enter = 0.0_f32;
            let mut t_exit = 1.0_f32;
            let mut normal = Vec2::ZERO;
            let mut hit = true;
            for axis in 0..2 {
                let (origin, delta, min, max) = (a[axis], d[axis], wall.min[axis], wall.max[axis]);
                if delta.abs() < f32::EPSILON {
                    if origin <= min || origin >= max {
                        hit = false;
                        break;
                    }
                    continue;
                }
                let (mut t0, mut t1) = ((min - origin) / delta, (max - origin) / delta);
                let mut n = Vec2::ZERO;
                n[axis] = -delta.signum();
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                if t0 > t_enter {
                    t_enter = t0;
                    normal = n;
                }
                t_exit = t_exit.min(t1);
                if t_enter > t_exit {
                    hit = false;
                    break;
                }
            }
            if hit && t_exit > 0.0 {
                consider(t_enter, normal);
            }
        }

        best
    }
}

impl NavSurface for NavigationBounds {
    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        let sampled = self.clamp_to_surface(point);
        (sampled.distance(point) <= max_distance).then_some(sampled)
    }

    fn raycast(&self, from: Vec3, to: Vec3) -> Option<NavHit> {
        let (a, b) = (flat(from), flat(to));
        if !self.contains(from) {
            return Some(NavHit {
                position: Vec3::new(a.x, self.height, a.y),
                normal: Vec3::ZERO,
                distance: 0.0,
            });
        }
        let (t, normal) = self.blocking_param(a, b)?;
        let p = a.lerp(b, t);
        Some(NavHit {
            position: Vec3::new(p.x, self.height, p.y),
            normal: Vec3::new(normal.x, 0.0, normal.y),
            distance: a.distance(b) * t,
        })
    }
}

/// Binds an entity to a navigable surface and exposes its steering switches.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct NavAgent {
    /// Entity holding the [`NavigationBounds`] this agent walks on.
    pub surface: Option<Entity>,
    /// Whether autonomous steering may move the agent.
    pub steering_enabled: bool,
    pub avoidance_enabled: bool,
}

impl Default for NavAgent {
    fn default() -> Self {
        Self {
            surface: None,
            steering_enabled: true,
            avoidance_enabled: true,
        }
    }
}

impl NavAgent {
    pub fn on(surface: Entity) -> Self {
        Self {
            surface: Some(surface),
            ..default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> NavigationBounds {
        NavigationBounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0), 1.0).with_edge_margin(10.0)
    }

    #[test]
    fn test_bounds_contains_with_margin() {
        let bounds = arena();
        assert!(bounds.contains(Vec3::new(50.0, 0.0, 50.0)));
        assert!(bounds.contains(Vec3::new(10.0, 5.0, 90.0)));
        assert!(!bounds.contains(Vec3::new(5.0, 0.0, 50.0)));
        assert!(!bounds.contains(Vec3::new(50.0, 0.0, 95.0)));
    }

    #[test]
    fn test_clamp_to_surface() {
        let bounds = arena();
        assert_eq!(bounds.clamp_to_surface(Vec3::new(50.0, 7.0, 50.0)), Vec3::new(50.0, 1.0, 50.0));
        assert_eq!(bounds.clamp_to_surface(Vec3::new(-50.0, 1.0, 50.0)), Vec3::new(10.0, 1.0, 50.0));
        assert_eq!(bounds.clamp_to_surface(Vec3::new(50.0, 1.0, 150.0)), Vec3::new(50.0, 1.0, 90.0));
    }

    #[test]
    fn test_clamp_pushes_out_of_walls() {
        let bounds = arena().with_wall(Vec2::new(40.0, 40.0), Vec2::new(60.0, 60.0));
        let clamped = bounds.clamp_to_surface(Vec3::new(42.0, 1.0, 50.0));
        assert_eq!(clamped, Vec3::new(40.0, 1.0, 50.0));
        assert!(!bounds.walls[0].contains(flat(clamped)));
    }

    #[test]
    fn test_sample_position_respects_distance() {
        let bounds = arena();
        assert!(bounds.sample_position(Vec3::new(50.0, 1.5, 50.0), 1.0).is_some());
        assert!(bounds.sample_position(Vec3::new(5.0, 1.0, 50.0), 1.0).is_none());
        assert!(bounds.sample_position(Vec3::new(5.0, 1.0, 50.0), 6.0).is_some());
    }

    #[test]
    fn test_raycast_clear_path() {
        let bounds = arena();
        assert!(bounds.raycast(Vec3::new(20.0, 1.0, 20.0), Vec3::new(80.0, 1.0, 80.0)).is_none());
    }

    #[test]
    fn test_raycast_stops_at_edge() {
        let bounds = arena();
        let hit = bounds
            .raycast(Vec3::new(50.0, 1.0, 50.0), Vec3::new(150.0, 1.0, 50.0))
            .expect("edge should block");
        assert!((hit.position.x - 90.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec3::NEG_X);
        assert!((hit.distance - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_raycast_stops_at_wall() {
        let bounds = arena().with_wall(Vec2::new(60.0, 0.0), Vec2::new(62.0, 100.0));
        let hit = bounds
            .raycast(Vec3::new(50.0, 1.0, 50.0), Vec3::new(70.0, 1.0, 50.0))
            .expect("wall should block");
        assert!((hit.position.x - 60.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec3::NEG_X);

        // Parallel to the wall and beside it.
        assert!(bounds.raycast(Vec3::new(50.0, 1.0, 20.0), Vec3::new(50.0, 1.0, 80.0)).is_none());
    }

    #[test]
    fn test_raycast_from_off_surface() {
        let bounds = arena();
        let hit = bounds.raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::new(50.0, 1.0, 50.0));
        assert_eq!(hit.map(|h| h.distance), Some(0.0));
    }

    #[test]
    fn test_agent_defaults_to_steering() {
        let agent = NavAgent::default();
        assert!(agent.steering_enabled);
        assert!(agent.avoidance_enabled);
        assert!(agent.surface.is_none());
    }
}
