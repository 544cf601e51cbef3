//! Collision detection and response.
//!
//! [`collision_system`] tests every unordered pair of shapes once per tick.
//! A pair is only considered when at least one of the two is a body and
//! neither is degenerate. Overlapping pairs are recorded in [`Contacts`]; the
//! world later runs the collision callbacks of both shapes from that list.
//!
//! Only dynamic shapes (`physics` and `is_body` both set) are moved by the
//! response. A static shape, body or not, blocks a dynamic one but stays put.
//!
//! Detection is discrete (no sweeping), so a shape moving further than its
//! own size in one tick can tunnel through thin geometry.

use bevy_ecs::prelude::*;

use crate::components::shape::{Shape, ShapeId, ShapeKind};
use crate::math::{Vector2, normalize_or};

const EPSILON: f64 = 1e-9;

/// Overlap between two shapes: push `b` along `normal` by `penetration` (or
/// `a` the opposite way) to separate them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    /// Unit vector pointing from `a` towards `b`.
    pub normal: Vector2,
    pub penetration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: ShapeId,
    pub b: ShapeId,
    pub normal: Vector2,
    pub penetration: f64,
}

/// Contacts found by the last collision pass.
#[derive(Resource, Debug, Default)]
pub struct Contacts {
    list: Vec<Contact>,
}

impl Contacts {
    pub fn push(&mut self, contact: Contact) {
        self.list.push(contact);
    }
    pub fn clear(&mut self) {
        self.list.clear();
    }
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.list.iter()
    }
    pub fn len(&self) -> usize {
        self.list.len()
    }
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
    /// True if `a` and `b` touched, in either order.
    pub fn involves(&self, a: ShapeId, b: ShapeId) -> bool {
        self.list
            .iter()
            .any(|c| (c.a == a && c.b == b) || (c.a == b && c.b == a))
    }
}

pub fn collision_system(mut query: Query<(Entity, &mut Shape)>, mut contacts: ResMut<Contacts>) {
    contacts.clear();

    let mut combos = query.iter_combinations_mut();
    while let Some([(entity_a, mut shape_a), (entity_b, mut shape_b)]) = combos.fetch_next() {
        if !(shape_a.is_body || shape_b.is_body) {
            continue;
        }
        if shape_a.is_degenerate() || shape_b.is_degenerate() {
            continue;
        }
        let Some(manifold) = detect(&shape_a, &shape_b) else {
            continue;
        };
        resolve(&mut shape_a, &mut shape_b, &manifold);
        contacts.push(Contact {
            a: ShapeId::from_entity(entity_a),
            b: ShapeId::from_entity(entity_b),
            normal: manifold.normal,
            penetration: manifold.penetration,
        });
    }
}

/// Overlap test for any pair of shapes. Touching edges do not count.
pub fn detect(a: &Shape, b: &Shape) -> Option<Manifold> {
    match (a.kind(), b.kind()) {
        (ShapeKind::Rectangle { .. }, ShapeKind::Rectangle { .. }) => {
            let (a_min, a_max) = a.aabb();
            let (b_min, b_max) = b.aabb();
            rect_rect(a_min, a_max, b_min, b_max)
        }
        (ShapeKind::Circle { radius: ra }, ShapeKind::Circle { radius: rb }) => {
            circle_circle(a.position, ra, b.position, rb)
        }
        (ShapeKind::Rectangle { .. }, ShapeKind::Circle { radius }) => {
            let (min, max) = a.aabb();
            rect_circle(min, max, b.position, radius)
        }
        (ShapeKind::Circle { radius }, ShapeKind::Rectangle { .. }) => {
            let (min, max) = b.aabb();
            rect_circle(min, max, a.position, radius).map(|m| Manifold {
                normal: -m.normal,
                ..m
            })
        }
    }
}

/// Separate along the axis of least overlap.
pub fn rect_rect(a_min: Vector2, a_max: Vector2, b_min: Vector2, b_max: Vector2) -> Option<Manifold> {
    let overlap_x = a_max.x.min(b_max.x) - a_min.x.max(b_min.x);
    let overlap_y = a_max.y.min(b_max.y) - a_min.y.max(b_min.y);
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }
    let delta = (b_min + b_max) * 0.5 - (a_min + a_max) * 0.5;
    if overlap_x < overlap_y {
        Some(Manifold {
            normal: Vector2::new(sign(delta.x), 0.0),
            penetration: overlap_x,
        })
    } else {
        Some(Manifold {
            normal: Vector2::new(0.0, sign(delta.y)),
            penetration: overlap_y,
        })
    }
}

/// Coincident centers separate along +x.
pub fn circle_circle(a: Vector2, ra: f64, b: Vector2, rb: f64) -> Option<Manifold> {
    let delta = b - a;
    let radii = ra + rb;
    let dist_sq = delta.length_squared();
    if dist_sq >= radii * radii {
        return None;
    }
    let dist = dist_sq.sqrt();
    Some(Manifold {
        normal: normalize_or(delta, Vector2::X),
        penetration: radii - dist,
    })
}

/// Normal points from the rectangle to the circle.
pub fn rect_circle(min: Vector2, max: Vector2, center: Vector2, radius: f64) -> Option<Manifold> {
    let closest = center.clamp(min, max);
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > EPSILON * EPSILON {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some(Manifold {
            normal: delta / dist,
            penetration: radius - dist,
        });
    }

    // Center inside the rectangle: leave through the nearest edge.
    let edges = [
        (center.x - min.x, Vector2::NEG_X),
        (max.x - center.x, Vector2::X),
        (center.y - min.y, Vector2::NEG_Y),
        (max.y - center.y, Vector2::Y),
    ];
    let (depth, normal) = edges
        .into_iter()
        .fold(edges[0], |best, edge| if edge.0 < best.0 { edge } else { best });
    Some(Manifold {
        normal,
        penetration: depth + radius,
    })
}

/// Push the pair apart and exchange impulses.
///
/// Restitution is the larger of the two rebounds, friction the geometric
/// mean of the two coefficients. Only unlocked circles pick up spin.
pub fn resolve(a: &mut Shape, b: &mut Shape, manifold: &Manifold) {
    let inv_a = a.inverse_mass();
    let inv_b = b.inverse_mass();
    let inv_total = inv_a + inv_b;
    if inv_total <= 0.0 {
        return;
    }
    let normal = manifold.normal;

    let correction = normal * (manifold.penetration / inv_total);
    a.position -= correction * inv_a;
    b.position += correction * inv_b;

    let relative = b.velocity - a.velocity;
    let approach = relative.dot(normal);
    if approach >= 0.0 {
        return;
    }

    let restitution = a.rebound.max(b.rebound).clamp(0.0, 1.0);
    let j = -(1.0 + restitution) * approach / inv_total;
    let impulse = normal * j;
    a.velocity -= impulse * inv_a;
    b.velocity += impulse * inv_b;

    let relative = b.velocity - a.velocity;
    let tangential = relative - normal * relative.dot(normal);
    let Some(tangent) = tangential.try_normalize() else {
        return;
    };
    let mu = (a.friction.max(0.0) * b.friction.max(0.0)).sqrt();
    let jt = (-relative.dot(tangent) / inv_total).clamp(-j * mu, j * mu);
    let friction = tangent * jt;
    a.velocity -= friction * inv_a;
    b.velocity += friction * inv_b;

    // Torque from the friction impulse at each contact point.
    a.angular_velocity += (normal * contact_arm(a)).perp_dot(-friction) * a.inverse_inertia();
    b.angular_velocity += (-normal * contact_arm(b)).perp_dot(friction) * b.inverse_inertia();
}

fn contact_arm(shape: &Shape) -> f64 {
    match shape.kind() {
        ShapeKind::Circle { radius } => radius,
        ShapeKind::Rectangle { .. } => 0.0,
    }
}

fn sign(v: f64) -> f64 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::shape::{ShapeProps, ShapeType};

    const TOLERANCE: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn body_circle(x: f64, y: f64, radius: f64) -> Shape {
        Shape::new(ShapeProps {
            shape_type: ShapeType::Circle,
            x,
            y,
            radius,
            mass: 1.0,
            physics: true,
            is_body: true,
            ..Default::default()
        })
    }

    fn wall(x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::new(ShapeProps {
            x,
            y,
            width: w,
            height: h,
            is_body: true,
            ..Default::default()
        })
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(collision_system);
        schedule.run(world);
    }

    #[test]
    fn test_rect_rect_minimum_axis() {
        let m = rect_rect(
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(8.0, 1.0),
            Vector2::new(18.0, 11.0),
        )
        .unwrap();
        assert_eq!(m.normal, Vector2::X);
        assert!(approx_eq(m.penetration, 2.0));

        let touching = rect_rect(
            Vector2::ZERO,
            Vector2::new(10.0, 10.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(20.0, 10.0),
        );
        assert!(touching.is_none());
    }

    #[test]
    fn test_circle_circle_coincident_centers() {
        let m = circle_circle(Vector2::ZERO, 1.0, Vector2::ZERO, 2.0).unwrap();
        assert_eq!(m.normal, Vector2::X);
        assert!(approx_eq(m.penetration, 3.0));
        assert!(circle_circle(Vector2::ZERO, 1.0, Vector2::new(3.0, 0.0), 2.0).is_none());
    }

    #[test]
    fn test_rect_circle_outside_and_inside() {
        let min = Vector2::ZERO;
        let max = Vector2::new(100.0, 20.0);
        let m = rect_circle(min, max, Vector2::new(50.0, -4.0), 5.0).unwrap();
        assert_eq!(m.normal, Vector2::NEG_Y);
        assert!(approx_eq(m.penetration, 1.0));

        let m = rect_circle(min, max, Vector2::new(50.0, 18.0), 5.0).unwrap();
        assert_eq!(m.normal, Vector2::Y);
        assert!(approx_eq(m.penetration, 7.0));

        assert!(rect_circle(min, max, Vector2::new(50.0, -5.0), 5.0).is_none());
    }

    #[test]
    fn test_detect_circle_rect_normal_points_from_a_to_b() {
        let circle = body_circle(50.0, -4.0, 5.0);
        let floor = wall(0.0, 0.0, 100.0, 20.0);
        let m = detect(&circle, &floor).unwrap();
        assert_eq!(m.normal, Vector2::Y);
    }

    #[test]
    fn test_non_bodies_never_collide() {
        let mut world = World::new();
        world.init_resource::<Contacts>();
        world.spawn(Shape::rectangle(0.0, 0.0, 10.0, 10.0));
        world.spawn(Shape::rectangle(5.0, 5.0, 10.0, 10.0));
        world.spawn(Shape::circle(5.0, 5.0, 3.0));
        run(&mut world);
        assert!(world.resource::<Contacts>().is_empty());
    }

    #[test]
    fn test_degenerate_shapes_never_collide() {
        let mut world = World::new();
        world.init_resource::<Contacts>();
        world.spawn(wall(0.0, 0.0, 10.0, 10.0));
        world.spawn(body_circle(5.0, 5.0, 0.0));
        world.spawn(wall(2.0, 2.0, 0.0, 4.0));
        run(&mut world);
        assert!(world.resource::<Contacts>().is_empty());
    }

    #[test]
    fn test_overlapping_circles_are_separated() {
        let cases = [
            (Vector2::new(0.0, 0.0), 5.0, Vector2::new(3.0, 4.0), 5.0),
            (Vector2::new(10.0, 10.0), 2.0, Vector2::new(10.0, 10.0), 3.0),
            (Vector2::new(-1.0, 7.0), 4.0, Vector2::new(1.5, 5.0), 1.0),
        ];
        for (ca, ra, cb, rb) in cases {
            let mut world = World::new();
            world.init_resource::<Contacts>();
            let a = world.spawn(body_circle(ca.x, ca.y, ra)).id();
            let b = world.spawn(body_circle(cb.x, cb.y, rb)).id();
            run(&mut world);

            let pa = world.get::<Shape>(a).unwrap().position;
            let pb = world.get::<Shape>(b).unwrap().position;
            assert!(pa.distance(pb) >= ra + rb - TOLERANCE);
            assert_eq!(world.resource::<Contacts>().len(), 1);
        }
    }

    #[test]
    fn test_static_wall_only_moves_dynamic_shape() {
        let mut world = World::new();
        world.init_resource::<Contacts>();
        let floor = world.spawn(wall(0.0, 100.0, 200.0, 20.0)).id();
        let mut ball = body_circle(50.0, 97.0, 5.0);
        ball.velocity = Vector2::new(0.0, 30.0);
        let ball = world.spawn(ball).id();
        run(&mut world);

        assert_eq!(world.get::<Shape>(floor).unwrap().position, Vector2::new(0.0, 100.0));
        let shape = world.get::<Shape>(ball).unwrap();
        assert!(approx_eq(shape.position.y, 95.0));
        assert!(approx_eq(shape.velocity.y, 0.0));
        assert!(world.resource::<Contacts>().involves(
            ShapeId::from_entity(floor),
            ShapeId::from_entity(ball)
        ));
    }

    #[test]
    fn test_non_body_static_shape_still_blocks() {
        let mut world = World::new();
        world.init_resource::<Contacts>();
        let ground = world.spawn(Shape::rectangle(0.0, 50.0, 100.0, 10.0)).id();
        let ball = world.spawn(body_circle(25.0, 47.0, 5.0)).id();
        run(&mut world);
        assert_eq!(world.resource::<Contacts>().len(), 1);
        assert!(approx_eq(world.get::<Shape>(ball).unwrap().position.y, 45.0));
        assert_eq!(world.get::<Shape>(ground).unwrap().position, Vector2::new(0.0, 50.0));
    }

    #[test]
    fn test_restitution_uses_larger_rebound() {
        let mut a = body_circle(0.0, 0.0, 5.0);
        let mut b = body_circle(9.0, 0.0, 5.0);
        a.velocity = Vector2::new(10.0, 0.0);
        b.rebound = 1.0;
        let m = detect(&a, &b).unwrap();
        resolve(&mut a, &mut b, &m);
        // Equal masses, elastic: velocities swap.
        assert!(approx_eq(a.velocity.x, 0.0));
        assert!(approx_eq(b.velocity.x, 10.0));
    }

    #[test]
    fn test_friction_spins_unlocked_circle_only() {
        let floor_template = wall(0.0, 10.0, 100.0, 10.0);
        let mut floor = floor_template.clone();
        let mut ball = body_circle(50.0, 6.0, 5.0);
        ball.velocity = Vector2::new(10.0, 5.0);
        ball.friction = 0.5;
        floor.friction = 0.5;
        let m = detect(&floor, &ball).unwrap();
        resolve(&mut floor, &mut ball, &m);
        assert!(ball.velocity.x < 10.0);
        assert!(ball.angular_velocity != 0.0);

        let mut floor = floor_template;
        let mut locked = body_circle(50.0, 6.0, 5.0);
        locked.rotation_lock = true;
        locked.velocity = Vector2::new(10.0, 5.0);
        locked.friction = 0.5;
        floor.friction = 0.5;
        let m = detect(&floor, &locked).unwrap();
        resolve(&mut floor, &mut locked, &m);
        assert_eq!(locked.angular_velocity, 0.0);
    }
}
