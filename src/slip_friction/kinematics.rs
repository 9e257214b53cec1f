// ==============================================================================
// kinematics.rs — PER-POINT SLIP VELOCITY + NORMAL LOAD (WORLD SPACE)
// ------------------------------------------------------------------------------
// For one contact point between link1 and link2:
// - velocity of each link at the contact position (linvel + ω × r)
// - slip velocity = relative velocity with the normal component removed
// - normal force  = body-1 contact force rotated to world, projected on normal
// - reference speed candidate = max of both point speeds and both link-origin
//   speeds
//
// The links are read through LinkKinematics so the evaluator does not depend on
// a particular engine; physics.rs snapshots rapier bodies into LinkState.
// ==============================================================================

use rapier3d::math::Isometry;
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Point, Real, Vector};

use crate::slip_friction::types::{ContactPointSample, to_vector};

/// World-space velocity of an arbitrary point rigidly attached to the body:
/// v(p) = v_com + ω × (p - com)
#[inline]
pub fn point_velocity(linvel: Vector<Real>, angvel: Vector<Real>, com: Point<Real>, p: Point<Real>) -> Vector<Real> {
    let r = p.coords - com.coords;
    linvel + angvel.cross(&r)
}

/// Per-tick velocity queries on a link.
pub trait LinkKinematics {
    /// Linear velocity of the material point at world position `p`.
    fn velocity_at(&self, p: &Point<Real>) -> Vector<Real>;

    /// Linear velocity of the link frame origin.
    fn origin_velocity(&self) -> Vector<Real>;

    /// Link orientation in world.
    fn rotation(&self) -> UnitQuaternion<Real>;
}

/// Rigid-body state of a link captured for one tick.
#[derive(Debug, Clone, Copy)]
pub struct LinkState {
    pub pose: Isometry<Real>, // link frame in world
    pub com: Point<Real>,     // world
    pub linvel: Vector<Real>, // at com
    pub angvel: Vector<Real>,
}

impl LinkState {
    /// A link that does not move (ground, static geometry).
    pub fn fixed(pose: Isometry<Real>) -> Self {
        Self {
            pose,
            com: Point::from(pose.translation.vector),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
        }
    }
}

impl LinkKinematics for LinkState {
    #[inline]
    fn velocity_at(&self, p: &Point<Real>) -> Vector<Real> {
        point_velocity(self.linvel, self.angvel, self.com, *p)
    }

    #[inline]
    fn origin_velocity(&self) -> Vector<Real> {
        point_velocity(self.linvel, self.angvel, self.com, Point::from(self.pose.translation.vector))
    }

    #[inline]
    fn rotation(&self) -> UnitQuaternion<Real> {
        self.pose.rotation
    }
}

/// Lookup of the link owning a named collision.
pub trait ContactWorld {
    type Link: LinkKinematics;

    fn link_for_collision(&self, collision: &str) -> Option<Self::Link>;
}

/// What one contact point contributes to its pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEvaluation {
    pub slip_speed: Real,      // m/s, tangential
    pub reference_speed: Real, // m/s
    pub normal_force: Real,    // N, >= 0
}

/// Slip velocity between the two links at `point` (normal component removed).
#[inline]
pub fn slip_velocity(velocity1: Vector<Real>, velocity2: Vector<Real>, normal: Vector<Real>) -> Vector<Real> {
    let relative = velocity1 - velocity2;
    relative - normal * relative.dot(&normal)
}

pub fn evaluate_point<L1, L2>(sample: &ContactPointSample, link1: &L1, link2: &L2) -> PointEvaluation
where
    L1: LinkKinematics + ?Sized,
    L2: LinkKinematics + ?Sized,
{
    let velocity1 = link1.velocity_at(&sample.position);
    let velocity2 = link2.velocity_at(&sample.position);

    let slip_speed = slip_velocity(velocity1, velocity2, sample.normal).norm();

    let force1 = to_vector(sample.wrench.body_1_wrench.force);
    let normal_force = (link1.rotation() * force1).dot(&sample.normal).abs();

    let reference_speed = velocity1
        .norm()
        .max(velocity2.norm())
        .max(link1.origin_velocity().norm())
        .max(link2.origin_velocity().norm());

    PointEvaluation { slip_speed, reference_speed, normal_force }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slip_friction::types::{ContactWrench, Wrench};
    use approx::assert_relative_eq;
    use rapier3d::prelude::{nalgebra, point, vector};

    fn sample(position: Point<Real>, normal: Vector<Real>, force1: [f32; 3]) -> ContactPointSample {
        ContactPointSample {
            position,
            normal,
            wrench: ContactWrench {
                body_1_wrench: Wrench { force: force1, torque: [0.0; 3] },
                body_2_wrench: Wrench::default(),
            },
        }
    }

    fn moving(linvel: Vector<Real>, angvel: Vector<Real>, at: Point<Real>) -> LinkState {
        LinkState {
            pose: Isometry::translation(at.x, at.y, at.z),
            com: at,
            linvel,
            angvel,
        }
    }

    #[test]
    fn point_velocity_adds_rotation() {
        let v = point_velocity(vector![1.0, 0.0, 0.0], vector![0.0, 0.0, 2.0], point![0.0, 0.0, 0.0], point![0.0, -0.5, 0.0]);
        // ω × r = (0,0,2) × (0,-0.5,0) = (1,0,0)
        assert_relative_eq!(v, vector![2.0, 0.0, 0.0], epsilon = 1e-6);
    }

    #[test]
    fn sliding_block_slips_at_its_speed() {
        let block = moving(vector![3.0, 0.0, 0.0], Vector::zeros(), point![0.0, 0.5, 0.0]);
        let ground = LinkState::fixed(Isometry::identity());
        let s = sample(point![0.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], [0.0, -200.0, 0.0]);

        let e = evaluate_point(&s, &block, &ground);
        assert_relative_eq!(e.slip_speed, 3.0, epsilon = 1e-6);
        assert_relative_eq!(e.reference_speed, 3.0, epsilon = 1e-6);
        assert_relative_eq!(e.normal_force, 200.0, epsilon = 1e-4);
    }

    #[test]
    fn normal_velocity_is_not_slip() {
        let block = moving(vector![0.0, -2.0, 0.0], Vector::zeros(), point![0.0, 0.5, 0.0]);
        let ground = LinkState::fixed(Isometry::identity());
        let s = sample(point![0.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], [0.0, 10.0, 0.0]);

        let e = evaluate_point(&s, &block, &ground);
        assert_relative_eq!(e.slip_speed, 0.0, epsilon = 1e-6);
        assert_relative_eq!(e.reference_speed, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn rolling_wheel_has_no_slip_but_keeps_reference_speed() {
        // radius 0.5 rolling along +x at 4 m/s: ω = -8 about z
        let wheel = moving(vector![4.0, 0.0, 0.0], vector![0.0, 0.0, -8.0], point![0.0, 0.5, 0.0]);
        let ground = LinkState::fixed(Isometry::identity());
        let s = sample(point![0.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], [0.0, -50.0, 0.0]);

        let e = evaluate_point(&s, &wheel, &ground);
        assert_relative_eq!(e.slip_speed, 0.0, epsilon = 1e-5);
        // contact point is at rest, the hub is not
        assert_relative_eq!(e.reference_speed, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn body_force_is_rotated_into_world() {
        // link1 rotated 90° about z: local +x maps to world +y
        let pose = Isometry::rotation(vector![0.0, 0.0, std::f32::consts::FRAC_PI_2]);
        let link1 = LinkState::fixed(pose);
        let link2 = LinkState::fixed(Isometry::identity());
        let s = sample(point![0.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], [25.0, 0.0, 0.0]);

        let e = evaluate_point(&s, &link1, &link2);
        assert_relative_eq!(e.normal_force, 25.0, epsilon = 1e-4);
    }

    #[test]
    fn slip_velocity_is_tangential() {
        let n = vector![0.0, 0.0, 1.0];
        let v = slip_velocity(vector![1.0, 2.0, 3.0], vector![0.0, 0.0, -1.0], n);
        assert_relative_eq!(v, vector![1.0, 2.0, 0.0], epsilon = 1e-6);
    }
}
