// src/physics.rs

use rapier3d::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::slip_friction::kinematics::{ContactWorld, LinkState};
use crate::slip_friction::types::{ContactBatch, ContactPairRecord, ContactWrench, Wrench, from_point, from_vector};
use crate::surface::FrictionSurface;
use crate::transport::contact_topic;

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_TIRE: Group = Group::from_bits_truncate(0b0010);

pub const BACKEND_NAME: &str = "rapier";

/// Scoped name of a collision: `model::link::collision`.
pub fn scoped_name(model: &str, link: &str, collision: &str) -> String {
    format!("{model}::{link}::{collision}")
}

#[derive(Clone, Debug)]
pub struct LinkEntry {
    pub name: String,
    pub body: RigidBodyHandle,
    pub collisions: Vec<(String, ColliderHandle)>, // local name -> collider
}

impl LinkEntry {
    pub fn collision(&self, name: &str) -> Option<ColliderHandle> {
        self.collisions.iter().find(|(n, _)| n == name).map(|(_, h)| *h)
    }
}

/// Named links and collisions of one model, in insertion order.
#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub links: Vec<LinkEntry>,
}

impl Model {
    pub fn link(&self, name: &str) -> Option<&LinkEntry> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn first_link(&self) -> Option<&LinkEntry> {
        self.links.first()
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection

    pub models: HashMap<String, Model>, // model name → links/collisions
    collision_names: HashMap<ColliderHandle, String>, // collider → scoped name
    collisions: HashMap<String, ColliderHandle>, // scoped name → collider
    contact_filters: Vec<(String, ColliderHandle)>, // topic → monitored collider
    drive_torques: HashMap<RigidBodyHandle, Vector<Real>>, // persistent torque per body
    pub time: f64, // simulated seconds
}

impl PhysicsWorld {

    pub fn new() -> Self {
        let mut world = Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            models: HashMap::new(),
            collision_names: HashMap::new(),
            collisions: HashMap::new(),
            contact_filters: Vec::new(),
            drive_torques: HashMap::new(),
            time: 0.0,
        };

        // Static ground slab, top surface at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        let ground_collider = ColliderBuilder::cuboid(500.0, 0.1, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_TIRE))
            .friction(1.0)
            .restitution(0.0)
            .build();

        let ground = world.add_link("ground_plane", "link", ground_rb);
        world.add_collision("ground_plane", "link", "collision", ground_collider);

        info!(
            bodies = world.bodies.len(),
            colliders = world.colliders.len(),
            "ground inserted (body = {:?})",
            ground
        );

        world
    }

    /// Ground plus a single free wheel ("tire::wheel::tread") rolling along +x.
    pub fn demo_tire(speed: Real) -> Self {
        let mut world = Self::new();

        let radius = 0.33;
        let half_width = 0.11;

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![0.0, radius + 0.005, 0.0])
            .linvel(vector![speed, 0.0, 0.0])
            .angvel(vector![0.0, 0.0, -speed / radius])
            .ccd_enabled(true)
            .build();

        // Cylinder axis (local y) turned onto world z.
        let tread = ColliderBuilder::cylinder(half_width, radius)
            .rotation(vector![std::f32::consts::FRAC_PI_2, 0.0, 0.0])
            .collision_groups(InteractionGroups::new(GROUP_TIRE, GROUP_GROUND))
            .density(400.0)
            .friction(1.1)
            .restitution(0.0)
            .build();

        world.add_link("tire", "wheel", rb);
        world.add_collision("tire", "wheel", "tread", tread);
        world
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Insert a body as link `link` of `model` (model created on first use).
    pub fn add_link(&mut self, model: &str, link: &str, body: RigidBody) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        self.models
            .entry(model.to_string())
            .or_insert_with(|| Model { name: model.to_string(), links: Vec::new() })
            .links
            .push(LinkEntry { name: link.to_string(), body: handle, collisions: Vec::new() });
        handle
    }

    /// Attach a collider to an existing link. Returns None if the link is unknown.
    pub fn add_collision(
        &mut self,
        model: &str,
        link: &str,
        collision: &str,
        collider: Collider,
    ) -> Option<ColliderHandle> {
        let entry = self.models.get_mut(model)?.links.iter_mut().find(|l| l.name == link)?;
        let handle = self.colliders.insert_with_parent(collider, entry.body, &mut self.bodies);
        entry.collisions.push((collision.to_string(), handle));

        let scoped = scoped_name(model, link, collision);
        self.collision_names.insert(handle, scoped.clone());
        self.collisions.insert(scoped, handle);
        Some(handle)
    }

    pub fn collider_by_name(&self, scoped: &str) -> Option<ColliderHandle> {
        self.collisions.get(scoped).copied()
    }

    /// Start publishing contacts involving `scoped`; returns the contact topic.
    pub fn create_contact_filter(&mut self, scoped: &str) -> Option<String> {
        let handle = self.collider_by_name(scoped)?;
        let topic = contact_topic(scoped);
        if !self.contact_filters.iter().any(|(t, _)| *t == topic) {
            self.contact_filters.push((topic.clone(), handle));
            debug!(topic = %topic, "contact filter created");
        }
        Some(topic)
    }

    /// Hold a torque on `body` across steps (replaces the previous one).
    pub fn set_drive_torque(&mut self, body: RigidBodyHandle, torque: Vector<Real>) {
        self.drive_torques.insert(body, torque);
    }

    pub fn step(&mut self, dt: Real) {
        let hooks = ();
        let events = ();

        // 1) Drive torques as impulses over this step
        for (&handle, torque) in self.drive_torques.iter() {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.apply_torque_impulse(*torque * dt, true);
            }
        }

        // 2) Step physics.
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &hooks,
            &events,
        );
        self.time += dt as f64;

        // 3) Safety: prevent bodies from exploding to insane coordinates
        for (_, body) in self.bodies.iter_mut() {
            let mut pos = *body.translation();

            let bad =
                !pos.x.is_finite() || !pos.y.is_finite() || !pos.z.is_finite() ||
                pos.x.abs() > 1_000.0 || pos.y.abs() > 1_000.0 || pos.z.abs() > 1_000.0;

            if bad {
                pos = vector![0.0, 1.0, 0.0];
                body.set_translation(pos, true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);

                warn!("reset exploding body back to {:?}", pos);
            }
        }
    }

    /// One batch per contact filter, built from the last step's contact pairs.
    ///
    /// Forces are the solver's normal impulses over `dt`, expressed in each
    /// body's own frame.
    pub fn contact_batches(&self, dt: Real) -> Vec<(String, ContactBatch)> {
        self.contact_filters
            .iter()
            .map(|(topic, handle)| (topic.clone(), self.contact_batch(*handle, dt)))
            .collect()
    }

    fn contact_batch(&self, monitored: ColliderHandle, dt: Real) -> ContactBatch {
        let mut contacts = Vec::new();
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };

        for pair in self.narrow_phase.contact_pairs_with(monitored) {
            if !pair.has_any_active_contact {
                continue;
            }
            let (Some(co1), Some(co2)) = (self.colliders.get(pair.collider1), self.colliders.get(pair.collider2)) else {
                continue;
            };
            let (Some(name1), Some(name2)) = (
                self.collision_names.get(&pair.collider1),
                self.collision_names.get(&pair.collider2),
            ) else {
                continue;
            };

            let rot1 = self.collider_link(co1).pose.rotation;
            let rot2 = self.collider_link(co2).pose.rotation;

            let mut record = ContactPairRecord::new(name1.clone(), name2.clone());
            for manifold in &pair.manifolds {
                let normal = co1.position().rotation * manifold.local_n1;

                for pt in &manifold.points {
                    // speculative points carry no load
                    if pt.dist > 0.0 && pt.data.impulse <= 0.0 {
                        continue;
                    }
                    let position = co1.position() * pt.local_p1;
                    let force1 = -normal * (pt.data.impulse * inv_dt);

                    record.push_point(
                        from_point(position),
                        from_vector(normal),
                        ContactWrench {
                            body_1_wrench: Wrench {
                                force: from_vector(rot1.inverse_transform_vector(&force1)),
                                torque: [0.0; 3],
                            },
                            body_2_wrench: Wrench {
                                force: from_vector(rot2.inverse_transform_vector(&-force1)),
                                torque: [0.0; 3],
                            },
                        },
                    );
                }
            }

            if !record.is_empty() {
                contacts.push(record);
            }
        }

        ContactBatch { time: self.time, contacts }
    }

    fn collider_link(&self, collider: &Collider) -> LinkState {
        match collider.parent().and_then(|h| self.bodies.get(h)) {
            Some(body) => LinkState {
                pose: *body.position(),
                com: *body.center_of_mass(),
                linvel: *body.linvel(),
                angvel: *body.angvel(),
            },
            None => LinkState::fixed(*collider.position()),
        }
    }

    pub fn friction_of(&self, scoped: &str) -> Option<Real> {
        let handle = self.collider_by_name(scoped)?;
        self.colliders.get(handle).map(|c| c.friction())
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactWorld for PhysicsWorld {
    type Link = LinkState;

    fn link_for_collision(&self, collision: &str) -> Option<LinkState> {
        let handle = self.collider_by_name(collision)?;
        self.colliders.get(handle).map(|c| self.collider_link(c))
    }
}

impl FrictionSurface for PhysicsWorld {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn supports_friction_updates(&self, collision: &str) -> bool {
        self.collider_by_name(collision).is_some()
    }

    // Rapier colliders carry one isotropic coefficient; the primary slot wins.
    fn set_friction(&mut self, collision: &str, primary: Real, secondary: Real) -> bool {
        let Some(collider) = self.collider_by_name(collision).and_then(|h| self.colliders.get_mut(h)) else {
            return false;
        };
        if primary != secondary {
            debug!(primary, secondary, "anisotropic friction collapsed to primary");
        }
        collider.set_friction(primary);
        true
    }
}
