use std::sync::Arc;

use approx::assert_relative_eq;
use rapier3d::math::Isometry;
use rapier3d::prelude::{Real, nalgebra, point, vector};

use tire_friction::config::EstimatorConfig;
use tire_friction::physics::PhysicsWorld;
use tire_friction::slip_friction::{
    ContactBatch, ContactPairRecord, ContactWorld, ContactWrench, FrictionParameters, LinkState, Wrench,
    compute_friction, estimate_batch_friction, to_vector,
};
use tire_friction::surface::FrictionSurface;
use tire_friction::transport::{contact_topic, spawn_contact_listener};
use tire_friction::{ContactMailbox, ContactTransport, FrictionEstimator, TickOutcome};

const TIRE: &str = "tire::wheel::tread";
const GROUND: &str = "ground_plane::link::collision";

/// Wheel hub moving at `hub_speed` while its contact patch slides at `slip_speed`.
struct SlipRig {
    hub_speed: Real,
    slip_speed: Real,
    writes: Vec<Real>,
}

impl ContactWorld for SlipRig {
    type Link = LinkState;

    fn link_for_collision(&self, collision: &str) -> Option<LinkState> {
        match collision {
            // radius 0.5: ω chosen so the bottom point moves at slip_speed
            TIRE => Some(LinkState {
                pose: Isometry::translation(0.0, 0.5, 0.0),
                com: point![0.0, 0.5, 0.0],
                linvel: vector![self.hub_speed, 0.0, 0.0],
                angvel: vector![0.0, 0.0, -(self.hub_speed - self.slip_speed) / 0.5],
            }),
            GROUND => Some(LinkState::fixed(Isometry::identity())),
            _ => None,
        }
    }
}

impl FrictionSurface for SlipRig {
    fn backend_name(&self) -> &str {
        "rig"
    }
    fn supports_friction_updates(&self, _collision: &str) -> bool {
        true
    }
    fn set_friction(&mut self, _collision: &str, primary: Real, _secondary: Real) -> bool {
        self.writes.push(primary);
        true
    }
}

fn patch(load: f32) -> ContactPairRecord {
    let mut r = ContactPairRecord::new(TIRE, GROUND);
    r.push_point(
        [0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        ContactWrench {
            body_1_wrench: Wrench { force: [0.0, -load, 0.0], torque: [0.0; 3] },
            body_2_wrench: Wrench { force: [0.0, load, 0.0], torque: [0.0; 3] },
        },
    );
    r
}

fn batch(records: Vec<ContactPairRecord>) -> ContactBatch {
    ContactBatch { time: 0.0, contacts: records }
}

#[test]
fn rising_slip_scenario() {
    // slip 0.05 at 2 m/s -> 0.275
    let rig = SlipRig { hub_speed: 2.0, slip_speed: 0.05, writes: Vec::new() };
    let est = estimate_batch_friction(&batch(vec![patch(400.0)]), &rig, &FrictionParameters::default());
    assert_relative_eq!(est.friction.unwrap(), 0.275, epsilon = 1e-5);
}

#[test]
fn falling_slip_scenario() {
    // slip 0.3 at 2 m/s -> slip ratio 0.15 -> 1.05
    let rig = SlipRig { hub_speed: 2.0, slip_speed: 0.3, writes: Vec::new() };
    let est = estimate_batch_friction(&batch(vec![patch(400.0)]), &rig, &FrictionParameters::default());
    assert_relative_eq!(est.friction.unwrap(), 1.05, epsilon = 1e-5);
}

#[test]
fn crawling_scenario_holds_static_friction() {
    for slip in [0.0, 0.1, 0.3] {
        let rig = SlipRig { hub_speed: 0.3, slip_speed: slip, writes: Vec::new() };
        let est = estimate_batch_friction(&batch(vec![patch(400.0)]), &rig, &FrictionParameters::default());
        assert_relative_eq!(est.friction.unwrap(), 1.1);
    }
}

#[test]
fn invalid_pair_is_ignored_by_the_batch_mean() {
    let rig = SlipRig { hub_speed: 2.0, slip_speed: 0.05, writes: Vec::new() };
    let params = FrictionParameters::default();

    let mut bad = patch(400.0);
    bad.wrenches.push(ContactWrench::default());

    let clean = estimate_batch_friction(&batch(vec![patch(400.0)]), &rig, &params);
    let mixed = estimate_batch_friction(&batch(vec![patch(400.0), bad]), &rig, &params);
    assert_eq!(clean.friction, mixed.friction);
}

#[test]
fn estimator_applies_curve_value_through_the_mailbox() {
    let mut rig = SlipRig { hub_speed: 2.0, slip_speed: 0.3, writes: Vec::new() };
    let mailbox = ContactMailbox::new();
    let mut estimator = FrictionEstimator::new(FrictionParameters::default(), TIRE, mailbox.clone(), &rig);

    mailbox.post(batch(vec![patch(100.0)]));
    mailbox.post(batch(vec![ContactPairRecord::new(TIRE, GROUND)])); // replaces the first

    assert_eq!(estimator.advance(1.0 / 60.0, &mut rig), TickOutcome::NoValidContacts);
    assert!(rig.writes.is_empty());

    mailbox.post(batch(vec![patch(100.0)]));
    match estimator.advance(1.0 / 60.0, &mut rig) {
        TickOutcome::Applied(mu) => assert_relative_eq!(mu, 1.05, epsilon = 1e-5),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(rig.writes.len(), 1);
}

#[test]
fn curve_matches_scenarios_directly() {
    let p = FrictionParameters::default();
    assert_relative_eq!(compute_friction(0.05, 2.0, &p), 0.275, epsilon = 1e-6);
    // slip ratio 0.075, still on the rising segment
    assert_relative_eq!(compute_friction(0.15, 2.0, &p), 0.825, epsilon = 1e-5);
    assert_relative_eq!(compute_friction(0.3, 2.0, &p), 1.05, epsilon = 1e-6);
    assert_eq!(compute_friction(5.0, 0.3, &p), 1.1);
}

#[tokio::test]
async fn rapier_world_feeds_estimator_over_transport() {
    let cfg = EstimatorConfig::from_json(r#"{"collision_name":"tread"}"#).unwrap();
    let mut world = PhysicsWorld::demo_tire(0.0);
    let target = cfg.resolve(world.model("tire").unwrap()).unwrap();
    let topic = world.create_contact_filter(&target.collision).unwrap();
    assert_eq!(topic, contact_topic(TIRE));

    let transport = Arc::new(ContactTransport::new());
    let mailbox = ContactMailbox::new();
    let listener = spawn_contact_listener(transport.subscribe(&topic), mailbox.clone());

    let (params, warnings) = cfg.friction_parameters();
    assert!(warnings.is_empty());
    let mut estimator = FrictionEstimator::new(params, target.collision.clone(), mailbox.clone(), &world);
    assert!(estimator.support().is_supported());

    let dt = 1.0 / 60.0;
    let mut applied = None;
    for _ in 0..120 {
        world.step(dt);
        for (topic, batch) in world.contact_batches(dt) {
            let _ = transport.publish(&topic, batch);
        }
        tokio::task::yield_now().await;
        // the listener may not have run yet; retry after another yield
        if !mailbox.has_batch() {
            tokio::task::yield_now().await;
        }
        if let TickOutcome::Applied(mu) = estimator.advance(dt, &mut world) {
            applied = Some(mu);
        }
    }

    // a tire settled at rest sits in the low-speed clamp
    let mu = applied.expect("no coefficient applied");
    assert_relative_eq!(mu, 1.1, epsilon = 1e-6);
    assert_relative_eq!(world.friction_of(TIRE).unwrap(), 1.1, epsilon = 1e-6);

    drop(transport);
    listener.await.unwrap();
}

#[test]
fn rapier_contact_records_carry_the_tire_load() {
    let mut world = PhysicsWorld::demo_tire(0.0);
    world.create_contact_filter(TIRE).unwrap();
    let dt = 1.0 / 60.0;
    for _ in 0..90 {
        world.step(dt);
    }

    let (_, batch) = world.contact_batches(dt).remove(0);
    let record = &batch.contacts[0];
    let samples = record.samples().unwrap();

    let link1 = world.link_for_collision(&record.collision1).unwrap();
    let rotation = link1.pose.rotation;
    let load: Real = samples
        .iter()
        .map(|s| (rotation * to_vector(s.wrench.body_1_wrench.force)).dot(&s.normal).abs())
        .sum();

    assert!(load > 0.0);
    assert!(record.normals.iter().all(|n| (to_vector(*n).norm() - 1.0).abs() < 1e-3));
}
