use std::sync::Arc;

use rand::Rng;
use rapier3d::prelude::{Real, Vector, nalgebra, vector};
use tokio::sync::broadcast;
use tokio::time::{Duration, interval};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tire_friction::config::EstimatorConfig;
use tire_friction::net::{ServerMessage, start_websocket_server};
use tire_friction::physics::PhysicsWorld;
use tire_friction::transport::spawn_contact_listener;
use tire_friction::{ContactMailbox, ContactTransport, FrictionEstimator, TickOutcome};

/// Wheel torque about its axle: launch, cruise, hard brake, repeat (8 s cycle).
fn drive_torque(time: f64, rng: &mut impl Rng) -> Vector<Real> {
    let phase = time % 8.0;
    let base = if phase < 2.0 {
        -140.0 // wheelspin launch
    } else if phase < 5.0 {
        -10.0
    } else {
        90.0 // lock-up braking
    };
    let noise: Real = rng.gen_range(-5.0..5.0);
    vector![0.0, 0.0, base + noise]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting tire friction server");

    let config = match std::env::args().nth(1) {
        Some(path) => match EstimatorConfig::load(&path) {
            Ok(c) => c,
            Err(e) => {
                error!("{path}: {e}");
                return;
            }
        },
        None => EstimatorConfig {
            collision_name: Some("tread".into()),
            ..EstimatorConfig::default()
        },
    };

    let mut world = PhysicsWorld::demo_tire(6.0);

    let target = match config.resolve_in(&world) {
        Ok(t) => t,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    let Some(topic) = world.create_contact_filter(&target.collision) else {
        error!("collision [{}] has no collider", target.collision);
        return;
    };

    // Transport delivery context -> mailbox
    let transport = Arc::new(ContactTransport::new());
    let mailbox = ContactMailbox::new();
    spawn_contact_listener(transport.subscribe(&topic), mailbox.clone());

    let (params, _) = config.friction_parameters();
    let mut estimator = FrictionEstimator::new(params, target.collision.clone(), mailbox, &world);

    let (reports, _) = broadcast::channel(64);
    {
        let transport = Arc::clone(&transport);
        let reports = reports.clone();
        let addr = config.ws_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = start_websocket_server(addr, transport, reports).await {
                error!("websocket server stopped: {e}");
            }
        });
    }

    let dt = config.tick_seconds();
    let mut ticker = interval(Duration::from_secs_f32(dt));
    let mut rng = rand::thread_rng();
    let mut tick: u64 = 0;

    info!(collision = %target.collision, topic = %topic, dt, "estimator running");

    loop {
        ticker.tick().await;

        world.set_drive_torque(target.body, drive_torque(world.time, &mut rng));
        world.step(dt);

        for (topic, batch) in world.contact_batches(dt) {
            let _ = transport.publish(&topic, batch);
        }
        // let the listener deliver before this tick reads the mailbox
        tokio::task::yield_now().await;

        if let TickOutcome::Applied(mu) = estimator.advance(dt, &mut world) {
            let _ = reports.send(ServerMessage::Friction { tick, mu });
            if tick % 60 == 0 {
                info!(tick, mu, "tire friction");
            }
        }

        tick += 1;
    }
}
