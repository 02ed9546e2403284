//! # Atrium Room Session Demonstration
//!
//! Simulates a small multi-user room end to end: two clients share a room
//! store, avatars walk between grid regions (driving show/hide broadcasts
//! and video pause/resume), a proximity pad fires enter/leave events, and a
//! networked demo box replicates color/rotation state between the clients.

use anyhow::Result;
use atrium_presence::{
    config::PresenceConfig,
    events::{topics, EventBus, ProximityEnterEvent, ProximityLeaveEvent, RegionVisibilityEvent},
    interactive::InteractiveTemplate,
    proximity::ProximityWatcher,
    region::RegionHider,
    scene::{Entity, EntityKind, Scene, VideoPlayable, VideoState},
    sync::{LocalNetwork, RoomStore},
    types::Vec3,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "room-test-client")]
#[command(about = "Atrium presence core - simulated room session")]
struct Args {
    /// Region grid cell size in world units
    #[arg(short, long, default_value = "10.0")]
    cell_size: f64,

    /// Number of simulation frames to run
    #[arg(short, long, default_value = "120")]
    ticks: u32,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<String>,
}

/// Replicated state of the demo box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct BoxState {
    color: String,
    rotation: [f64; 3],
    position: [f64; 3],
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => PresenceConfig::load(path)?,
        None => PresenceConfig::default(),
    };
    if config.region.cell_size.is_none() {
        config.region.cell_size = Some(args.cell_size);
    }

    let events = EventBus::new();
    subscribe_logging(&events);

    // The room scene: navmesh, environment, one walking avatar, one video
    // screen two cells away.
    let scene = Scene::new(events.clone());
    scene.spawn(Entity::builder("navmesh", EntityKind::NavMesh).build());
    let avatar = scene.spawn(
        Entity::builder("visitor", EntityKind::Avatar)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build(),
    );
    let video = VideoState::new(false);
    let screen = scene.spawn(
        Entity::builder("lecture screen", EntityKind::PinnedMedia)
            .position(Vec3::new(25.0, 1.5, 5.0))
            .video(video.clone())
            .build(),
    );

    let environment = Entity::builder("hall", EntityKind::Environment).build();
    environment.add_child(
        Entity::builder("stage", EntityKind::Environment)
            .position(Vec3::new(25.0, 0.0, 5.0))
            .build(),
    );
    environment.add_child(Entity::builder("sky", EntityKind::Skybox).build());
    scene.load_environment(environment).await;

    let hider = RegionHider::new(scene.clone(), &config, Some("hall_10"));
    info!(
        "region hiding active={} cell_size={}",
        hider.is_active(),
        hider.cell_size()
    );

    // A proximity pad near the screen.
    let pad = scene.spawn(
        Entity::builder("teleport pad", EntityKind::Interactive)
            .position(Vec3::new(25.0, 0.0, 5.0))
            .build(),
    );
    let watcher = ProximityWatcher::new(pad, &config.proximity, events.clone());

    // Two clients sharing a networked demo box.
    let room = RoomStore::new();
    let net_a = LocalNetwork::new(room.clone());
    let net_b = LocalNetwork::new(room.clone());
    net_a.connect();
    net_b.connect();

    let box_a = InteractiveTemplate::<BoxState>::new("shared-box")
        .networked(net_a.clone())
        .interactive(|| info!("client A clicked the box"))
        .attach(
            Entity::builder("demo box", EntityKind::Interactive)
                .model_ready()
                .build(),
            || BoxState {
                color: "#7070ff".into(),
                ..BoxState::default()
            },
        );
    let box_b = InteractiveTemplate::<BoxState>::new("shared-box")
        .networked(net_b.clone())
        .on_remote_update(|state: &BoxState| {
            info!("client B adopted remote box state: {:?}", state)
        })
        .attach(
            Entity::builder("demo box", EntityKind::Interactive)
                .model_ready()
                .build(),
            BoxState::default,
        );

    // Walk the avatar toward the screen and back again.
    let waypoints = [
        Vec3::new(5.0, 0.0, 5.0),
        Vec3::new(15.0, 0.0, 5.0),
        Vec3::new(25.0, 0.0, 5.0),
        Vec3::new(15.0, 0.0, 5.0),
        Vec3::new(5.0, 0.0, 5.0),
    ];

    for tick in 0..args.ticks {
        let waypoint = waypoints[(tick as usize / 20) % waypoints.len()];
        avatar.set_position(waypoint);

        hider.tick().await;
        watcher.tick(&scene.entities_of_kind(EntityKind::Avatar)).await;
        box_a.tick().await;
        box_b.tick().await;

        // Halfway through, client A clicks and recolors the shared box.
        if tick == args.ticks / 2 {
            box_a.click();
            let recolored = BoxState {
                color: "#ff7070".into(),
                rotation: [0.0, 90.0, 0.0],
                position: [1.0, 0.5, -2.0],
            };
            if box_a.publish(&recolored).await {
                info!("client A published a recolor");
            }
        }

        if tick % 20 == 0 {
            info!(
                "tick {:3}: avatar at {:?}, screen visible={} paused={}",
                tick,
                waypoint,
                screen.is_visible(),
                video.is_paused()
            );
        }
    }

    if let Some(service) = hider.service() {
        let stats = service.stats();
        info!(
            "final stats: {} shows, {} hides, {} avatars, {} objects, {} occupied regions",
            stats.shows,
            stats.hides,
            stats.avatar_followers,
            stats.object_followers,
            stats.occupied_regions
        );
    }
    info!(
        "shared box converged: client B sees {:?}",
        box_b.doc().map(|doc| doc.snapshot())
    );
    Ok(())
}

fn subscribe_logging(events: &Arc<EventBus>) {
    events.on::<RegionVisibilityEvent, _>(topics::REGION_VISIBILITY, |event| {
        info!(
            "{} is now {}",
            event.region,
            if event.visible { "shown" } else { "hidden" }
        );
        Ok(())
    });
    events.on::<ProximityEnterEvent, _>(topics::PROXIMITY_ENTER, |event| {
        info!(
            "avatar {} stepped onto pad {} ({:.2}m)",
            event.avatar, event.watcher, event.distance
        );
        Ok(())
    });
    events.on::<ProximityLeaveEvent, _>(topics::PROXIMITY_LEAVE, |event| {
        info!(
            "avatar {} stepped off pad {} ({:.2}m)",
            event.avatar, event.watcher, event.distance
        );
        Ok(())
    });
}
