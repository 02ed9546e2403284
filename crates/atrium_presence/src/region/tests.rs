//! Cross-cutting region scenarios: full hider + service + follower flows
//! that single-module unit tests do not cover.

use crate::config::PresenceConfig;
use crate::events::{topics, EventBus, RegionVisibilityEvent};
use crate::region::hider::RegionHider;
use crate::scene::{Entity, EntityKind, Scene, VideoPlayable, VideoState};
use crate::types::Vec3;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn room_scene() -> Arc<Scene> {
    let scene = Scene::new(EventBus::new());
    scene.spawn(Entity::builder("navmesh", EntityKind::NavMesh).build());
    scene
}

#[tokio::test(flavor = "multi_thread")]
async fn test_walkthrough_hides_and_shows_media() {
    let scene = room_scene();
    let video = VideoState::new(false);
    let screen = scene.spawn(
        Entity::builder("screen", EntityKind::PinnedMedia)
            .position(Vec3::new(55.0, 1.0, 5.0))
            .video(video.clone())
            .build(),
    );
    let avatar = scene.spawn(
        Entity::builder("avatar", EntityKind::Avatar)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build(),
    );

    let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), Some("room_10"));
    let service = hider.service().expect("navmesh present").clone();
    hider.tick().await;

    // The screen's region has no occupants yet; a dynamic follower keeps
    // its spawn visibility until a transition, so reconcile explicitly the
    // way the environment-load path does.
    service.refresh_all();
    assert!(!screen.is_visible());
    assert!(video.is_paused());

    // Walk over to the screen, one cell at a time.
    for x in [15.0, 25.0, 35.0, 45.0, 55.0] {
        avatar.set_position(Vec3::new(x, 0.0, 5.0));
        hider.tick().await;
    }
    assert!(screen.is_visible());
    assert!(!video.is_paused(), "video resumes when its region is entered");

    // Walk away again.
    avatar.set_position(Vec3::new(5.0, 0.0, 5.0));
    hider.tick().await;
    assert!(!screen.is_visible());
    assert!(video.is_paused());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_visibility_events_published_on_bus() {
    let scene = room_scene();
    let transitions = Arc::new(AtomicUsize::new(0));
    {
        let transitions = transitions.clone();
        scene
            .events()
            .on::<RegionVisibilityEvent, _>(topics::REGION_VISIBILITY, move |_| {
                transitions.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
    }

    let avatar = scene.spawn(
        Entity::builder("avatar", EntityKind::Avatar)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build(),
    );
    let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), None);
    hider.tick().await;
    // Attach produced one show.
    assert_eq!(transitions.load(Ordering::SeqCst), 1);

    avatar.set_position(Vec3::new(25.0, 0.0, 5.0));
    hider.tick().await;
    // Old region hidden, new region shown.
    assert_eq!(transitions.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_environment_refresh_after_late_load() {
    let scene = room_scene();
    scene.spawn(
        Entity::builder("avatar", EntityKind::Avatar)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build(),
    );
    let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), None);
    hider.tick().await;

    // Environment loads after the avatar's occupancy is established.
    let root = Entity::builder("environment", EntityKind::Environment).build();
    let near = Entity::builder("stage", EntityKind::Environment)
        .position(Vec3::new(7.0, 0.0, 3.0))
        .build();
    let far = Entity::builder("gallery", EntityKind::Environment)
        .position(Vec3::new(200.0, 0.0, 200.0))
        .build();
    root.add_child(near.clone());
    root.add_child(far.clone());
    scene.load_environment(root).await;
    hider.tick().await;

    assert!(near.is_visible(), "occupied region content stays shown");
    assert!(!far.is_visible(), "vacant region content is hidden");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_avatars_crossing_regions() {
    let scene = room_scene();
    let a = scene.spawn(
        Entity::builder("a", EntityKind::Avatar)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build(),
    );
    let b = scene.spawn(
        Entity::builder("b", EntityKind::Avatar)
            .position(Vec3::new(15.0, 0.0, 5.0))
            .build(),
    );
    let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), None);
    let service = hider.service().expect("active").clone();
    hider.tick().await;

    let region_a = service.grid().tag(a.position());
    let region_b = service.grid().tag(b.position());
    assert_eq!(service.count(region_a), 1);
    assert_eq!(service.count(region_b), 1);

    // They swap cells; counts end where they started.
    a.set_position(Vec3::new(15.0, 0.0, 5.0));
    b.set_position(Vec3::new(5.0, 0.0, 5.0));
    hider.tick().await;
    assert_eq!(service.count(region_a), 1);
    assert_eq!(service.count(region_b), 1);
    assert_eq!(service.stats().occupied_regions, 2);
}
