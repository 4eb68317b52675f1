use approx::{assert_abs_diff_eq, assert_relative_eq};
use glam::{Vec3, Vec4};
use dynpool::*;

fn ball_world(radius: f32, start_z: f32) -> SimWorld {
    let mut cfg = SimConfig {
        spawn_min: Vec3::new(0.0, 0.0, start_z),
        spawn_max: Vec3::new(0.0, 0.0, start_z),
        ..Default::default()
    };
    let mut balls = GroupConfig::new("balls", ObjKind::Dynamic, 1);
    balls.initial_live_count = 1;
    balls.props = ObjTypeProps {
        radius,
        elasticity: 1.0,
        ..Default::default()
    };
    cfg.groups.push(balls);
    cfg.groups.push(GroupConfig::new("decals", ObjKind::Decal, 4));
    SimWorld::load(cfg).unwrap()
}

fn ball(w: &SimWorld) -> &SimObject {
    w.group(0).unwrap().live().next().unwrap().1
}

#[test]
fn falling_ball_bounces_at_half_speed_then_rests() {
    let mut scene = StaticScene::new();
    let floor = scene.add(SurfaceDesc::new(SurfaceShape::Plane { normal: Vec3::Z, offset: 0.0 }).elasticity(0.5));
    let radius = 0.5;
    let mut w = ball_world(radius, 10.0);
    assert_eq!(ball(&w).pos(), Vec3::new(0.0, 0.0, 10.0));

    let mut first_impact = None;
    for _ in 0..120 {
        w.tick(&scene).unwrap();
        let speed = w.drain_events().find_map(|e| match e {
            WorldEvent::Impact { speed, surface, .. } => Some((speed, surface)),
            _ => None,
        });
        if let Some(hit) = speed {
            first_impact = Some(hit);
            break;
        }
    }
    let (speed, surface) = first_impact.expect("ball reaches the floor");
    assert_eq!(surface, floor);
    let b = ball(&w);
    let vz = b.as_dynamic().unwrap().velocity.z;
    assert!(vz > 0.0);
    assert_relative_eq!(vz, 0.5 * speed, max_relative = 1e-3);
    assert!((b.pos().z - radius).abs() < 0.15, "z = {}", b.pos().z);

    let mut rested_on = None;
    for _ in 0..1200 {
        w.tick(&scene).unwrap();
        for e in w.drain_events() {
            if let WorldEvent::Rests { surface, .. } = e {
                rested_on = Some(surface);
            }
        }
    }
    assert_eq!(rested_on, Some(floor));
    let b = ball(&w);
    let d = b.as_dynamic().unwrap();
    assert_eq!(d.motion, MotionState::Resting);
    assert_abs_diff_eq!(b.pos().z, radius, epsilon = 1e-3);
    assert!(d.velocity.length() < REST_EPSILON);
}

#[test]
fn rolling_ball_on_floor_comes_to_rest() {
    let floors = [
        SurfaceShape::Plane { normal: Vec3::Z, offset: 0.0 },
        SurfaceShape::Cube { min: Vec3::new(-50.0, -50.0, -0.1), max: Vec3::new(50.0, 50.0, 0.0) },
        SurfaceShape::Cube { min: Vec3::new(-50.0, -50.0, -20.0), max: Vec3::new(50.0, 50.0, 0.0) },
    ];
    for shape in floors {
        let mut scene = StaticScene::new();
        scene.add(SurfaceDesc::new(shape).elasticity(0.5));
        let mut w = ball_world(0.25, 0.25);
        {
            let (_, obj) = w.group_mut(0).unwrap().live_mut().next().unwrap();
            obj.as_dynamic_mut().unwrap().velocity = Vec3::new(3.0, 0.0, 0.0);
        }
        for _ in 0..600 {
            w.tick(&scene).unwrap();
        }
        let b = ball(&w);
        let d = b.as_dynamic().unwrap();
        assert_eq!(d.motion, MotionState::Resting, "{:?}", shape);
        assert_eq!(d.velocity, Vec3::ZERO);
        assert_abs_diff_eq!(b.pos().z, 0.25, epsilon = 1e-3);
    }
}

#[test]
fn resting_ball_stays_put() {
    let mut scene = StaticScene::new();
    scene.add(SurfaceDesc::new(SurfaceShape::Plane { normal: Vec3::Z, offset: 0.0 }).elasticity(0.5));
    let mut w = ball_world(0.3, 1.0);
    for _ in 0..600 {
        w.tick(&scene).unwrap();
    }
    w.drain_events().for_each(drop);
    let settled = ball(&w).pos();
    for _ in 0..300 {
        let stats = w.tick(&scene).unwrap();
        assert_eq!(stats.resting, 1);
    }
    assert_eq!(ball(&w).pos(), settled);
    assert_eq!(w.drain_events().count(), 0);
}

#[test]
fn resting_ball_rides_platform_and_falls_when_removed() {
    let mut scene = StaticScene::new();
    let lift = scene.add(
        SurfaceDesc::new(SurfaceShape::Cube {
            min: Vec3::new(-2.0, -2.0, -1.0),
            max: Vec3::new(2.0, 2.0, 0.0),
        })
        .elasticity(0.2)
        .moving(Vec3::new(0.6, 0.0, 0.0)),
    );
    let mut w = ball_world(0.25, 0.6);
    // The platform only moves once the scene is advanced.
    for _ in 0..300 {
        w.tick(&scene).unwrap();
    }
    assert_eq!(ball(&w).as_dynamic().unwrap().motion, MotionState::Resting);

    let start = ball(&w).pos();
    let mut travelled = Vec3::ZERO;
    for _ in 0..30 {
        scene.advance(w.cfg.dt);
        travelled += scene.platform_delta(lift);
        w.tick(&scene).unwrap();
        assert_eq!(ball(&w).as_dynamic().unwrap().motion, MotionState::Resting);
    }
    assert_abs_diff_eq!(ball(&w).pos().x, start.x + travelled.x, epsilon = 1e-4);
    assert_abs_diff_eq!(ball(&w).pos().z, start.z, epsilon = 1e-6);

    scene.remove(lift);
    w.tick(&scene).unwrap();
    assert_eq!(ball(&w).as_dynamic().unwrap().motion, MotionState::Flying);
    assert!(ball(&w).as_dynamic().unwrap().coll_id.is_none());
}

#[test]
fn decal_follows_platform_exactly() {
    let mut scene = StaticScene::new();
    let platform = scene.add(
        SurfaceDesc::new(SurfaceShape::Cube { min: Vec3::splat(-1.0), max: Vec3::splat(1.0) })
            .moving(Vec3::new(0.0, 1.2, -0.6)),
    );
    let mut w = ball_world(0.1, 8.0);
    let id = w
        .gen_decal(Vec3::new(0.0, 0.0, 1.0), 0.2, Vec3::Z, Some(platform), 1.0, Vec4::ONE)
        .unwrap()
        .unwrap();
    let decal_pos = |w: &SimWorld| w.group(id.group).unwrap().get_obj(id.index as usize).unwrap().pos();

    for _ in 0..10 {
        scene.advance(w.cfg.dt);
        let d = scene.platform_delta(platform);
        let before = decal_pos(&w);
        w.tick(&scene).unwrap();
        assert_eq!(decal_pos(&w), before + d);
    }

    scene.remove(platform);
    w.tick(&scene).unwrap();
    assert!(w.group(id.group).unwrap().get_obj(id.index as usize).unwrap().is_dead());
}

#[test]
fn fast_ball_never_tunnels_through_thin_wall() {
    let mut scene = StaticScene::new();
    scene.add(SurfaceDesc::new(SurfaceShape::quad(
        Vec3::new(0.0, -10.0, -10.0),
        Vec3::new(0.0, 10.0, -10.0),
        Vec3::new(0.0, 10.0, 10.0),
        Vec3::new(0.0, -10.0, 10.0),
        0.1,
    )));
    let mut cfg = SimConfig {
        gravity: 0.0,
        spawn_min: Vec3::new(-3.0, 0.0, 0.0),
        spawn_max: Vec3::new(-3.0, 0.0, 0.0),
        ..Default::default()
    };
    let mut g = GroupConfig::new("bullets", ObjKind::Dynamic, 1);
    g.initial_live_count = 1;
    g.props = ObjTypeProps {
        radius: 0.05,
        elasticity: 1.0,
        terminal_vel: 0.0,
        damage_threshold: 1.0e6,
        ..Default::default()
    };
    cfg.groups.push(g);
    let mut w = SimWorld::load(cfg).unwrap();
    for speed in [5.0_f32, 40.0, 200.0, 900.0] {
        {
            let obj = w.group_mut(0).unwrap().get_obj_mut(0).unwrap();
            obj.base.pos = Vec3::new(-3.0, 0.0, 0.0);
            obj.as_dynamic_mut().unwrap().velocity = Vec3::new(speed, 0.0, 0.0);
        }
        for _ in 0..120 {
            w.tick(&scene).unwrap();
            assert!(ball(&w).pos().x < 0.0, "speed {} crossed the wall", speed);
        }
    }
}
