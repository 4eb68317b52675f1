use glam::Vec3;
use dynpool::*;

fn main() -> Result<(), PhysError> {
    let cfg = SimConfig::from_json(
        r#"{
            "spawn_min": [0.0, 0.0, 10.0],
            "spawn_max": [0.0, 0.0, 10.0],
            "enable_timing": true,
            "groups": [
                { "name": "ball", "kind": "dynamic", "max_capacity": 1, "initial_live_count": 1,
                  "props": { "radius": 0.5, "elasticity": 1.0, "flags": ["leaves_decal"] } },
                { "name": "scuffs", "kind": "decal", "max_capacity": 16,
                  "props": { "radius": 0.4, "lifetime": 240 } }
            ]
        }"#,
    )?;

    let mut scene = StaticScene::new();
    let floor = scene.add(SurfaceDesc::new(SurfaceShape::Plane { normal: Vec3::Z, offset: 0.0 }).elasticity(0.5));
    println!("floor={:?}", floor);

    let mut world = SimWorld::load(cfg)?;
    for tick in 0..600 {
        if let Err(e) = world.tick(&scene) {
            println!("tick {}: {}", tick, e);
        }
        for ev in world.drain_events() {
            match ev {
                WorldEvent::Impact { position, speed, .. } => {
                    println!("tick {:3}: impact at z={:.3} speed={:.3}", tick, position.z, speed)
                }
                WorldEvent::Rests { position, surface, .. } => {
                    println!("tick {:3}: rests at z={:.3} on surface {}", tick, position.z, surface.id)
                }
                other => println!("tick {:3}: {:?}", tick, other),
            }
        }
    }

    let mut items = Vec::new();
    world.draw(&mut items);
    for item in &items {
        println!(
            "draw {:?} at ({:.2},{:.2},{:.2}) r={:.2} a={:.2}",
            item.kind, item.position.x, item.position.y, item.position.z, item.radius, item.intensity
        );
    }
    if let Some(t) = world.timing() {
        println!(
            "timing: tick={:.3}ms (groups={:.3}ms reactions={:.3}ms)",
            t.tick_ms, t.groups_ms, t.reactions_ms
        );
    }
    Ok(())
}
