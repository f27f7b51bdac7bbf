//! Queries racing with registrations

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

use super::support::{ready_space, register};
use crate::foundation::math::Vec3;
use crate::geometry::BoundingSphere;
use crate::spatial::{ObjectHandle, SpatialType};

const QUERY_THREADS: u64 = 4;
const QUERIES_PER_THREAD: usize = 400;
const MUTATIONS: usize = 3000;

fn random_sphere(rng: &mut StdRng) -> BoundingSphere {
    BoundingSphere::new(
        Vec3::new(rng.gen_range(-60.0..60.0), rng.gen_range(-10.0..40.0), rng.gen_range(-60.0..60.0)),
        rng.gen_range(0.2..3.0),
    )
}

#[test]
fn test_queries_while_mutating() {
    let space = Arc::new(ready_space());
    let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
    
    // Anchors never move, so every query around one must find it
    let anchors: Vec<(ObjectHandle, Vec3)> = [
        Vec3::new(-40.0, 0.0, -40.0),
        Vec3::new(40.0, 0.0, -40.0),
        Vec3::new(-40.0, 20.0, 40.0),
        Vec3::new(40.0, 20.0, 40.0),
    ]
    .into_iter()
    .map(|center| {
        let handle = handles.insert(());
        register(&space, handle, center, 1.0);
        (handle, center)
    })
    .collect();
    let pool: Vec<ObjectHandle> = (0..256).map(|_| handles.insert(())).collect();
    
    let mutator = {
        let space = Arc::clone(&space);
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(7);
            let mut live: HashMap<ObjectHandle, BoundingSphere> = HashMap::new();
            
            for _ in 0..MUTATIONS {
                let handle = pool[rng.gen_range(0..pool.len())];
                if live.contains_key(&handle) {
                    if rng.gen_bool(0.5) {
                        let sphere = random_sphere(&mut rng);
                        assert!(space.collideable().update(handle, sphere));
                        live.insert(handle, sphere);
                    } else {
                        assert!(space.collideable().remove(handle));
                        live.remove(&handle);
                    }
                } else {
                    let sphere = random_sphere(&mut rng);
                    space.collideable().insert(handle, sphere, SpatialType::COLLIDEABLE);
                    live.insert(handle, sphere);
                }
            }
            live
        })
    };
    
    let queriers: Vec<_> = (0..QUERY_THREADS)
        .map(|seed| {
            let space = Arc::clone(&space);
            let anchors = anchors.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(100 + seed);
                let mut out = Vec::new();
                
                for i in 0..QUERIES_PER_THREAD {
                    let (anchor, center) = anchors[i % anchors.len()];
                    let range = rng.gen_range(1.0..12.0);
                    space.get_nearest(&mut out, center, range, None);
                    
                    assert!(out.contains(&anchor), "anchor missing from query result");
                    let unique: HashSet<_> = out.iter().copied().collect();
                    assert_eq!(unique.len(), out.len(), "duplicate handle in query result");
                }
            })
        })
        .collect();
    
    for querier in queriers {
        querier.join().unwrap();
    }
    let live = mutator.join().unwrap();
    
    // Final index state matches what the mutator believes it registered
    let collideable = space.collideable();
    assert_eq!(collideable.len(), live.len() + anchors.len());
    for (handle, sphere) in &live {
        assert_eq!(collideable.get(*handle).map(|entry| entry.sphere), Some(*sphere));
    }
    
    let mut seen = HashSet::new();
    collideable.for_each_entry(|entry| assert!(seen.insert(entry.handle)));
    assert_eq!(seen.len(), live.len() + anchors.len());
}
