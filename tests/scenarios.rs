//! End-to-end scenarios on the reference team layout.

mod helpers;

use helpers::*;
use omniloc::{Engine, LandmarkCovariance, Odometry, TargetReading};

/// Single-robot localization: a lone robot walking 0.1 m per step with a
/// perfect sighting of landmark 0 converges onto the ground-truth track.
#[test]
fn single_robot_localization_converges() {
    let config = reference_builder()
        .playing(vec![true, false, false, false, false])
        .custom_init({
            let mut bounds = point_init(&[[0.0; 3]; 5], [3.0, 0.0, 0.3]);
            // spread robot 0 around its true start, leave the rest pinned
            bounds[0] = -0.5;
            bounds[1] = 0.5;
            bounds[2] = -0.5;
            bounds[3] = 0.5;
            bounds[4] = -0.1;
            bounds[5] = 0.1;
            bounds
        })
        .visibility_heuristics(false)
        .build()
        .unwrap();
    let engine = Engine::new(config, arena_map()).unwrap();

    let mut truth = [0.0_f64; 3];
    for step in 1..=10 {
        let stamp = 0.033 * step as f64;
        engine.on_odometry(
            0,
            stamp,
            Odometry {
                x: 0.1,
                y: 0.0,
                theta: 0.0,
            },
        );
        truth[0] += 0.1;

        let sighting = perfect_landmark_reading(truth, (5.0, 0.0), 0.9);
        engine.on_landmarks(0, stamp, &single_landmark_set(0, sighting));
        engine.on_target(0, stamp, TargetReading::default());
    }

    let belief = engine.robot_belief(0).unwrap();
    assert!(
        (belief.pose[0] - truth[0]).abs() < 0.15,
        "x error {:.3}",
        (belief.pose[0] - truth[0]).abs()
    );
    assert!(
        (belief.pose[1] - truth[1]).abs() < 0.15,
        "y error {:.3}",
        (belief.pose[1] - truth[1]).abs()
    );
    assert!(
        belief.pose[2].abs() < 0.05,
        "heading error {:.3}",
        belief.pose[2]
    );
}

/// Weight-collapse recovery: observations inconsistent with every particle
/// trigger exactly one collapse signal per cycle and leave uniform weights.
#[test]
fn weight_collapse_recovers_once_per_cycle() {
    let config = reference_builder()
        // near-zero bearing variance makes the bogus sighting lethally
        // confident
        .landmark_cov(LandmarkCovariance { k1: 0.2, k2: 1e-9 })
        .visibility_heuristics(false)
        .build()
        .unwrap();
    let playing = config.playing.clone();
    let engine = Engine::new(config, arena_map()).unwrap();
    start_all(&engine, &playing, 0.0);

    for cycle in 1..=5u64 {
        let stamp = 0.033 * cycle as f64;
        // a landmark sighted 140 m away matches no particle on a 6 m field
        let bogus = omniloc::LandmarkReading {
            found: true,
            x: 100.0,
            y: 100.0,
            area_actual: 99.9999,
            area_expected: 100.0,
        };
        engine.on_landmarks(0, stamp, &single_landmark_set(0, bogus));
        engine.on_target(0, stamp, TargetReading::default());

        assert_eq!(
            engine.stats().weight_collapses,
            cycle,
            "one collapse per cycle"
        );
    }

    let snapshot = engine.particles();
    let weights = snapshot.columns.last().unwrap();
    for &w in weights {
        assert!((w - 1.0 / 500.0).abs() < 1e-12, "weights must be uniform");
    }
}

/// Absent robot: robot 2's subparticle columns (3, 4, 5) stay bitwise
/// frozen over 100 full cycles.
#[test]
fn absent_robot_columns_frozen() {
    let config = reference_builder().build().unwrap();
    let playing = config.playing.clone();
    let engine = Engine::new(config, arena_map()).unwrap();
    start_all(&engine, &playing, 0.0);

    let before = engine.particles();
    for cycle in 1..=100 {
        let stamp = 0.033 * cycle as f64;
        for (robot, &p) in playing.iter().enumerate() {
            if !p {
                continue;
            }
            engine.on_odometry(
                robot,
                stamp,
                Odometry {
                    x: 0.05,
                    y: 0.0,
                    theta: 0.01,
                },
            );
            let pose = [1.0 + robot as f64, 0.0, 0.0];
            let sighting = perfect_landmark_reading(pose, (5.0, 0.0), 0.9);
            engine.on_landmarks(robot, stamp, &single_landmark_set(0, sighting));
        }
        engine.on_target(
            0,
            stamp,
            TargetReading {
                found: true,
                x: 1.0,
                y: 0.5,
                z: 0.2,
                mismatch_factor: 1.0,
            },
        );
    }
    let after = engine.particles();

    for column in [3, 4, 5] {
        assert_eq!(
            before.columns[column], after.columns[column],
            "column {} of the absent robot changed",
            column
        );
    }
    // sanity: a playing robot's columns did move
    assert_ne!(before.columns[0], after.columns[0]);
}

/// Target velocity: a target teleporting 0.1 m per 33 ms iteration yields a
/// regression velocity of 0.1/dt on x and zero on y.
#[test]
fn target_velocity_estimate_matches_linear_motion() {
    let dt = 0.0333;
    let config = reference_builder()
        .custom_init(point_init(
            &[[0.0; 3]; 5],
            [1.0, 0.0, 0.2],
        ))
        .build()
        .unwrap();
    let playing = config.playing.clone();
    let engine = Engine::new(config, arena_map()).unwrap();
    start_all(&engine, &playing, 0.0);

    for k in 0..20 {
        let stamp = dt * k as f64;
        engine.on_target(
            0,
            stamp,
            TargetReading {
                found: true,
                x: 1.0 + 0.1 * k as f64, // robot 0 sits at the origin
                y: 0.0,
                z: 0.2,
                mismatch_factor: 1.0,
            },
        );
    }

    let target = engine.target_belief();
    let expected = 0.1 / dt;
    assert!(
        (target.vel[0] - expected).abs() < 0.05 * expected,
        "vx = {:.3}, expected {:.3}",
        target.vel[0],
        expected
    );
    assert!(target.vel[1].abs() < 0.05, "vy = {:.3}", target.vel[1]);
}

/// Main-robot gating: with `main_id = 2`, target messages from robot 0
/// never run the resampler.
#[test]
fn non_main_target_stream_never_resamples() {
    let config = reference_builder().main_id(2).build().unwrap();
    let playing = config.playing.clone();
    let engine = Engine::new(config, arena_map()).unwrap();
    start_all(&engine, &playing, 0.0);

    for k in 0..50 {
        engine.on_target(
            0,
            0.033 * k as f64,
            TargetReading {
                found: true,
                x: 1.0,
                y: 0.0,
                z: 0.2,
                mismatch_factor: 1.0,
            },
        );
    }

    let stats = engine.stats();
    assert_eq!(stats.resamples, 0);
    assert_eq!(stats.iterations, 0);
}

/// Landmark heuristic: seeing post 8 without post 9 forces corner 7
/// unseen for that cycle.
#[test]
fn post_occlusion_heuristic_drops_corner() {
    let config = reference_builder().build().unwrap();
    let playing = config.playing.clone();
    let engine = Engine::new(config, arena_map()).unwrap();
    start_all(&engine, &playing, 0.0);

    let mut set = vec![omniloc::LandmarkReading::default(); 10];
    set[7] = omniloc::LandmarkReading {
        found: true,
        x: 1.5,
        y: 0.5,
        area_actual: 90.0,
        area_expected: 100.0,
    };
    set[8] = omniloc::LandmarkReading {
        found: true,
        x: 2.0,
        y: -0.5,
        area_actual: 90.0,
        area_expected: 100.0,
    };
    engine.on_landmarks(0, 0.1, &set);

    assert!(!engine.landmark_observation(0, 7).unwrap().found);
    assert!(engine.landmark_observation(0, 8).unwrap().found);
    assert!(!engine.landmark_observation(0, 9).unwrap().found);
}
