use std::f64::consts::PI;
use std::sync::Arc;

use rand::Rng;
use serde_json::json;

use sweeprun::{
    AllocationRunner, CompletionState, ExperimentRegistry, ExperimentSchema, FieldValue,
    JobOutcome, MemoryObjectStore, RawRecord, VersionPolicy,
};

/// Standard gravitational parameter of Earth, km^3/s^2.
const MU_EARTH: f64 = 398_600.4418;

fn orbital_dynamics_registry() -> ExperimentRegistry {
    let mut registry = ExperimentRegistry::new();
    registry
        .register_fn(
            "orbital_dynamics",
            ExperimentSchema::builder()
                .float("semi_major_axis", 6_578.0, 100_000.0)
                .float("eccentricity", 0.0, 0.95)
                .float("inclination", 0.0, 180.0)
                .build(),
            ExperimentSchema::builder()
                .float("orbital_period_hours", 0.0, 1.0e9)
                .float("orbital_velocity_km_s", 0.0, 1.0e9)
                .float("apogee_distance_km", 0.0, 1.0e9)
                .float("perigee_distance_km", 0.0, 1.0e9)
                .build(),
            |spec, _ctx| async move {
                let axis = spec
                    .get("semi_major_axis")
                    .and_then(FieldValue::as_float)
                    .unwrap_or_default();
                let eccentricity = spec
                    .get("eccentricity")
                    .and_then(FieldValue::as_float)
                    .unwrap_or_default();

                let orbital_period = 2.0 * PI * (axis.powi(3) / MU_EARTH).sqrt() / 3600.0;
                let perigee = axis * (1.0 - eccentricity);
                let apogee = axis * (1.0 + eccentricity);
                let velocity = (MU_EARTH * (2.0 / perigee - 1.0 / axis)).sqrt();

                let mut out = RawRecord::new();
                out.insert("orbital_period_hours".into(), json!(orbital_period));
                out.insert("orbital_velocity_km_s".into(), json!(velocity));
                out.insert("apogee_distance_km".into(), json!(apogee));
                out.insert("perigee_distance_km".into(), json!(perigee));
                Ok(out)
            },
        )
        .expect("register orbital_dynamics");
    registry
}

fn sample(n: usize) -> Vec<RawRecord> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let mut record = RawRecord::new();
            record.insert(
                "semi_major_axis".into(),
                json!(rng.gen_range(6_700.0..42_164.0)),
            );
            record.insert("eccentricity".into(), json!(rng.gen_range(0.0..0.3)));
            record.insert("inclination".into(), json!(rng.gen_range(0.0..98.0)));
            record
        })
        .collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Sweeprun allocation demo ===\n");

    let registry = orbital_dynamics_registry();
    let runner = AllocationRunner::new(Arc::new(registry), Arc::new(MemoryObjectStore::new()));

    let handle = runner
        .submission("orbital_dynamics")
        .records(sample(10))
        .factor(2)
        .max_depth(2)
        .version_policy(VersionPolicy::Timestamp)
        .submit()
        .await
        .expect("submit orbital_dynamics run");

    println!("run id: {}", handle.run_id());

    let record = handle.result().await;
    match record.completion_state {
        CompletionState::Complete => println!("\n=== Run complete ==="),
        CompletionState::Partial => println!(
            "\n=== Run partial: {} ok, {} failed ===",
            record.success_count(),
            record.error_count()
        ),
        other => println!("\n=== Run finished as {:?} ===", other),
    }

    for (sort_index, outcome) in &record.outcomes {
        match outcome {
            JobOutcome::Success(output) => {
                let period = output
                    .fields
                    .get("orbital_period_hours")
                    .and_then(FieldValue::as_float)
                    .unwrap_or_default();
                println!(
                    "  #{:02} period {:>8.2} h  ({} ms)",
                    sort_index, period, output.metrics.duration_ms
                );
            }
            JobOutcome::Error(error) => {
                println!("  #{:02} {}: {}", sort_index, error.kind, error.message);
            }
        }
    }
}
