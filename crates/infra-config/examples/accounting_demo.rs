//! Walkthrough: registry + file-backed limits + headroom + report.
//!
//! Run with: cargo run -p gantry-infra-config --example accounting_demo

use anyhow::Result;
use gantry_core::application::{LimitReconciler, UsageRegistry};
use gantry_core::domain::{Headroom, ResourceVector};
use gantry_infra_config::FileLimitSource;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LIMITS: &str = r#"
[[queues]]
path = "root.engineering"
max_applications = 3
[queues.max_resources]
mem = 50
vcore = 50

[[queues]]
path = "root.engineering.ci"
[queues.max_resources]
mem = 20
vcore = 20
"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gantry=debug")),
        )
        .init();

    let registry = UsageRegistry::new();
    let reconciler = LimitReconciler::new(Arc::new(FileLimitSource::from_toml_str(LIMITS)));
    reconciler.reconcile(&registry).await?;

    let ci: &[&str] = &["root", "engineering", "ci"];
    let delta = ResourceVector::from_pairs([("mem", 10), ("vcore", 10)]);

    registry.increase("ann", ci, "build-1", &delta)?;
    registry.increase("ann", ci, "build-2", &delta)?;

    // the ci queue is now at its 20/20 cap; this one must bounce
    match registry.increase("ann", ci, "build-3", &delta) {
        Err(error) => println!("rejected as expected: {error}"),
        Ok(()) => anyhow::bail!("charge over the ci cap was admitted"),
    }

    match registry.headroom("ann", ci) {
        Headroom::Limited(room) => println!("headroom at {}: {room}", ci.join(".")),
        Headroom::Unbounded => println!("no limit known at {}", ci.join(".")),
    }

    println!("{}", registry.report().to_json()?);

    registry.decrease("ann", ci, "build-1", &delta, true)?;
    registry.decrease("ann", ci, "build-2", &delta, true)?;
    println!("tracked users after drain: {:?}", registry.tracked_users());
    Ok(())
}
