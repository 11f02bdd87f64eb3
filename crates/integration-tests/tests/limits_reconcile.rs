// Reconcile flow: limits file -> provider -> registry -> enforcement

use anyhow::Result;
use gantry_core::application::{LimitReconciler, UsageRegistry};
use gantry_core::domain::{Headroom, ResourceVector};
use gantry_infra_config::FileLimitSource;
use std::fs;
use std::sync::Arc;

fn res(pairs: &[(&str, i64)]) -> ResourceVector {
    ResourceVector::from_pairs(pairs.iter().map(|(d, v)| (*d, *v)))
}

#[tokio::test]
async fn test_limits_file_round_trip() -> Result<()> {
    let path = std::env::temp_dir().join(format!("gantry-limits-{}.toml", uuid::Uuid::new_v4()));
    fs::write(
        &path,
        r#"
        [[queues]]
        path = "root.engineering"
        max_applications = 1
        [queues.max_resources]
        mem = 30
        "#,
    )?;

    let registry = UsageRegistry::new();
    let reconciler = LimitReconciler::new(Arc::new(FileLimitSource::new(&path)));
    reconciler.reconcile(&registry).await?;
    fs::remove_file(&path)?;

    registry.increase(
        "ann",
        &["root", "engineering"],
        "app-1",
        &res(&[("mem", 10)]),
    )?;

    // second distinct application bounces on the app ceiling
    let err = registry
        .increase("ann", &["root", "engineering"], "app-2", &res(&[("mem", 1)]))
        .unwrap_err();
    assert!(matches!(
        err,
        gantry_core::AppError::Domain(
            gantry_core::domain::DomainError::ApplicationQuotaExceeded { .. }
        )
    ));

    assert_eq!(
        registry.headroom("ann", &["root", "engineering"]),
        Headroom::Limited(res(&[("mem", 20)]))
    );
    Ok(())
}

#[tokio::test]
async fn test_reconcile_before_any_tree_exists() -> Result<()> {
    let registry = UsageRegistry::new();
    let source = FileLimitSource::from_toml_str(
        r#"
        [[queues]]
        path = "root.batch"
        [queues.max_resources]
        vcore = 4
        "#,
    );

    // nothing live yet: zero applications, but the set is stored
    let applied = LimitReconciler::new(Arc::new(source))
        .reconcile(&registry)
        .await?;
    assert_eq!(applied, 0);

    // the first tree for any user comes up already limited
    registry.increase("bob", &["root", "batch"], "app-1", &res(&[("vcore", 4)]))?;
    let err = registry
        .increase("bob", &["root", "batch"], "app-2", &res(&[("vcore", 1)]))
        .unwrap_err();
    assert!(matches!(err, gantry_core::AppError::Domain(_)));
    Ok(())
}

#[tokio::test]
async fn test_disjoint_dimension_limits_across_levels() -> Result<()> {
    let registry = UsageRegistry::new();
    let source = FileLimitSource::from_toml_str(
        r#"
        [[queues]]
        path = "root.ml"
        [queues.max_resources]
        gpu = 1

        [[queues]]
        path = "root.ml.training"
        [queues.max_resources]
        mem = 20
        vcore = 20
        "#,
    );
    LimitReconciler::new(Arc::new(source))
        .reconcile(&registry)
        .await?;

    registry.increase(
        "ann",
        &["root", "ml", "training"],
        "app-1",
        &res(&[("mem", 10), ("vcore", 10)]),
    )?;

    // each level only constrains the dimensions it tracks; the merge is the
    // union with the per-dimension minimum
    assert_eq!(
        registry.headroom("ann", &["root", "ml", "training"]),
        Headroom::Limited(res(&[("mem", 10), ("vcore", 10), ("gpu", 1)]))
    );
    Ok(())
}
