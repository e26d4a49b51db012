mod common;

use std::sync::Arc;

use anyhow::Result;
use common::Harness;
use riptide_engine::{EngineCoordinator, EngineError};

#[tokio::test]
async fn install_happens_once_per_process() -> Result<()> {
    assert!(matches!(
        EngineCoordinator::global(),
        Err(EngineError::NotInstalled)
    ));

    let first = Harness::new()?;
    let installed = EngineCoordinator::install(first.deps()?)?;
    let second = Harness::new()?;
    let again = EngineCoordinator::install(second.deps()?)?;

    assert!(Arc::ptr_eq(installed, again));
    assert!(Arc::ptr_eq(installed, EngineCoordinator::global()?));
    assert!(!Arc::ptr_eq(installed, &second.engine));
    Ok(())
}
