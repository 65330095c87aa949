mod common;

use common::{ModulePlan, Node, TestInit, quiet_options};
use keel_supervisor::{ExitReason, ShutdownReason, SupervisorOptions};

use std::sync::Arc;

#[tokio::test]
async fn test_guarded_task_panic_is_reported_as_task_failure() {
    let node = Node::new();
    let init = Arc::new(TestInit {
        panicking_task: true,
        ..TestInit::with_modules(&[ModulePlan::named("db")])
    });
    let supervisor = node.supervisor_with_options(
        &init,
        SupervisorOptions {
            install_panic_hook: true,
            ..quiet_options()
        },
    );

    let exit = supervisor.run().await;

    assert_eq!(
        exit.reason(),
        &ExitReason::Shutdown(ShutdownReason::TaskFailed {
            task: "sync".to_string(),
            error: "ledger corrupted".to_string(),
        })
    );
    assert_eq!(init.cleanup_counts(), vec![1]);
}
