mod common;

use common::{ModulePlan, Node, TestInit, entries, quiet_options};
use keel_supervisor::{ExitReason, ShutdownReason, Signal, SupervisorOptions};

use std::sync::Arc;

use nix::sys::signal::{Signal as OsSignal, raise};

#[tokio::test]
async fn test_sigint_runs_one_cleanup_pass() {
    let node = Node::new();
    let init = Arc::new(TestInit::with_modules(&[
        ModulePlan::named("db"),
        ModulePlan::named("p2p"),
    ]));
    let supervisor = node.supervisor_with_options(
        &init,
        SupervisorOptions {
            install_signal_handlers: true,
            ..quiet_options()
        },
    );
    let run = tokio::spawn(supervisor.run());

    // Handlers are in place before the node is declared running.
    init.running().await;
    raise(OsSignal::SIGINT).unwrap();
    raise(OsSignal::SIGINT).unwrap();

    let exit = run.await.unwrap();

    assert_eq!(
        exit.reason(),
        &ExitReason::Shutdown(ShutdownReason::Signal(Signal::Interrupt))
    );
    assert_eq!(init.cleanup_counts(), vec![1, 1]);
    assert_eq!(
        entries(&init.journal),
        vec!["bind:db", "bind:p2p", "cleanup:db", "cleanup:p2p", "store:close"]
    );
    assert!(!node.pid_path().exists());
}
