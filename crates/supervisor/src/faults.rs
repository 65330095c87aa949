use crate::shutdown::{in_guarded_task, panic_message};
use crate::{ShutdownController, ShutdownReason};

use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_panic::panic_hook;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Route panics into `controller`.
///
/// The panic is logged through `tracing` first, then turned into a
/// [`ShutdownReason::Panic`] trigger. Panics inside guarded tasks are left to
/// the task's guard, which reports them as [`ShutdownReason::TaskFailed`].
/// Only the first call per process installs the hook; later calls return
/// `false`.
pub fn install_panic_hook(controller: &ShutdownController) -> bool {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return false;
    }

    let controller = controller.clone();
    std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        panic_hook(info);

        if in_guarded_task() {
            return;
        }

        let mut message = panic_message(info.payload());
        if let Some(location) = info.location() {
            message = format!("{message} at {location}");
        }

        controller.trigger(ShutdownReason::Panic { message });
    }));

    true
}
