//! Ctrl-C handling
//!
//! The listener runs on its own thread with a current-thread runtime; the
//! library's blocking transport must not run inside an async context.

use mon_core::CancelToken;

/// Cancel `token` on the first Ctrl-C. A second Ctrl-C terminates the process.
pub fn cancel_on_ctrl_c(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("monforge-signals".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_io().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "Ctrl-C handling unavailable");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                tracing::warn!("interrupt received; finishing in-flight steps and rolling back");
                token.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(crate::error::exit::CANCELLED);
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not start the signal listener");
    }
}
