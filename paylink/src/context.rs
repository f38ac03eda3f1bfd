//! Request-scoped storage for the paying wallet.
//!
//! The payer's [`WalletId`] is installed once per inbound request and read by
//! the [`PaymentGate`](crate::gate::PaymentGate) without being threaded through
//! the tool's call signature. Storage is task-local: a value installed by one
//! request's task is never observable from another task, even when both run
//! interleaved on the same worker thread.
//!
//! # Usage
//!
//! ```rust
//! use paylink::context;
//! use paylink::WalletId;
//!
//! # async fn demo() -> Result<(), paylink::ContextError> {
//! context::scope(async {
//!     let guard = context::set(WalletId::new("w1"))?;
//!     assert_eq!(context::get(), Some(WalletId::new("w1")));
//!     context::clear(guard);
//!     assert_eq!(context::get(), None);
//!     Ok::<(), paylink::ContextError>(())
//! })
//! .await
//! # }
//! ```
//!
//! A [`WalletGuard`] restores the previous value when it is dropped, so the
//! restore runs exactly once on every exit path, including `?` returns,
//! panics, and cancellation of the enclosing future.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

use tokio::task::futures::TaskLocalFuture;

use crate::error::ContextError;
use crate::wallet::WalletId;

tokio::task_local! {
    static PAYER_WALLET: RefCell<Option<WalletId>>;
}

/// Future returned by [`with_wallet`] and [`scope`].
pub type WalletScope<F> = TaskLocalFuture<RefCell<Option<WalletId>>, F>;

/// Runs `future` with `wallet` as the current payer wallet.
///
/// The value is visible to everything `future` awaits on the same task and is
/// discarded when `future` completes or is dropped.
pub fn with_wallet<F: Future>(wallet: Option<WalletId>, future: F) -> WalletScope<F> {
    PAYER_WALLET.scope(RefCell::new(wallet), future)
}

/// Runs `future` with an empty wallet slot that [`set`] can fill.
pub fn scope<F: Future>(future: F) -> WalletScope<F> {
    with_wallet(None, future)
}

/// Installs `wallet` for the current task.
///
/// # Errors
///
/// Returns [`ContextError`] when called outside [`scope`] / [`with_wallet`].
pub fn set(wallet: WalletId) -> Result<WalletGuard, ContextError> {
    let previous = PAYER_WALLET
        .try_with(|slot| slot.replace(Some(wallet)))
        .map_err(|_| ContextError)?;
    Ok(WalletGuard {
        previous: Some(previous),
        _not_send: PhantomData,
    })
}

/// Returns the wallet installed for the current task, if any.
#[must_use]
pub fn get() -> Option<WalletId> {
    PAYER_WALLET
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Returns the wallet installed for the current task, or `default`.
#[must_use]
pub fn get_or(default: WalletId) -> WalletId {
    get().unwrap_or(default)
}

/// Returns `true` if the current task runs inside a wallet scope.
#[must_use]
pub fn is_scoped() -> bool {
    PAYER_WALLET.try_with(|_| ()).is_ok()
}

/// Restores the value that was current before the matching [`set`].
pub fn clear(guard: WalletGuard) {
    drop(guard);
}

/// Restore handle returned by [`set`].
///
/// The guard restores into whichever slot is current where it is dropped, so
/// it must stay on the task that created it and is not [`Send`]:
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<paylink::context::WalletGuard>();
/// ```
#[derive(Debug)]
#[must_use = "dropping the guard immediately restores the previous wallet"]
pub struct WalletGuard {
    previous: Option<Option<WalletId>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WalletGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Outside the owning scope there is nothing left to restore.
            let _ = PAYER_WALLET.try_with(|slot| slot.replace(previous));
        }
    }
}
