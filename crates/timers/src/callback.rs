//! The capability every scheduled action provides.

use std::any::Any;
use std::fmt;

use tickq_core::Result;

use crate::queue::TimerQueue;

/// An action stored in a [`TimerQueue`] and fired on a later tick.
///
/// Variants are plain values. Anything they act on at fire time is resolved
/// through the host context `C`, which the queue never inspects. A variant
/// becomes persistable once its concrete type is registered with a
/// [`CallbackRegistry`](crate::CallbackRegistry).
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Say {
///     #[serde(rename = "Text")]
///     text: String,
/// }
///
/// impl Callback<Vec<String>> for Say {
///     fn invoke(&self, out: &mut Vec<String>, _: &mut TimerQueue<Vec<String>>, _: i64) -> Result<()> {
///         out.push(self.text.clone());
///         Ok(())
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Callback<C>: Any + fmt::Debug + Send + Sync {
    /// Run the action.
    ///
    /// The owning event has already been removed from `queue`, so the
    /// callback may freely schedule or cancel events, including rescheduling
    /// itself.
    ///
    /// # Errors
    ///
    /// Whatever the action reports; the queue forwards it to the caller of
    /// [`TimerQueue::tick`] and does not retry.
    fn invoke(&self, context: &mut C, queue: &mut TimerQueue<C>, current_tick: i64) -> Result<()>;

    /// The concrete value, used by the registry to pick the variant's schema.
    fn as_any(&self) -> &dyn Any;
}
