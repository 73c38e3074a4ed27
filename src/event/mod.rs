//! Event points: the sender side of the engine.
//!
//! ## Contents
//! - [`EventPoint`] owned by its sender; fires connections and disconnects them on drop
//! - [`EventRef`] weak handle, usable from inside callbacks
//!
//! Both share one `EventCore` holding the point's identities and its
//! [`BorrowRegistry`](crate::registry::BorrowRegistry) of connections.

mod core;
mod handle;
mod point;

pub use handle::EventRef;
pub use point::EventPoint;
