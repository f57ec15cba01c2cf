//! Channel primitives shared by every host
//!
//! - **[`Relay`]** - sending half, held by the host per observer registration
//! - **[`Subscription`]** - receiving half as a `Stream`, with explicit unsubscribe

pub mod relay;
pub mod subscription;

pub use relay::Relay;
pub use subscription::Subscription;
