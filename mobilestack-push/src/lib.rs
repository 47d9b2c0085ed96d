//! Push support for MobileStack.
//!
//! - [`ChannelRegistrar`]: records this device's push id in the service's
//!   `pushChannel` table
//! - [`PushRouter`]: renders built-in messages or hands the rest to the app
//! - [`PushRegistry`]: transient subscribers, notified while the process runs

pub mod channel;
pub mod message;
pub mod registry;
pub mod router;

pub use channel::{ChannelRegistrar, PushChannel};
pub use message::{BUILT_IN_TYPE, BuiltIn, NotificationSpec, Presentation, PushMessage};
pub use registry::{PushCallback, PushRegistry};
pub use router::{PushHandler, PushRouter, Routed};

use mobilestack_client::MobileService;

/// Signs the user out of `service` and drops every transient push
/// subscriber of `registry`.
pub fn sign_out(service: &MobileService, registry: &PushRegistry) {
    service.logout();
    registry.clear();
}
