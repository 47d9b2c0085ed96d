//! Device registration with the service's push channel table.

use mobilestack_client::{ClientResult, MobileService, Table};
use mobilestack_model::{Declaration, TableEntity};
use tracing::info;

/// A row of the `pushChannel` table: one device registration id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushChannel {
    pub id: i32,
    pub reg_id: String,
}

impl PushChannel {
    pub fn new(reg_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            reg_id: reg_id.into(),
        }
    }
}

impl TableEntity for PushChannel {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("pushChannel")
            .key("id", |c| &c.id, |c| &mut c.id)
            .column("regId", |c| &c.reg_id, |c| &mut c.reg_id)
    }
}

/// Registers and unregisters this device's push id with the service.
pub struct ChannelRegistrar {
    channels: Table<PushChannel>,
}

impl ChannelRegistrar {
    pub fn new(service: &MobileService) -> ClientResult<Self> {
        Ok(Self {
            channels: service.table::<PushChannel>()?,
        })
    }

    /// Inserts a channel row for `reg_id`. Keeping one row per id is the
    /// server script's job.
    pub fn register(&self, reg_id: &str) -> ClientResult<PushChannel> {
        let mut channel = PushChannel::new(reg_id);
        self.channels.insert(&mut channel)?;
        info!(reg_id, id = channel.id, "registered push channel");
        Ok(channel)
    }

    /// Deletes every channel row for `reg_id`, returning how many there were.
    pub fn unregister(&self, reg_id: &str) -> ClientResult<usize> {
        let channels = self.channels.query().equal("regId", reg_id).select()?;
        for channel in &channels {
            self.channels.delete(channel)?;
        }
        info!(reg_id, removed = channels.len(), "unregistered push channel");
        Ok(channels.len())
    }
}
