//! # Managed devices.
//!
//! - [`DeviceDescriptor`] identifies one vehicle (logical id, address, credential).
//! - [`Credential`] holds its private key material.

mod credential;

use std::sync::Arc;

pub use credential::Credential;

/// Identifies one managed device. Immutable for the process lifetime.
#[derive(Clone, Debug)]
pub struct DeviceDescriptor {
    id: Arc<str>,
    address: Arc<str>,
    credential: Credential,
}

impl DeviceDescriptor {
    /// Creates a descriptor.
    ///
    /// `id` is the stable logical id used in topics; `address` (the VIN) is only
    /// handed to the transport.
    pub fn new(id: impl Into<Arc<str>>, address: impl Into<Arc<str>>, credential: Credential) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            credential,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}
