//! Device and host API listing.

use std::fmt;

use crate::backend::{AudioBackend, CpalBackend, DeviceInfo, HostApiInfo};
use crate::StreamAudioError;

/// Lists every device on the default CPAL host.
///
/// The returned ids are the values accepted by
/// [`AudioOptions::device_id`](crate::AudioOptions::device_id).
///
/// # Errors
///
/// `BackendError` if the host cannot enumerate its devices.
pub fn list_devices() -> Result<Vec<DeviceInfo>, StreamAudioError> {
    list_devices_with(&CpalBackend::new())
}

/// Lists every device known to `backend`.
pub fn list_devices_with(backend: &dyn AudioBackend) -> Result<Vec<DeviceInfo>, StreamAudioError> {
    let devices = backend.devices()?;
    tracing::debug!(backend = backend.name(), count = devices.len(), "Listed devices");
    Ok(devices)
}

/// Lists the host APIs CPAL was compiled with on this platform.
pub fn list_host_apis() -> Result<Vec<HostApiInfo>, StreamAudioError> {
    list_host_apis_with(&CpalBackend::new())
}

/// Lists the host APIs known to `backend`.
pub fn list_host_apis_with(
    backend: &dyn AudioBackend,
) -> Result<Vec<HostApiInfo>, StreamAudioError> {
    backend.host_apis()
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} in, {} out, {}Hz, {})",
            self.id,
            self.name,
            self.max_input_channels,
            self.max_output_channels,
            self.default_sample_rate,
            self.host_api
        )
    }
}

impl fmt::Display for HostApiInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({} devices)", self.id, self.name, self.device_count)?;
        if self.is_default {
            f.write_str(" default")?;
        }
        Ok(())
    }
}
