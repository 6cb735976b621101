//! Headset probe: is there a runtime with a head-mounted display attached?

use tracing::info;

use super::lifecycle::Availability;
use super::runtime::{AppIdentity, RuntimeError, XrRuntime};
use crate::engine::EngineResult;

/// Connects, asks for an HMD system, and disconnects. Nothing else is created.
pub fn probe_headset<R: XrRuntime>(
    runtime: &mut R,
    identity: &AppIdentity,
) -> EngineResult<Availability> {
    let instance = match runtime.create_instance(identity) {
        Ok(instance) => instance,
        Err(RuntimeError::LoaderUnavailable(reason)) => {
            info!("probe: no XR runtime ({reason})");
            return Ok(Availability::Unavailable);
        }
        Err(e) => return Err(e.into()),
    };

    let result = match runtime.get_system(instance) {
        Ok(_) => Ok(Availability::Ready),
        Err(RuntimeError::FormFactorUnavailable) => Ok(Availability::Unavailable),
        Err(e) => Err(e.into()),
    };
    runtime.destroy_instance(instance);
    result
}
