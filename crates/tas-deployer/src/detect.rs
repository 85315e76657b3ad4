//! Platform classification

use tracing::{debug, info};

use tas_common::{Platform, PlatformDetection, OPENSHIFT_CONFIG_API_GROUP};

use crate::client::KubeClient;

/// Classify the cluster by probing for the OpenShift config API group.
///
/// Probe failures yield `Platform::Unknown`.
pub async fn probe_platform(client: &dyn KubeClient) -> Platform {
    match client.api_group_exists(OPENSHIFT_CONFIG_API_GROUP).await {
        Ok(true) => Platform::OpenShift,
        Ok(false) => Platform::Kubernetes,
        Err(e) => {
            debug!(error = %e, "platform probe failed");
            Platform::Unknown
        }
    }
}

/// Resolve the platform; the probe only runs without a user choice
pub async fn detect_platform(
    client: &dyn KubeClient,
    user_supplied: Platform,
) -> PlatformDetection {
    let auto_detected = if user_supplied.is_known() {
        Platform::Unknown
    } else {
        probe_platform(client).await
    };
    let detection = PlatformDetection::resolve(user_supplied, auto_detected);
    info!(
        user_supplied = %detection.user_supplied,
        auto_detected = %detection.auto_detected,
        discovered = %detection.discovered,
        "platform detection"
    );
    detection
}
