//! Wait condition evaluation
//!
//! Conditions are polled at a fixed interval until they hold or the step's
//! timeout elapses. Transient API errors during a check are retried.

use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, trace};

use tas_common::{Error, Result};
use tas_manifests::{WaitCondition, WaitFor};

use crate::client::{KubeClient, PodSummary};

/// Block until `wait` holds, polling every `poll_interval`
///
/// If the last check before the deadline failed, the timeout error carries
/// that failure.
pub async fn wait_for(
    client: &dyn KubeClient,
    wait: &WaitFor,
    poll_interval: Duration,
) -> Result<()> {
    let matcher = Matcher::new(&wait.condition)?;
    let start = Instant::now();
    let mut last_error: Option<Error> = None;
    debug!(condition = %wait.condition, timeout_secs = wait.timeout.as_secs(), "waiting");

    loop {
        match matcher.check(client).await {
            Ok(true) => {
                debug!(
                    condition = %wait.condition,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "condition met"
                );
                return Ok(());
            }
            Ok(false) => {
                trace!(condition = %wait.condition, "condition not met yet");
                last_error = None;
            }
            Err(e) => {
                debug!(condition = %wait.condition, error = %e, "check failed, retrying");
                last_error = Some(e);
            }
        }

        if start.elapsed() >= wait.timeout {
            let what = match &last_error {
                Some(e) => format!("{} (last check failed: {e})", wait.condition),
                None => wait.condition.to_string(),
            };
            return Err(Error::wait_timeout(what, wait.timeout));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

enum Matcher<'a> {
    PodsRunning { namespace: &'a str, pattern: Regex },
    PodsGone { namespace: &'a str, pattern: Regex },
    NamespaceGone { name: &'a str },
}

impl<'a> Matcher<'a> {
    fn new(condition: &'a WaitCondition) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                Error::internal_with_context("wait", format!("invalid pod pattern {pattern}: {e}"))
            })
        };
        Ok(match condition {
            WaitCondition::PodsRunning { namespace, pattern } => Self::PodsRunning {
                namespace,
                pattern: compile(pattern)?,
            },
            WaitCondition::PodsGone { namespace, pattern } => Self::PodsGone {
                namespace,
                pattern: compile(pattern)?,
            },
            WaitCondition::NamespaceGone { name } => Self::NamespaceGone { name },
        })
    }

    async fn check(&self, client: &dyn KubeClient) -> Result<bool> {
        match self {
            Self::PodsRunning { namespace, pattern } => {
                let pods = client.list_pods(namespace).await?;
                let matching: Vec<&PodSummary> =
                    pods.iter().filter(|p| pattern.is_match(&p.name)).collect();
                Ok(!matching.is_empty() && matching.iter().all(|p| p.is_running()))
            }
            Self::PodsGone { namespace, pattern } => {
                let pods = client.list_pods(namespace).await?;
                Ok(!pods.iter().any(|p| pattern.is_match(&p.name)))
            }
            Self::NamespaceGone { name } => Ok(!client.namespace_exists(name).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockKubeClient;
    use mockall::Sequence;

    const POLL: Duration = Duration::from_secs(2);

    fn pod(name: &str, phase: &str) -> PodSummary {
        PodSummary {
            name: name.to_string(),
            phase: phase.to_string(),
        }
    }

    fn running_wait(timeout: Duration) -> WaitFor {
        WaitFor {
            condition: WaitCondition::pods_running("tas", "rte"),
            timeout,
        }
    }

    // ==========================================================================
    // Story: Waits block until the condition holds
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn when_pods_become_running_wait_returns_after_n_polls() {
        let mut client = MockKubeClient::new();
        let mut seq = Sequence::new();
        client
            .expect_list_pods()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![pod("rte-abc12", "Pending")]));
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![pod("rte-abc12", "Running"), pod("other-x1", "Pending")]));

        wait_for(&client, &running_wait(Duration::from_secs(60)), POLL)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn when_no_pod_matches_running_wait_keeps_polling() {
        let mut client = MockKubeClient::new();
        let mut seq = Sequence::new();
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![pod("rte-abc12", "Running")]));

        wait_for(&client, &running_wait(Duration::from_secs(60)), POLL)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn when_api_errors_are_transient_wait_retries() {
        let mut client = MockKubeClient::new();
        let mut seq = Sequence::new();
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::internal("connection reset")));
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![pod("rte-abc12", "Running")]));

        wait_for(&client, &running_wait(Duration::from_secs(60)), POLL)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn when_condition_never_holds_wait_times_out() {
        let mut client = MockKubeClient::new();
        client
            .expect_list_pods()
            .returning(|_| Ok(vec![pod("rte-abc12", "Pending")]));

        let err = wait_for(&client, &running_wait(Duration::from_secs(10)), POLL)
            .await
            .unwrap_err();
        match err {
            Error::WaitTimeout { timeout, what } => {
                assert_eq!(timeout, Duration::from_secs(10));
                assert!(what.contains("to be running"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn when_checks_keep_failing_timeout_carries_the_cause() {
        let mut client = MockKubeClient::new();
        client
            .expect_list_pods()
            .returning(|_| Err(Error::internal("pods is forbidden")));

        let err = wait_for(&client, &running_wait(Duration::from_secs(10)), POLL)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WaitTimeout { .. }));
        assert!(err.to_string().contains("last check failed"));
        assert!(err.to_string().contains("pods is forbidden"));
    }

    #[tokio::test(start_paused = true)]
    async fn when_a_failure_is_followed_by_a_clean_check_timeout_omits_it() {
        let mut client = MockKubeClient::new();
        let mut seq = Sequence::new();
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::internal("connection reset")));
        client
            .expect_list_pods()
            .returning(|_| Ok(vec![pod("rte-abc12", "Pending")]));

        let err = wait_for(&client, &running_wait(Duration::from_secs(10)), POLL)
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("connection reset"));
    }

    // ==========================================================================
    // Story: Removal waits
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn pods_gone_ignores_unrelated_pods() {
        let mut client = MockKubeClient::new();
        let mut seq = Sequence::new();
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![pod("rte-abc12", "Running")]));
        client
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![pod("unrelated-abc12", "Running")]));

        let wait = WaitFor {
            condition: WaitCondition::pods_gone("tas", "rte"),
            timeout: Duration::from_secs(60),
        };
        wait_for(&client, &wait, POLL).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn namespace_gone_polls_existence() {
        let mut client = MockKubeClient::new();
        let mut seq = Sequence::new();
        client
            .expect_namespace_exists()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        client
            .expect_namespace_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));

        let wait = WaitFor {
            condition: WaitCondition::namespace_gone("tas"),
            timeout: Duration::from_secs(60),
        };
        wait_for(&client, &wait, POLL).await.unwrap();
    }
}
