mod pager;
pub mod time_bound;

use crate::control_plane::{ControlPlane, LogQuery};
use crate::error::{Result, ResultExt};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use futures::TryStreamExt;
use std::collections::BTreeSet;
use std::io::Write;
use time_bound::parse_time_bound;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub container_name: String,
    pub message: String,
}

impl LogEvent {
    /// One output line. The merge orders events by this text.
    pub fn render(&self) -> String {
        format!(
            "{}\t[{}]\t{}",
            self.timestamp
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            self.container_name,
            self.message
        )
    }
}

/// Filters for a log query. Empty strings mean "not set".
#[derive(Debug, Clone, Default)]
pub struct LogsOptions {
    pub container_name: String,
    pub filter_pattern: String,
    pub start_time: String,
    pub end_time: String,
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub struct LogAggregator<'a, C: ControlPlane> {
    client: &'a C,
}

impl<'a, C: ControlPlane> LogAggregator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        LogAggregator { client }
    }

    /// Collects events from every selected container of `service_name` and
    /// returns them as one chronologically ordered list.
    pub async fn collect(
        &self,
        service_name: &str,
        options: &LogsOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<LogEvent>> {
        let start_time = parse_time_bound("--start-time", &options.start_time, now)?;
        let end_time = parse_time_bound("--end-time", &options.end_time, now)?;
        let containers = self.containers(service_name, &options.container_name).await?;
        debug!(?containers, ?start_time, ?end_time, "querying logs");

        let mut events = Vec::new();
        for container_name in containers {
            let query = LogQuery {
                service_name: service_name.to_string(),
                container_name,
                start_time,
                end_time,
                filter_pattern: non_empty(&options.filter_pattern),
            };
            let container_events: Vec<LogEvent> = pager::container_pages(self.client, query)
                .try_concat()
                .await
                .context("failed to get container log")?;
            events.extend(container_events);
        }

        info!(events = events.len(), "collected log events");
        Ok(merge(events))
    }

    /// Sorted container names to query: the explicit one, or every container
    /// in the current and pending deployments.
    async fn containers(&self, service_name: &str, container_name: &str) -> Result<BTreeSet<String>> {
        if !container_name.is_empty() {
            return Ok(BTreeSet::from([container_name.to_string()]));
        }
        let state = self
            .client
            .get_service_state(service_name)
            .await
            .and_then(|lookup| lookup.require(service_name))
            .context("failed to get container service")?;
        Ok(state.live_container_names())
    }
}

/// Stable sort by rendered line. Events that render identically keep the
/// order they were collected in.
pub fn merge(mut events: Vec<LogEvent>) -> Vec<LogEvent> {
    events.sort_by_cached_key(LogEvent::render);
    events
}

pub fn print_events(events: &[LogEvent], out: &mut dyn Write) -> Result<()> {
    for event in events {
        writeln!(out, "{}", event.render())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerSpec, DeploymentSpec, RemoteDeployment, RemoteServiceState};
    use crate::control_plane::fake::{Call, FakeControlPlane};
    use crate::control_plane::{LogPage, RemoteLogEvent};
    use crate::error::Error;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, second).unwrap()
    }

    fn page(events: &[(u32, &str)], next: Option<&str>) -> LogPage {
        LogPage {
            events: events
                .iter()
                .map(|(second, message)| RemoteLogEvent {
                    created_at: at(*second),
                    message: message.to_string(),
                })
                .collect(),
            next_page_token: next.map(str::to_string),
        }
    }

    fn deployment(names: &[&str]) -> RemoteDeployment {
        let mut spec = DeploymentSpec::default();
        for name in names {
            spec.containers.insert(name.to_string(), ContainerSpec::default());
        }
        RemoteDeployment {
            spec,
            ..Default::default()
        }
    }

    fn three_containers() -> FakeControlPlane {
        let mut fake = FakeControlPlane {
            service: Some(RemoteServiceState {
                container_service_name: "web".into(),
                current_deployment: Some(deployment(&["c", "a"])),
                next_deployment: Some(deployment(&["b", "a"])),
                ..Default::default()
            }),
            ..Default::default()
        };
        fake.pages.insert("a".into(), vec![page(&[(1, "a1"), (40, "a2")], None)]);
        fake.pages.insert(
            "b".into(),
            vec![page(&[(5, "b1")], Some("1")), page(&[(30, "b2")], None)],
        );
        fake.pages.insert("c".into(), vec![page(&[(3, "c1"), (50, "c2")], None)]);
        fake
    }

    #[tokio::test]
    async fn merges_paginated_containers_chronologically() {
        let fake = three_containers();
        let events = LogAggregator::new(&fake)
            .collect("web", &LogsOptions::default(), at(0))
            .await
            .unwrap();

        let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["a1", "c1", "b1", "b2", "a2", "c2"]);

        let lines: Vec<String> = events.iter().map(LogEvent::render).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);

        let log_calls: Vec<(String, Option<String>)> = fake
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::GetContainerLogPage(query, token) => Some((query.container_name, token)),
                _ => None,
            })
            .collect();
        assert_eq!(
            log_calls,
            vec![
                ("a".to_string(), None),
                ("b".to_string(), None),
                ("b".to_string(), Some("1".to_string())),
                ("c".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn explicit_container_skips_discovery() {
        let fake = three_containers();
        let options = LogsOptions {
            container_name: "b".into(),
            filter_pattern: "ERROR".into(),
            start_time: "1h".into(),
            ..Default::default()
        };
        let events = LogAggregator::new(&fake).collect("web", &options, at(0)).await.unwrap();

        assert_eq!(events.len(), 2);
        let calls = fake.calls();
        assert!(!calls.iter().any(|call| matches!(call, Call::GetServiceState(_))));
        match &calls[0] {
            Call::GetContainerLogPage(query, None) => {
                assert_eq!(query.filter_pattern.as_deref(), Some("ERROR"));
                assert_eq!(query.start_time, Some(at(0) - chrono::Duration::hours(1)));
                assert_eq!(query.end_time, None);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn bad_bound_fails_before_any_remote_call() {
        let fake = three_containers();
        let options = LogsOptions {
            start_time: "last tuesday".into(),
            ..Default::default()
        };
        let err = LogAggregator::new(&fake).collect("web", &options, at(0)).await.unwrap_err();

        assert!(err.to_string().contains("--start-time"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_service_is_not_found() {
        let fake = FakeControlPlane::default();
        let err = LogAggregator::new(&fake)
            .collect("web", &LogsOptions::default(), at(0))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::NotFound(name) if name == "web"));
    }

    #[test]
    fn merge_orders_by_rendered_line() {
        let event = |container: &str, second| LogEvent {
            timestamp: at(second),
            container_name: container.to_string(),
            message: "same".to_string(),
        };
        let merged = merge(vec![event("b", 2), event("a", 2), event("a", 1), event("a", 2)]);
        let order: Vec<(&str, u32)> = merged
            .iter()
            .map(|e| (e.container_name.as_str(), chrono::Timelike::second(&e.timestamp)))
            .collect();
        assert_eq!(order, [("a", 1), ("a", 2), ("a", 2), ("b", 2)]);
    }
}
