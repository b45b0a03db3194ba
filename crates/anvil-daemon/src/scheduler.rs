//! Interval scheduler driving the three background sweeps the spec
//! assumes an external cron-capable worker pool runs: the timeout
//! reclaimer (§4.7), the retention sweeper (§4.13), and the agreement
//! batch recompute (§4.8). Grounded on `palm-daemon::scheduler::
//! reconciler::Scheduler` — one `Arc<RwLock<bool>>` running flag, one
//! spawned `tokio::time::interval` loop per concern, graceful `stop`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anvil_agreement::batch::{recompute_queue_field, SampleRatings};
use anvil_agreement::{qualitative_band, Rating};
use anvil_audit::{Telemetry, TelemetryEvent};
use anvil_policy::RequeuePolicy;
use anvil_reclaimer::Reclaimer;
use anvil_retention::Retention;
use anvil_storage::traits::{AssignmentStore, LabelFilter, LabelStore, QueueStore, SortOrder};
use anvil_storage::Storage;
use anvil_types::QueueId;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;

pub struct Scheduler<S: Storage, T: Telemetry> {
    config: SchedulerConfig,
    storage: Arc<S>,
    telemetry: Arc<T>,
    default_requeue: RequeuePolicy,
    retention_secret: Vec<u8>,
    running: Arc<RwLock<bool>>,
}

impl<S: Storage + 'static, T: Telemetry + 'static> Scheduler<S, T> {
    pub fn new(
        config: SchedulerConfig,
        storage: Arc<S>,
        telemetry: Arc<T>,
        default_requeue: RequeuePolicy,
        retention_secret: Vec<u8>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            storage,
            telemetry,
            default_requeue,
            retention_secret,
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Spawns the reclaim, retention, and agreement-batch loops as
    /// background tasks and returns immediately; the caller holds the
    /// returned `Arc<Self>` and calls [`Scheduler::stop`] at shutdown.
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }
        info!("scheduler started");

        let reclaim = self.clone();
        tokio::spawn(async move { reclaim.run_loop(reclaim.config.reclaim_interval_secs, |s| s.run_reclaim()).await });

        let retention = self.clone();
        tokio::spawn(async move { retention.run_loop(retention.config.retention_interval_secs, |s| s.run_retention()).await });

        let agreement = self.clone();
        tokio::spawn(async move { agreement.run_loop(agreement.config.agreement_interval_secs, |s| s.run_agreement_batch()).await });
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("scheduler stopping");
    }

    async fn run_loop<F, Fut>(self: Arc<Self>, interval_secs: u64, f: F)
    where
        F: Fn(Arc<Self>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                break;
            }
            f(self.clone()).await;
        }
    }

    async fn run_reclaim(self: Arc<Self>) {
        let queues = match self.storage.list_queues().await {
            Ok(q) => q,
            Err(err) => {
                error!(%err, "reclaim sweep: failed to list queues");
                return;
            }
        };
        let policies: Vec<(QueueId, RequeuePolicy)> =
            queues.iter().map(|q| (q.id, self.default_requeue)).collect();
        let reclaimer = Reclaimer::new(self.storage.clone());
        match reclaimer.sweep(&queues, &policies).await {
            Ok(report) => {
                info!(
                    expired = report.expired,
                    requeued = report.requeued,
                    archived = report.archived,
                    "reclaim sweep complete"
                );
                self.telemetry.emit(
                    TelemetryEvent::new("anvil.reclaimer.sweep")
                        .with_measurement("expired", report.expired as f64)
                        .with_measurement("requeued", report.requeued as f64)
                        .with_measurement("archived", report.archived as f64),
                );
            }
            Err(err) => error!(%err, "reclaim sweep failed"),
        }
    }

    async fn run_retention(self: Arc<Self>) {
        let queues = match self.storage.list_queues().await {
            Ok(q) => q,
            Err(err) => {
                error!(%err, "retention sweep: failed to list queues");
                return;
            }
        };

        let mut pairs = Vec::with_capacity(queues.len());
        for queue in queues {
            match self.storage.get_schema_version(&queue.id, &queue.schema_version_id).await {
                Ok(Some(schema)) => pairs.push((queue, schema)),
                Ok(None) => warn!(queue_id = %queue.id, "retention sweep: active schema version missing"),
                Err(err) => error!(%err, queue_id = %queue.id, "retention sweep: failed to load schema version"),
            }
        }

        let retention = Retention::new(self.storage.clone(), self.retention_secret.clone());
        match retention.sweep(&pairs).await {
            Ok(report) => {
                info!(
                    fields_redacted = report.fields_redacted,
                    labels_touched = report.labels_touched,
                    "retention sweep complete"
                );
                self.telemetry.emit(
                    TelemetryEvent::new("anvil.retention.sweep")
                        .with_measurement("fields_redacted", report.fields_redacted as f64)
                        .with_measurement("labels_touched", report.labels_touched as f64),
                );
            }
            Err(err) => error!(%err, "retention sweep failed"),
        }
    }

    /// §4.8 batch mode: rescans every label under each queue's active
    /// schema version and recomputes agreement from scratch, field by
    /// field. Idempotent — running it twice over unchanged storage
    /// reproduces the same outcome.
    async fn run_agreement_batch(self: Arc<Self>) {
        let queues = match self.storage.list_queues().await {
            Ok(q) => q,
            Err(err) => {
                error!(%err, "agreement batch: failed to list queues");
                return;
            }
        };

        for queue in queues {
            let schema = match self.storage.get_schema_version(&queue.id, &queue.schema_version_id).await {
                Ok(Some(schema)) => schema,
                Ok(None) => continue,
                Err(err) => {
                    error!(%err, queue_id = %queue.id, "agreement batch: failed to load schema version");
                    continue;
                }
            };

            let labels = match self
                .storage
                .list_labels(
                    LabelFilter {
                        tenant: Some(queue.tenant),
                        queue_id: Some(queue.id),
                        schema_version_id: Some(schema.id),
                        ..Default::default()
                    },
                    SortOrder::Asc,
                    None,
                    None,
                    false,
                )
                .await
            {
                Ok(labels) => labels,
                Err(err) => {
                    error!(%err, queue_id = %queue.id, "agreement batch: failed to list labels");
                    continue;
                }
            };
            if labels.is_empty() {
                continue;
            }

            // Labels carry only `assignment_id`; join through the
            // assignment to recover the sample each one belongs to.
            let mut by_sample: BTreeMap<anvil_types::SampleId, Vec<_>> = BTreeMap::new();
            for label in &labels {
                let assignment = match self.storage.get_assignment(&queue.tenant, &label.assignment_id).await {
                    Ok(Some(a)) => a,
                    Ok(None) => continue,
                    Err(err) => {
                        error!(%err, assignment_id = %label.assignment_id, "agreement batch: failed to load assignment");
                        continue;
                    }
                };
                by_sample.entry(assignment.sample_id).or_default().push(label.clone());
            }

            for field in &schema.definition {
                let samples: Vec<SampleRatings> = by_sample
                    .iter()
                    .map(|(sample_id, labels)| SampleRatings {
                        sample_id: sample_id.clone(),
                        ratings: labels.iter().map(|l| l.payload.get(&field.name).map(Rating::from_field_value)).collect(),
                    })
                    .collect();

                match recompute_queue_field(&samples, field.field_type, self.config.agreement_low_score_threshold) {
                    Ok((outcome, should_alert)) => {
                        if should_alert {
                            self.telemetry.emit(
                                TelemetryEvent::new("anvil.agreement.low_score")
                                    .with_metadata("queue_id", queue.id.to_string())
                                    .with_metadata("field", field.name.clone())
                                    .with_metadata("band", qualitative_band(outcome.value))
                                    .with_measurement("value", outcome.value),
                            );
                        }
                    }
                    Err(anvil_agreement::AgreementError::InsufficientLabels(_)) => {}
                }
            }
        }
    }
}
