//! Receiver notification run.
//!
//! Fetches the receivers from the portal, looks up the latest net worth of
//! every fund each receiver follows, and sends each receiver one message
//! listing its funds.

use anyhow::Result;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::api::{ApiError, PortalApi, RequestOptions};
use crate::cache::manager::FUND_TARGETS_PATH;
use crate::cache::FundTargetCache;
use crate::config::Config;
use crate::models::Receiver;
use crate::notify::{Notifier, NotifyError};
use crate::scraper::{NetWorthSource, NOT_FOUND};
use crate::utils::truncate_string;

/// Portal path of the receiver collection
pub const RECEIVERS_PATH: &str = "receivers/";

/// Longest message preview written to the log
const LOG_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotifySummary {
    pub sent: usize,
    pub failed: usize,
}

/// Receivers from the portal; an absent result is logged and treated as none
pub async fn fetch_receivers(api: &PortalApi) -> Result<Vec<Receiver>, ApiError> {
    match api.get::<Vec<Receiver>>(RequestOptions::new()).await?.into_data() {
        Some(receivers) => Ok(receivers),
        None => {
            warn!(url = api.url(), "Receivers unavailable");
            Ok(Vec::new())
        }
    }
}

/// Fill in `net_worth` on every receiver target. Codes without a known URL
/// get the not-found sentinel.
pub async fn attach_net_worth<S: NetWorthSource>(
    receivers: &mut [Receiver],
    targets: &FundTargetCache,
    scraper: &S,
) {
    for receiver in receivers.iter_mut() {
        for target in receiver.targets.iter_mut() {
            let net_worth = match targets.url_for(&target.code) {
                Some(url) => scraper.fetch_net_worth(url).await,
                None => {
                    warn!(receiver = %receiver.name, code = %target.code, "No URL for fund target");
                    NOT_FOUND.to_string()
                }
            };
            target.net_worth = Some(net_worth);
        }
    }
}

/// `<name>: <targets as JSON>`
pub fn format_message(receiver: &Receiver) -> String {
    let data = serde_json::to_string(&receiver.targets).unwrap_or_else(|_| "[]".to_string());
    format!("{}: {}", receiver.name, data)
}

/// Send every receiver its message. One failed send does not stop the rest.
pub async fn notify_receivers<N: Notifier>(receivers: &[Receiver], notifier: &N) -> NotifySummary {
    let mut summary = NotifySummary::default();
    for receiver in receivers {
        let message = format_message(receiver);
        info!(
            receiver = %receiver.name,
            message = %truncate_string(&message, LOG_PREVIEW_CHARS),
            "Notifying receiver"
        );

        let token = receiver.line_token.as_deref().unwrap_or_default();
        match notifier.send(token, &message).await {
            Ok(()) => summary.sent += 1,
            Err(NotifyError::MissingToken) => {
                warn!(receiver = %receiver.name, "Receiver has no line token, skipping");
                summary.failed += 1;
            }
            Err(e) => {
                error!(receiver = %receiver.name, error = %e, "Notification failed");
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Full run: receivers, fund targets, scrape, notify. Both portal clients
/// share `client`'s connection pool.
pub async fn run<S: NetWorthSource, N: Notifier>(
    config: &Config,
    client: &Client,
    scraper: &S,
    notifier: &N,
) -> Result<NotifySummary> {
    let receivers_api = PortalApi::from_config(config, client, RECEIVERS_PATH)?;
    let mut receivers = fetch_receivers(&receivers_api).await?;
    if receivers.is_empty() {
        info!("No receivers to notify");
        return Ok(NotifySummary::default());
    }

    let mut targets = FundTargetCache::new();
    if receivers.iter().any(|r| !r.targets.is_empty()) {
        let targets_api = PortalApi::from_config(config, client, FUND_TARGETS_PATH)?;
        targets.load(&targets_api).await?;
    }

    attach_net_worth(&mut receivers, &targets, scraper).await;
    let summary = notify_receivers(&receivers, notifier).await;
    info!(sent = summary.sent, failed = summary.failed, "Notification run finished");
    Ok(summary)
}
