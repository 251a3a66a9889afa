use crate::error::Result;
use crate::planet::{AssetApi, Order, ResultLink};
use crate::polling::PollOutcome;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info, warn};

const FALLBACK_NAME: &str = "asset";

pub const PLAN_FILE_NAME: &str = "download_plan.json";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DownloadTask {
    location: String,
    output: PathBuf,
}

impl DownloadTask {
    pub fn new(location: &str, output: PathBuf) -> Self {
        DownloadTask {
            location: location.to_string(),
            output,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    order_id: String,
    tasks: Vec<DownloadTask>,
    /// Results the provider could not deliver.
    skipped: Vec<ResultLink>,
}

/// What a run of [`DownloadPlan::execute`] did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DownloadReport {
    pub downloaded: Vec<PathBuf>,
    pub already_present: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

impl DownloadPlan {
    /// One task per delivered result of `order`, written below `output_dir` under the result's
    /// name.
    pub fn from_order(order: &Order, output_dir: &Path) -> Self {
        let (delivered, skipped): (Vec<_>, Vec<_>) = order
            .links
            .results
            .iter()
            .cloned()
            .partition(ResultLink::is_delivered);

        for link in skipped.iter() {
            warn!(
                "Skipping {} (delivery: {})",
                link.name,
                if link.delivery.is_empty() { "unknown" } else { link.delivery.as_str() }
            );
        }

        let tasks = delivered
            .iter()
            .map(|link| DownloadTask::new(&link.location, output_dir.join(sanitize(&link.name))))
            .collect();

        Self {
            order_id: order.id.to_owned(),
            tasks,
            skipped,
        }
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn skipped(&self) -> &[ResultLink] {
        &self.skipped
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let plan: Self = serde_json::from_str(&content)?;
        Ok(plan)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub async fn execute(&self, api: &impl AssetApi) -> Result<DownloadReport> {
        let mut report = DownloadReport {
            skipped: self.skipped.iter().map(|l| l.name.to_owned()).collect(),
            ..Default::default()
        };
        for (i, task) in self.tasks.iter().enumerate() {
            info!(
                "Download {}/{} of order {}: {:?}",
                i + 1,
                self.tasks.len(),
                self.order_id,
                task.output
            );
            if try_download(api, &task.location, &task.output).await? {
                report.downloaded.push(task.output.clone());
            } else {
                report.already_present.push(task.output.clone());
            }
        }
        Ok(report)
    }
}

/// How an order ended once polling and downloading are over.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Downloaded(DownloadReport),
    /// Still pending when the attempts ran out, nothing was downloaded.
    Pending(Order),
    /// Ended by the provider, nothing was downloaded.
    Failed(Order),
}

impl Delivery {
    /// A pending order is not an error: it can be picked up later.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Download the results of a succeeded order into `output_dir`, next to its download plan. Other
/// outcomes touch neither the file system nor `api`.
pub async fn deliver(
    outcome: PollOutcome,
    output_dir: &Path,
    api: &impl AssetApi,
) -> Result<Delivery> {
    let order = match outcome {
        PollOutcome::Succeeded(order) => order,
        PollOutcome::GaveUp(order) => {
            info!("Order {} is still {}, not downloading", order.id, order.state);
            return Ok(Delivery::Pending(order));
        }
        PollOutcome::Failed(order) => {
            error!(
                "Order {} ended as {}: {}",
                order.id,
                order.state,
                order.last_message.as_deref().unwrap_or("no message")
            );
            return Ok(Delivery::Failed(order));
        }
    };

    fs::create_dir_all(output_dir)?;
    let plan = DownloadPlan::from_order(&order, output_dir);
    plan.write(output_dir.join(PLAN_FILE_NAME))?;

    let report = plan.execute(api).await?;
    Ok(Delivery::Downloaded(report))
}

/// Returns false when `output` already exists and nothing was fetched.
pub async fn try_download(api: &impl AssetApi, location: &str, output: &Path) -> Result<bool> {
    if output.exists() {
        info!("Output file already exists");
        return Ok(false);
    }

    if let Some(parent_dir) = output.parent() {
        fs::create_dir_all(parent_dir)?;
    }

    // always starts from scratch, a stale partial file is overwritten
    let mut partial = output.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let response = api.download_asset(location).await?;
    let mut partial_file = File::create(&partial)?;
    let mut byte_count: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(bytes) = stream.next().await {
        let bytes = bytes?;
        partial_file.write_all(&bytes)?;
        byte_count += bytes.len() as u64;
    }
    partial_file.flush()?;

    info!("Download complete ({} bytes)", byte_count);
    fs::rename(partial, output)?;

    Ok(true)
}

/// Relative path for a result name that cannot leave the output directory.
fn sanitize(name: &str) -> PathBuf {
    let path: PathBuf = Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if path.as_os_str().is_empty() {
        PathBuf::from(FALLBACK_NAME)
    } else {
        path
    }
}
