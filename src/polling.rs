//! Drives an order from submission to a terminal outcome.
use crate::error::Result;
use crate::planet::{Order, OrderApi, OrderState};
use crate::request::OrderRequest;
use crate::settings::{PollingSettings, RetryMode};
use std::time::Duration;
use tracing::{info, warn};

pub trait Delay {
    async fn wait(&self, duration: Duration);
}

pub struct TokioDelay;

impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The order finished and its results can be downloaded.
    Succeeded(Order),
    /// The provider ended the order without delivering it.
    Failed(Order),
    /// Attempts ran out while the order was still pending. Holds the last observation.
    GaveUp(Order),
}

impl PollOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::Succeeded(order) | Self::Failed(order) | Self::GaveUp(order) => order,
        }
    }

    fn conclude(order: Order) -> Self {
        if order.state == OrderState::Success {
            Self::Succeeded(order)
        } else if order.state.is_failure() {
            Self::Failed(order)
        } else {
            Self::GaveUp(order)
        }
    }
}

pub struct OrderPoller {
    settings: PollingSettings,
}

impl OrderPoller {
    pub fn new(settings: PollingSettings) -> Self {
        Self { settings }
    }

    /// Submit `request` and check on it up to `max_attempts` times, waiting the cooldown after
    /// every pending observation. The last wait is followed by one final refresh of the order.
    pub async fn run(
        &self,
        api: &impl OrderApi,
        request: &OrderRequest,
        delay: &impl Delay,
    ) -> Result<PollOutcome> {
        let attempts = self.settings.max_attempts.max(1);
        let cooldown = self.settings.cooldown();

        let mut order = api.create_order(request).await?;
        for attempt in 1..=attempts {
            info!(
                "Attempt {}/{}: order {} is {}",
                attempt, attempts, order.id, order.state
            );
            match &order.state {
                OrderState::Success => return Ok(PollOutcome::Succeeded(order)),
                state if state.is_pending() => {
                    info!("Waiting {}s before checking again", cooldown.as_secs());
                    delay.wait(cooldown).await;
                }
                state if state.is_failure() && self.settings.retry_mode == RetryMode::Repoll => {
                    return Ok(PollOutcome::Failed(order));
                }
                state => {
                    warn!(
                        "Order {} is {}: {}",
                        order.id,
                        state,
                        order.last_message.as_deref().unwrap_or("no message")
                    );
                }
            }

            order = if attempt < attempts && self.settings.retry_mode == RetryMode::Recreate {
                info!("Submitting the order again");
                api.create_order(request).await?
            } else {
                api.get_order(&order.id).await?
            };
        }

        info!("Order {} finished checking as {}", order.id, order.state);
        Ok(PollOutcome::conclude(order))
    }
}
