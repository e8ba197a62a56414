use super::command_reader::Command;
use crate::application::engine::MarketplaceEngine;
use crate::application::settlement::SettlementScheduler;
use crate::domain::ids::{OrderId, ServiceId, UserId, WithdrawalId};
use crate::domain::order::NewOrder;
use crate::domain::withdrawal::Destination;
use crate::error::{EngineError, Result};
use crate::config;
use crate::infrastructure::clock::ManualClock;
use std::collections::HashMap;
use std::sync::Arc;

/// Applies script commands to an engine running on a simulated clock.
pub struct Replayer {
    engine: Arc<MarketplaceEngine>,
    clock: Arc<ManualClock>,
    scheduler: SettlementScheduler,
    orders: HashMap<String, OrderId>,
    withdrawals: HashMap<String, WithdrawalId>,
}

impl Replayer {
    pub fn new(engine: Arc<MarketplaceEngine>, clock: Arc<ManualClock>) -> Self {
        Self {
            scheduler: SettlementScheduler::new(engine.clone()),
            engine,
            clock,
            orders: HashMap::new(),
            withdrawals: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &Arc<MarketplaceEngine> {
        &self.engine
    }

    fn order(&self, alias: &str) -> Result<&OrderId> {
        self.orders
            .get(alias)
            .ok_or_else(|| EngineError::not_found("order", alias))
    }

    fn withdrawal(&self, alias: &str) -> Result<&WithdrawalId> {
        self.withdrawals
            .get(alias)
            .ok_or_else(|| EngineError::not_found("withdrawal", alias))
    }

    pub async fn apply(&mut self, command: Command) -> Result<()> {
        let engine = self.engine.clone();
        match command {
            Command::CreateOrder {
                alias,
                client,
                freelancer,
                service,
                package,
                price,
                revisions_allowed,
                requirements,
            } => {
                let order = engine
                    .create_order(NewOrder {
                        client_id: UserId::from(client),
                        freelancer_id: UserId::from(freelancer),
                        service_id: ServiceId::from(service),
                        package_type: package,
                        price,
                        revisions_allowed,
                        requirements,
                    })
                    .await?;
                self.orders.insert(alias, order.order_id);
            }
            Command::AttachFile {
                order,
                caller,
                file,
            } => {
                engine
                    .attach_file(self.order(&order)?, &UserId::from(caller), &file)
                    .await?;
            }
            Command::Accept { order, caller } => {
                engine
                    .accept_order(self.order(&order)?, &UserId::from(caller))
                    .await?;
            }
            Command::SubmitWork { order, caller } => {
                engine
                    .submit_work(self.order(&order)?, &UserId::from(caller))
                    .await?;
            }
            Command::RequestRevision {
                order,
                caller,
                message,
            } => {
                engine
                    .request_revision(self.order(&order)?, &UserId::from(caller), &message)
                    .await?;
            }
            Command::Approve { order, caller } => {
                engine
                    .approve_order(self.order(&order)?, &UserId::from(caller))
                    .await?;
            }
            Command::Cancel {
                order,
                caller,
                reason,
            } => {
                engine
                    .cancel_order(self.order(&order)?, &UserId::from(caller), reason.as_deref())
                    .await?;
            }
            Command::LinkReview {
                order,
                caller,
                review,
            } => {
                engine
                    .link_review(self.order(&order)?, &UserId::from(caller), &review)
                    .await?;
            }
            Command::RequestWithdrawal {
                alias,
                freelancer,
                amount,
                bank_name,
                account_number,
                account_holder,
            } => {
                let destination = Destination {
                    bank_name,
                    account_number,
                    account_holder,
                };
                let request = engine
                    .request_withdrawal(&UserId::from(freelancer), amount, &destination)
                    .await?;
                self.withdrawals.insert(alias, request.request_id);
            }
            Command::CancelWithdrawal { withdrawal, caller } => {
                engine
                    .cancel_withdrawal(self.withdrawal(&withdrawal)?, &UserId::from(caller))
                    .await?;
            }
            Command::BeginProcessing { withdrawal } => {
                engine
                    .begin_withdrawal_processing(self.withdrawal(&withdrawal)?)
                    .await?;
            }
            Command::CompleteWithdrawal { withdrawal } => {
                engine
                    .complete_withdrawal(self.withdrawal(&withdrawal)?)
                    .await?;
            }
            Command::RejectWithdrawal { withdrawal, reason } => {
                engine
                    .reject_withdrawal(self.withdrawal(&withdrawal)?, &reason)
                    .await?;
            }
            Command::Advance { secs } => {
                self.clock.advance(config::seconds(secs)?)?;
            }
            Command::Sweep => {
                self.scheduler.sweep_once().await?;
            }
        }
        Ok(())
    }
}
