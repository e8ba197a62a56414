//! Order lifecycle operations.

use super::engine::MarketplaceEngine;
use crate::domain::events::LedgerEvent;
use crate::domain::ids::{OrderId, UserId};
use crate::domain::order::{NewOrder, Order, OrderStatus};
use crate::domain::ports::LedgerBatch;
use crate::error::Result;
use chrono::{DateTime, Utc};
use tracing::info;

impl MarketplaceEngine {
    /// Creates a `pending` order with its escrow terms frozen at the current
    /// platform fee rate.
    pub async fn create_order(&self, new: NewOrder) -> Result<Order> {
        let order = Order::create(
            OrderId::generate(),
            new,
            self.config().platform_fee_rate,
            self.now(),
        )?;

        self.retrying("create_order", || {
            let order = order.clone();
            async move {
                self.commit(LedgerBatch::new().order(order.clone())).await?;
                Ok(order)
            }
        })
        .await
        .map(|mut order| {
            order.version += 1;
            info!(
                order_id = %order.order_id,
                client_id = %order.client_id,
                freelancer_id = %order.freelancer_id,
                price = %order.package_price,
                fee = %order.platform_fee,
                "order created"
            );
            order
        })
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        self.retrying("get_order", move || self.load_order(order_id))
            .await
    }

    pub async fn attach_file(&self, order_id: &OrderId, caller: &UserId, file_ref: &str) -> Result<Order> {
        self.update_order("attach_file", order_id, &|order, _| order.attach(caller, file_ref))
            .await
    }

    pub async fn accept_order(&self, order_id: &OrderId, caller: &UserId) -> Result<Order> {
        self.update_order("accept_order", order_id, &|order, now| order.accept(caller, now))
            .await
    }

    pub async fn submit_work(&self, order_id: &OrderId, caller: &UserId) -> Result<Order> {
        self.update_order("submit_work", order_id, &|order, now| order.submit_work(caller, now))
            .await
    }

    pub async fn request_revision(
        &self,
        order_id: &OrderId,
        caller: &UserId,
        message: &str,
    ) -> Result<Order> {
        self.update_order("request_revision", order_id, &|order, now| {
            order.request_revision(caller, message, now)
        })
        .await
    }

    /// Cancels an order that has not been submitted or finished. No funds
    /// have reached the freelancer's wallet yet, so this is a status change
    /// only.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        caller: &UserId,
        reason: Option<&str>,
    ) -> Result<Order> {
        self.update_order("cancel_order", order_id, &|order, now| {
            order.cancel(caller, reason, now)
        })
        .await
    }

    pub async fn link_review(&self, order_id: &OrderId, caller: &UserId, review_id: &str) -> Result<Order> {
        self.update_order("link_review", order_id, &|order, _| order.link_review(caller, review_id))
            .await
    }

    /// Completes a submitted order and credits the freelancer's wallet.
    ///
    /// The order write and the credit are one batch, so there is never a
    /// completed order without its credit or a credit without its order.
    /// The order id is the credit's dedupe key.
    pub async fn approve_order(&self, order_id: &OrderId, caller: &UserId) -> Result<Order> {
        let order = self
            .retrying("approve_order", move || self.try_approve(order_id, caller))
            .await?;

        info!(
            order_id = %order.order_id,
            freelancer_id = %order.freelancer_id,
            earnings = %order.freelancer_earnings,
            "order completed"
        );
        self.publish(LedgerEvent::OrderCompleted {
            order_id: order.order_id.clone(),
            freelancer_id: order.freelancer_id.clone(),
            earnings: order.freelancer_earnings,
        });
        Ok(order)
    }

    async fn try_approve(&self, order_id: &OrderId, caller: &UserId) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        order.approve(caller, self.now())?;
        debug_assert_eq!(order.status, OrderStatus::Completed);

        let mut snapshot = self.snapshot(&order.freelancer_id).await?;
        let mut batch = LedgerBatch::new().order(order.clone());
        if snapshot
            .account
            .credit(&order.order_id, order.freelancer_earnings)?
        {
            batch = batch.account(snapshot.account);
        }
        self.commit(batch).await?;

        order.version += 1;
        Ok(order)
    }

    async fn update_order<F>(&self, operation: &str, order_id: &OrderId, apply: &F) -> Result<Order>
    where
        F: Fn(&mut Order, DateTime<Utc>) -> Result<()> + Sync,
    {
        let order = self
            .retrying(operation, move || self.try_update_order(order_id, apply))
            .await?;
        info!(
            order_id = %order.order_id,
            status = %order.status,
            operation,
            "order updated"
        );
        Ok(order)
    }

    async fn try_update_order<F>(&self, order_id: &OrderId, apply: &F) -> Result<Order>
    where
        F: Fn(&mut Order, DateTime<Utc>) -> Result<()> + Sync,
    {
        let mut order = self.load_order(order_id).await?;
        apply(&mut order, self.now())?;
        self.commit(LedgerBatch::new().order(order.clone())).await?;
        order.version += 1;
        Ok(order)
    }
}
