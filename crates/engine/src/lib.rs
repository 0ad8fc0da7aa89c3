//! # Meridian Execution Engine
//!
//! The central orchestrator of the simulation: it accepts order requests,
//! resolves them against incoming quote snapshots into trades, and keeps the
//! account ledger (cash, positions, realized P&L, equity) consistent.
//!
//! The engine follows a single-writer model. All mutation happens through
//! `&mut self` on one instance, invoked once per quote cycle by one driver
//! loop; the read accessors borrow immutably and never block. A fill is
//! applied as one unit: the order's fill state, the cash debit/credit, the
//! position update and the trade-log append all happen before the next order
//! is considered.

use crate::error::EngineError;
use chrono::Utc;
use configuration::Simulation;
use core_types::{
    Order, OrderRequest, PortfolioSummary, Position, QuoteSnapshot, Trade,
};
use executor::{FillResolver, Portfolio};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

pub mod error;

/// The execution and accounting engine.
///
/// Owns the order registry, the append-only trade log and the portfolio
/// ledger. Orders are never deleted: terminal orders remain queryable, and
/// the active-order scan walks the registry in placement order, so multiple
/// live orders for one symbol resolve first-registered-first.
pub struct ExecutionEngine {
    resolver: FillResolver,
    portfolio: Portfolio,
    orders: Vec<Order>,
    order_index: HashMap<Uuid, usize>,
    trades: Vec<Trade>,
}

impl ExecutionEngine {
    pub fn new(params: Simulation) -> Self {
        tracing::info!(initial_cash = %params.initial_cash, "execution engine initialized");
        Self {
            portfolio: Portfolio::new(params.initial_cash),
            resolver: FillResolver::new(params),
            orders: Vec::new(),
            order_index: HashMap::new(),
            trades: Vec::new(),
        }
    }

    /// Registers a validated order and returns its identifier.
    ///
    /// Validation failures surface here as `EngineError::Order`; the order is
    /// never registered. No matching happens at placement time; the order
    /// waits for the next quote cycle.
    pub fn place_order(&mut self, request: OrderRequest) -> Result<Uuid, EngineError> {
        let order = Order::new(request, Utc::now())?;
        let order_id = order.order_id;

        tracing::info!(
            symbol = %order.symbol,
            side = ?order.side,
            order_type = ?order.order_type,
            quantity = %order.quantity,
            limit_price = ?order.limit_price,
            %order_id,
            "order placed"
        );

        self.order_index.insert(order_id, self.orders.len());
        self.orders.push(order);
        Ok(order_id)
    }

    /// Cancels an active order.
    ///
    /// Returns `false` when the order is unknown or already terminal;
    /// cancelling a non-active order is a no-op signal, not a fault.
    pub fn cancel_order(&mut self, order_id: Uuid) -> bool {
        let Some(&idx) = self.order_index.get(&order_id) else {
            tracing::debug!(%order_id, "cancel requested for unknown order");
            return false;
        };

        let order = &mut self.orders[idx];
        if order.cancel().is_err() {
            tracing::debug!(%order_id, status = ?order.status, "cancel requested for terminal order");
            return false;
        }

        tracing::info!(%order_id, symbol = %order.symbol, "order cancelled");
        true
    }

    /// Resolves every active order against the snapshot and returns the
    /// trades generated this cycle.
    ///
    /// After matching, every symbol present in the snapshot is re-marked so
    /// that equity tracks the latest prices even where no order is working.
    pub fn process_quotes(
        &mut self,
        snapshot: &QuoteSnapshot,
    ) -> Result<Vec<Trade>, EngineError> {
        let mut executed = Vec::new();

        for idx in 0..self.orders.len() {
            if !self.orders[idx].is_active() {
                continue;
            }
            let Some(quote) = snapshot.get(&self.orders[idx].symbol) else {
                continue;
            };
            let Some(price) = self.resolver.resolve(&self.orders[idx], quote) else {
                continue;
            };

            let residual = self.orders[idx].remaining_quantity();
            let mut quantity = residual;
            let mut commission = self.resolver.commission(price, quantity);

            if self.orders[idx].is_buy() {
                let cash = self.portfolio.cash();
                if price * quantity + commission > cash {
                    // Clamp to the largest quantity the account can pay for,
                    // commission included: cash = q * price * (1 + rate).
                    let affordable =
                        cash / (price * (Decimal::ONE + self.resolver.commission_rate()));
                    if affordable <= Decimal::ZERO {
                        tracing::debug!(
                            order_id = %self.orders[idx].order_id,
                            %cash,
                            "order not marketable under current capital, skipped"
                        );
                        continue;
                    }
                    quantity = residual.min(affordable);
                    commission = self.resolver.commission(price, quantity);
                    tracing::warn!(
                        order_id = %self.orders[idx].order_id,
                        requested = %residual,
                        clamped = %quantity,
                        "buy quantity clamped to available cash"
                    );
                }
            }

            let trade = Trade {
                trade_id: Uuid::new_v4(),
                order_id: self.orders[idx].order_id,
                symbol: self.orders[idx].symbol.clone(),
                side: self.orders[idx].side,
                quantity,
                price,
                commission,
                timestamp: snapshot.timestamp,
            };

            // One atomic unit per fill: order state, cash, position, log.
            self.orders[idx].record_fill(quantity, price)?;
            self.portfolio.apply_trade(&trade);
            self.trades.push(trade.clone());

            tracing::info!(
                symbol = %trade.symbol,
                side = ?trade.side,
                quantity = %trade.quantity,
                price = %trade.price,
                commission = %trade.commission,
                order_status = ?self.orders[idx].status,
                "trade executed"
            );

            executed.push(trade);
        }

        for (symbol, quote) in snapshot.iter() {
            self.portfolio.observe_quote(symbol, quote);
        }

        Ok(executed)
    }

    /// Looks up any order, active or terminal, by its identifier.
    pub fn order(&self, order_id: Uuid) -> Option<&Order> {
        self.order_index.get(&order_id).map(|&idx| &self.orders[idx])
    }

    /// All orders still able to fill, in placement order.
    pub fn active_orders(&self) -> Vec<&Order> {
        self.orders.iter().filter(|o| o.is_active()).collect()
    }

    /// All positions with a non-zero quantity.
    pub fn open_positions(&self) -> Vec<&Position> {
        self.portfolio.open_positions()
    }

    /// The most recent `count` trades, newest first.
    pub fn recent_trades(&self, count: usize) -> Vec<&Trade> {
        self.trades.iter().rev().take(count).collect()
    }

    /// The full append-only trade log, oldest first.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn portfolio_summary(&self) -> PortfolioSummary {
        PortfolioSummary {
            cash: self.portfolio.cash(),
            equity: self.portfolio.equity(),
            initial_cash: self.portfolio.initial_cash(),
            total_return: self.portfolio.total_return(),
            open_positions: self.portfolio.open_positions().len(),
            active_orders: self.active_orders().len(),
            total_trades: self.trades.len(),
        }
    }
}
