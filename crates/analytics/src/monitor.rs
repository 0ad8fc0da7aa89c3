use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::{DateTime, Utc};
use core_types::{OrderSide, Trade};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::HashMap;

/// Per-symbol average-cost book used to attribute realized P&L to closing
/// trades.
///
/// The monitor only sees the outbound trade stream, not the engine's ledger,
/// so it keeps its own miniature accounting: enough to decide whether a
/// closing trade won or lost, nothing more.
#[derive(Debug, Default, Clone)]
struct CostBook {
    quantity: Decimal,
    average: Decimal,
}

/// Collects trade events and equity points over a run and derives the
/// performance metrics from them.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    books: HashMap<String, CostBook>,
    total_trades: usize,
    winning_trades: usize,
    losing_trades: usize,
    gross_profit: Decimal,
    gross_loss: Decimal,
    total_commission: Decimal,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equity point to the equity curve.
    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, equity: Decimal) {
        self.equity_curve.push((timestamp, equity));
    }

    /// Folds one trade event into the trade statistics.
    ///
    /// A trade that reduces or reverses the tracked net position is scored as
    /// a win or a loss by its realized P&L net of this trade's commission;
    /// trades that open or extend exposure only update the cost book.
    pub fn record_trade(&mut self, trade: &Trade) {
        self.total_trades += 1;
        self.total_commission += trade.commission;

        let book = self.books.entry(trade.symbol.clone()).or_default();
        let delta = match trade.side {
            OrderSide::Buy => trade.quantity,
            OrderSide::Sell => -trade.quantity,
        };

        if book.quantity.is_zero() || book.quantity.is_sign_positive() == delta.is_sign_positive()
        {
            let total = book.quantity + delta;
            book.average = (book.average * book.quantity.abs() + trade.price * trade.quantity)
                / total.abs();
            book.quantity = total;
            return;
        }

        let direction = if book.quantity.is_sign_positive() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        let closed = book.quantity.abs().min(trade.quantity);
        let pnl = (trade.price - book.average) * closed * direction - trade.commission;

        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
            self.gross_profit += pnl;
        } else {
            self.losing_trades += 1;
            self.gross_loss += pnl.abs();
        }

        let remaining = book.quantity + delta;
        if remaining.is_zero() {
            *book = CostBook::default();
        } else if remaining.is_sign_positive() != book.quantity.is_sign_positive() {
            book.quantity = remaining;
            book.average = trade.price;
        } else {
            book.quantity = remaining;
        }
    }

    /// The recorded equity curve, oldest first.
    pub fn equity_curve(&self) -> &[(DateTime<Utc>, Decimal)] {
        &self.equity_curve
    }

    /// Derives the final performance report for the run.
    pub fn report(&self, initial_capital: Decimal) -> Result<PerformanceReport, AnalyticsError> {
        let mut report = PerformanceReport::new();
        report.total_trades = self.total_trades;
        report.winning_trades = self.winning_trades;
        report.losing_trades = self.losing_trades;
        report.gross_profit = self.gross_profit;
        report.gross_loss = self.gross_loss;
        report.total_commission = self.total_commission;
        report.final_equity = self
            .equity_curve
            .last()
            .map(|&(_, equity)| equity)
            .unwrap_or(initial_capital);

        if initial_capital > Decimal::ZERO {
            report.total_return_pct = (report.final_equity - initial_capital) / initial_capital
                * Decimal::ONE_HUNDRED;
        }

        let closing = self.winning_trades + self.losing_trades;
        if closing > 0 {
            report.win_rate_pct = Some(
                Decimal::from(self.winning_trades) / Decimal::from(closing)
                    * Decimal::ONE_HUNDRED,
            );
        }
        if self.gross_loss > Decimal::ZERO {
            report.profit_factor = Some(self.gross_profit / self.gross_loss);
        }

        self.calculate_drawdown(&mut report);
        self.calculate_sharpe(&mut report)?;
        self.calculate_annualized(&mut report, initial_capital);

        Ok(report)
    }

    /// Maximum peak-to-trough decline of the equity curve.
    fn calculate_drawdown(&self, report: &mut PerformanceReport) {
        let Some(&(_, first_equity)) = self.equity_curve.first() else {
            return;
        };

        let mut peak_equity = first_equity;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for &(_, equity) in &self.equity_curve {
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = peak_equity - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
                if peak_equity > Decimal::ZERO {
                    max_drawdown_pct = drawdown / peak_equity * Decimal::ONE_HUNDRED;
                }
            }
        }

        report.max_drawdown = max_drawdown;
        report.max_drawdown_pct = max_drawdown_pct;
    }

    /// Per-tick Sharpe ratio, risk-free rate assumed zero.
    ///
    /// Left non-annualized: annualization would require knowing the tick
    /// period, which the monitor deliberately does not.
    fn calculate_sharpe(&self, report: &mut PerformanceReport) -> Result<(), AnalyticsError> {
        let returns: Vec<Decimal> = self
            .equity_curve
            .windows(2)
            .filter(|w| w[0].1 > Decimal::ZERO)
            .map(|w| (w[1].1 - w[0].1) / w[0].1)
            .collect();

        if returns.len() < 2 {
            return Ok(());
        }

        let returns_sum: Decimal = returns.iter().sum();
        let mean_return = returns_sum / Decimal::from(returns.len());

        let variance: Decimal = returns
            .iter()
            .map(|r| (*r - mean_return) * (*r - mean_return))
            .sum::<Decimal>()
            / Decimal::from(returns.len());

        if variance <= Decimal::ZERO {
            return Ok(());
        }

        let std_dev = variance.sqrt().ok_or_else(|| {
            AnalyticsError::InternalError(
                "Failed to calculate square root for variance".to_string(),
            )
        })?;

        if std_dev > Decimal::ZERO {
            report.sharpe_ratio = Some(mean_return / std_dev);
        }

        Ok(())
    }

    /// Annualizes the total return over the observed wall-clock span.
    fn calculate_annualized(&self, report: &mut PerformanceReport, initial_capital: Decimal) {
        let (Some(&(first_ts, _)), Some(&(last_ts, _))) =
            (self.equity_curve.first(), self.equity_curve.last())
        else {
            return;
        };
        let seconds = (last_ts - first_ts).num_seconds();
        if seconds <= 0 || initial_capital <= Decimal::ZERO {
            return;
        }

        let days = Decimal::from(seconds) / Decimal::from(86_400);
        let growth = report.final_equity / initial_capital;
        if growth <= Decimal::ZERO || days.is_zero() {
            return;
        }

        // Very short runs produce astronomical exponents; checked_powd turns
        // the overflow into "not reportable" instead of a panic.
        report.annualized_return_pct = growth
            .checked_powd(Decimal::from(365) / days)
            .map(|g| (g - Decimal::ONE) * Decimal::ONE_HUNDRED);
    }
}
