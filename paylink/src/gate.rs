//! The payment gate.
//!
//! [`PaymentGate`] wraps any [`ToolInvoker`] and inserts the payment sequence
//! around each call:
//!
//! ```text
//! execute ──► Free ─────────────────────────────────────► release result
//!    │
//!    ├──► Flat ──────► payer wallet? ──────────► charge ──► release result
//!    │
//!    └──► Evaluated ─► payer wallet? ─► evaluate ─► charge ──► release result
//! ```
//!
//! The payer wallet comes from the [`context`](crate::context) store. Any
//! failure after execution surfaces as [`InvokeError::Payment`] and the
//! tool's result is dropped.
//!
//! # Side effects
//!
//! The tool always runs before its payment is known to succeed: a result can
//! not be evaluated or priced before it exists. A failed charge therefore
//! hides the result from the caller but cannot undo what the tool did. Tools
//! with externally visible side effects that are priced must be idempotent or
//! compensate on their own.

use std::fmt;
use std::sync::Arc;

use crate::context;
use crate::error::{InvokeError, PaymentError};
use crate::evaluation::{EvaluationRequest, Evaluator, HttpEvaluator};
use crate::invoker::{BoxFuture, ToolCall, ToolInvoker};
use crate::policy::{CostPolicy, PolicyTable};
use crate::settings::PaymentSettings;
use crate::transfer::{HttpWalletTransfer, WalletTransfer};

/// Payment-enforcing decorator over a [`ToolInvoker`].
pub struct PaymentGate<I> {
    inner: I,
    policies: PolicyTable,
    transfer: Arc<dyn WalletTransfer>,
    evaluator: Arc<dyn Evaluator>,
    currency: String,
}

impl<I: fmt::Debug> fmt::Debug for PaymentGate<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentGate")
            .field("inner", &self.inner)
            .field("policies", &self.policies)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl<I> PaymentGate<I> {
    /// Starts building a gate around `inner`.
    #[must_use]
    pub fn builder(inner: I) -> PaymentGateBuilder<I> {
        PaymentGateBuilder {
            inner,
            policies: PolicyTable::new(),
            transfer: None,
            evaluator: None,
            currency: None,
        }
    }

    /// Creates a gate whose transfer and evaluation clients talk to the
    /// services described by `settings`.
    #[must_use]
    pub fn from_settings(inner: I, policies: PolicyTable, settings: &PaymentSettings) -> Self {
        Self::builder(inner)
            .policies(policies)
            .transfer(Arc::new(HttpWalletTransfer::new(settings)))
            .evaluator(Arc::new(HttpEvaluator::new(settings)))
            .currency(settings.currency.clone())
            .build()
    }

    /// The wrapped invoker.
    pub const fn inner(&self) -> &I {
        &self.inner
    }

    /// The policies this gate enforces.
    pub const fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Currency code charged.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl<I: ToolInvoker> PaymentGate<I> {
    async fn invoke_paid(&self, call: &ToolCall) -> Result<I::Output, InvokeError> {
        let output = self.inner.invoke(call).await?;

        let policy = self.policies.resolve(&call.name);
        let (CostPolicy::Flat { amount } | CostPolicy::Evaluated { amount }) = policy else {
            #[cfg(feature = "telemetry")]
            tracing::debug!(tool = %call.name, "Tool is free, releasing result");
            return Ok(output);
        };

        let Some(payer) = context::get() else {
            #[cfg(feature = "telemetry")]
            tracing::warn!(tool = %call.name, "Priced tool called without a payer wallet");
            return Err(PaymentError::MissingPayerWallet {
                tool: call.name.clone(),
            }
            .into());
        };

        if policy.requires_evaluation() {
            let result = serde_json::to_value(&output).map_err(|e| {
                PaymentError::EvaluationUnavailable(format!("tool result is not serialisable: {e}"))
            })?;
            self.evaluator
                .evaluate(EvaluationRequest {
                    tool_name: &call.name,
                    arguments: &call.arguments,
                    result: &result,
                })
                .await?
                .into_result()?;
        }

        if let Err(err) = self.transfer.transfer(&payer, amount, &self.currency).await {
            #[cfg(feature = "telemetry")]
            tracing::error!(
                tool = %call.name,
                %amount,
                currency = %self.currency,
                payer = %payer.redacted(),
                error = %err,
                "Charge failed after tool execution"
            );
            return Err(err.into());
        }

        Ok(output)
    }
}

impl<I: ToolInvoker> ToolInvoker for PaymentGate<I> {
    type Output = I::Output;

    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<I::Output, InvokeError>> {
        Box::pin(self.invoke_paid(call))
    }
}

/// Builder for [`PaymentGate`].
///
/// Unset clients default to the HTTP clients for [`PaymentSettings::default`];
/// the currency defaults to that of the default settings.
pub struct PaymentGateBuilder<I> {
    inner: I,
    policies: PolicyTable,
    transfer: Option<Arc<dyn WalletTransfer>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    currency: Option<String>,
}

impl<I: fmt::Debug> fmt::Debug for PaymentGateBuilder<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentGateBuilder")
            .field("inner", &self.inner)
            .field("policies", &self.policies)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl<I> PaymentGateBuilder<I> {
    /// Sets the policy table.
    #[must_use]
    pub fn policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Sets the transfer client.
    #[must_use]
    pub fn transfer(mut self, transfer: Arc<dyn WalletTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Sets the evaluation client.
    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Sets the currency code charged.
    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Finishes the gate.
    #[must_use]
    pub fn build(self) -> PaymentGate<I> {
        let defaults = PaymentSettings::default();
        PaymentGate {
            inner: self.inner,
            policies: self.policies,
            transfer: self
                .transfer
                .unwrap_or_else(|| Arc::new(HttpWalletTransfer::new(&defaults))),
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(HttpEvaluator::new(&defaults))),
            currency: self.currency.unwrap_or(defaults.currency),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};

    use super::*;
    use crate::error::PaymentErrorKind;
    use crate::evaluation::EvaluationVerdict;
    use crate::invoker::invoker_fn;
    use crate::policy::Amount;
    use crate::transfer::TransferRecord;
    use crate::wallet::WalletId;

    type Log = Arc<Mutex<Vec<String>>>;

    struct RecordingTransfer {
        log: Log,
        calls: Mutex<Vec<(WalletId, Amount, String)>>,
        outcome: Result<TransferRecord, PaymentError>,
    }

    impl RecordingTransfer {
        fn new(log: &Log, outcome: Result<TransferRecord, PaymentError>) -> Arc<Self> {
            Arc::new(Self {
                log: Arc::clone(log),
                calls: Mutex::new(Vec::new()),
                outcome,
            })
        }

        fn succeeding(log: &Log) -> Arc<Self> {
            Self::new(
                log,
                Ok(TransferRecord {
                    success: true,
                    data: json!({"tx": "1"}),
                }),
            )
        }

        fn calls(&self) -> Vec<(WalletId, Amount, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl WalletTransfer for RecordingTransfer {
        fn transfer<'a>(
            &'a self,
            from: &'a WalletId,
            amount: Amount,
            currency: &'a str,
        ) -> BoxFuture<'a, Result<TransferRecord, PaymentError>> {
            Box::pin(async move {
                self.log.lock().unwrap().push("transfer".to_owned());
                self.calls
                    .lock()
                    .unwrap()
                    .push((from.clone(), amount, currency.to_owned()));
                self.outcome.clone()
            })
        }
    }

    struct RecordingEvaluator {
        log: Log,
        seen: Mutex<Vec<(String, Value)>>,
        outcome: Result<EvaluationVerdict, PaymentError>,
    }

    impl RecordingEvaluator {
        fn new(log: &Log, outcome: Result<EvaluationVerdict, PaymentError>) -> Arc<Self> {
            Arc::new(Self {
                log: Arc::clone(log),
                seen: Mutex::new(Vec::new()),
                outcome,
            })
        }

        fn accepting(log: &Log) -> Arc<Self> {
            Self::new(
                log,
                Ok(EvaluationVerdict {
                    is_acceptable: true,
                    ..Default::default()
                }),
            )
        }

        fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl Evaluator for RecordingEvaluator {
        fn evaluate<'a>(
            &'a self,
            request: EvaluationRequest<'a>,
        ) -> BoxFuture<'a, Result<EvaluationVerdict, PaymentError>> {
            Box::pin(async move {
                self.log.lock().unwrap().push("evaluate".to_owned());
                self.seen
                    .lock()
                    .unwrap()
                    .push((request.tool_name.to_owned(), request.result.clone()));
                self.outcome.clone()
            })
        }
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn calculator(log: &Log, executions: &Arc<AtomicUsize>) -> impl ToolInvoker<Output = f64> {
        let log = Arc::clone(log);
        let executions = Arc::clone(executions);
        invoker_fn(move |call: ToolCall| {
            log.lock().unwrap().push("execute".to_owned());
            executions.fetch_add(1, Ordering::SeqCst);
            async move {
                let a = call.arguments.get("a").and_then(Value::as_f64).unwrap_or_default();
                let b = call.arguments.get("b").and_then(Value::as_f64).unwrap_or_default();
                match call.name.as_str() {
                    "add" => Ok(a + b),
                    "subtract" => Ok(a - b),
                    "divide" if b == 0.0 => Err(InvokeError::tool("division by zero")),
                    "divide" => Ok(a / b),
                    _ => Ok(a * b),
                }
            }
        })
    }

    fn call(name: &str, a: f64, b: f64) -> ToolCall {
        ToolCall::new(name).with_argument("a", a).with_argument("b", b)
    }

    struct Fixture {
        log: Log,
        executions: Arc<AtomicUsize>,
        transfer: Arc<RecordingTransfer>,
        evaluator: Arc<RecordingEvaluator>,
    }

    impl Fixture {
        fn new() -> Self {
            let log = Log::default();
            Self {
                transfer: RecordingTransfer::succeeding(&log),
                evaluator: RecordingEvaluator::accepting(&log),
                executions: Arc::new(AtomicUsize::new(0)),
                log,
            }
        }

        fn gate(&self, policies: PolicyTable) -> PaymentGate<impl ToolInvoker<Output = f64>> {
            PaymentGate::builder(calculator(&self.log, &self.executions))
                .policies(policies)
                .transfer(self.transfer.clone())
                .evaluator(self.evaluator.clone())
                .build()
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn free_tool_skips_payment() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::from_json(r#"{"add": 0.10}"#).unwrap());

        let out = context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&call("multiply", 3.0, 4.0)))
            .await
            .unwrap();

        assert_eq!(out, 12.0);
        assert!(fx.transfer.calls().is_empty());
        assert_eq!(fx.evaluator.count(), 0);
    }

    #[tokio::test]
    async fn free_tool_does_not_need_a_wallet() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::new());
        assert_eq!(gate.invoke(&call("add", 1.0, 2.0)).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn flat_policy_charges_once_without_evaluation() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::from_json(r#"{"add": 0.10}"#).unwrap());

        let out = context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&call("add", 5.0, 3.0)))
            .await
            .unwrap();

        assert_eq!(out, 8.0);
        assert_eq!(
            fx.transfer.calls(),
            vec![(WalletId::new("w1"), amount("0.10"), "TRX".to_owned())]
        );
        assert_eq!(fx.evaluator.count(), 0);
        assert_eq!(fx.log(), ["execute", "transfer"]);
    }

    #[tokio::test]
    async fn zero_flat_amount_still_charges() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::new().with_flat("add", Amount::ZERO));

        context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&call("add", 1.0, 1.0)))
            .await
            .unwrap();

        assert_eq!(fx.transfer.calls().len(), 1);
    }

    #[tokio::test]
    async fn evaluated_policy_runs_in_order() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::new().with_evaluated("subtract", amount("0.10")));

        let out = context::with_wallet(
            Some(WalletId::new("w1")),
            gate.invoke(&call("subtract", 5.0, 3.0)),
        )
        .await
        .unwrap();

        assert_eq!(out, 2.0);
        assert_eq!(fx.log(), ["execute", "evaluate", "transfer"]);
        assert_eq!(
            fx.evaluator.seen.lock().unwrap().as_slice(),
            [("subtract".to_owned(), json!(2.0))]
        );
    }

    #[tokio::test]
    async fn rejected_evaluation_blocks_charge() {
        let log = Log::default();
        let fx = Fixture {
            evaluator: RecordingEvaluator::new(
                &log,
                Ok(EvaluationVerdict {
                    is_acceptable: false,
                    reason: Some("incorrect output".to_owned()),
                    issues: vec!["wrong sign".to_owned()],
                    ..Default::default()
                }),
            ),
            transfer: RecordingTransfer::succeeding(&log),
            executions: Arc::new(AtomicUsize::new(0)),
            log,
        };
        let gate = fx.gate(
            PolicyTable::from_json(r#"{"subtract": {"base_cost": 0.10, "require_evaluation": true}}"#)
                .unwrap(),
        );

        let err = context::with_wallet(
            Some(WalletId::new("w1")),
            gate.invoke(&call("subtract", 5.0, 3.0)),
        )
        .await
        .unwrap_err();

        let payment = err.as_payment().unwrap();
        assert_eq!(payment.kind(), PaymentErrorKind::Rejected);
        assert!(err.to_string().contains("incorrect output"));
        assert!(fx.transfer.calls().is_empty());
    }

    #[tokio::test]
    async fn unreachable_evaluator_blocks_charge() {
        let log = Log::default();
        let fx = Fixture {
            evaluator: RecordingEvaluator::new(
                &log,
                Err(PaymentError::EvaluationUnavailable("connection refused".to_owned())),
            ),
            transfer: RecordingTransfer::succeeding(&log),
            executions: Arc::new(AtomicUsize::new(0)),
            log,
        };
        let gate = fx.gate(PolicyTable::new().with_evaluated("subtract", amount("1")));

        let err = context::with_wallet(
            Some(WalletId::new("w1")),
            gate.invoke(&call("subtract", 5.0, 3.0)),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.as_payment().map(PaymentError::kind),
            Some(PaymentErrorKind::Evaluation)
        );
        assert!(fx.transfer.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_wallet_fails_after_execution_before_network() {
        for policies in [
            PolicyTable::from_json(r#"{"divide": 1.0}"#).unwrap(),
            PolicyTable::new().with_evaluated("divide", amount("1.0")),
        ] {
            let fx = Fixture::new();
            let gate = fx.gate(policies);

            let err = context::scope(gate.invoke(&call("divide", 6.0, 3.0)))
                .await
                .unwrap_err();

            assert_eq!(
                err.as_payment(),
                Some(&PaymentError::MissingPayerWallet {
                    tool: "divide".to_owned()
                })
            );
            assert_eq!(fx.executions.load(Ordering::SeqCst), 1);
            assert_eq!(fx.log(), ["execute"]);
        }
    }

    #[tokio::test]
    async fn missing_wallet_outside_any_scope() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::new().with_flat("add", amount("1")));
        let err = gate.invoke(&call("add", 1.0, 1.0)).await.unwrap_err();
        assert_eq!(
            err.as_payment().map(PaymentError::kind),
            Some(PaymentErrorKind::MissingWallet)
        );
    }

    #[tokio::test]
    async fn tool_failure_propagates_without_payment() {
        let fx = Fixture::new();
        let gate = fx.gate(PolicyTable::new().with_flat("divide", amount("1")));

        let err = context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&call("divide", 1.0, 0.0)))
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Tool(ref e) if e.to_string() == "division by zero"));
        assert!(fx.transfer.calls().is_empty());
        assert_eq!(fx.evaluator.count(), 0);
    }

    #[tokio::test]
    async fn failed_charge_withholds_result() {
        let log = Log::default();
        let fx = Fixture {
            transfer: RecordingTransfer::new(
                &log,
                Err(PaymentError::TransferRejected("insufficient funds".to_owned())),
            ),
            evaluator: RecordingEvaluator::accepting(&log),
            executions: Arc::new(AtomicUsize::new(0)),
            log,
        };
        let gate = fx.gate(PolicyTable::new().with_flat("add", amount("0.5")));

        let err = context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&call("add", 1.0, 1.0)))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "insufficient funds");
        assert_eq!(fx.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_currency_is_charged() {
        let fx = Fixture::new();
        let gate = PaymentGate::builder(calculator(&fx.log, &fx.executions))
            .policies(PolicyTable::new().with_flat("add", amount("2")))
            .transfer(fx.transfer.clone())
            .evaluator(fx.evaluator.clone())
            .currency("USD")
            .build();

        context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&call("add", 1.0, 1.0)))
            .await
            .unwrap();

        assert_eq!(fx.transfer.calls()[0].2, "USD");
        assert_eq!(gate.currency(), "USD");
    }

    #[tokio::test]
    async fn gates_compose() {
        let fx = Fixture::new();
        let outer = PaymentGate::builder(fx.gate(PolicyTable::new().with_flat("add", amount("1"))))
            .policies(PolicyTable::new().with_flat("add", amount("2")))
            .transfer(fx.transfer.clone())
            .evaluator(fx.evaluator.clone())
            .build();

        context::with_wallet(Some(WalletId::new("w1")), outer.invoke(&call("add", 1.0, 1.0)))
            .await
            .unwrap();

        let charged: Vec<Amount> = fx.transfer.calls().into_iter().map(|c| c.1).collect();
        assert_eq!(charged, [amount("1"), amount("2")]);
    }
}
