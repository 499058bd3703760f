//! # Order Validator Service
//!
//! Implements [`OrderValidationApi`] over a [`LedgerClient`] and a
//! [`TimeSource`].

use crate::domain::config::ValidatorConfig;
use crate::domain::schema::{check_schema, SchemaContext};
use crate::domain::signature::verify_order_signature;
use crate::events::{ValidationError, ValidationLogEvent};
use crate::ports::inbound::OrderValidationApi;
use crate::ports::outbound::{LedgerClient, TimeSource};
use async_trait::async_trait;
use futures::future::join_all;
use mesh_02_ethereum::{ContractAddresses, LedgerError, OrderRelevantState, OrderStatus};
use primitive_types::U256;
use rayon::prelude::*;
use shared_types::{OrderInfo, RejectedOrderCode, RejectedOrderInfo, SignedOrder, ValidationResponse};
use std::sync::Arc;
use tracing::instrument;

/// The validation pipeline.
pub struct OrderValidator {
    schema: SchemaContext,
    config: ValidatorConfig,
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn TimeSource>,
}

impl OrderValidator {
    /// Build a validator for `chain_id` using that chain's exchange address.
    pub fn new(
        chain_id: u64,
        contracts: &ContractAddresses,
        config: ValidatorConfig,
        ledger: Arc<dyn LedgerClient>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            schema: SchemaContext {
                chain_id,
                exchange: contracts.exchange,
                max_order_size_bytes: config.max_order_size_bytes,
            },
            config,
            ledger,
            clock,
        })
    }

    /// Schema, signature and expiration checks.
    fn check_offchain(&self, order: &SignedOrder, now: u64) -> Result<(), RejectedOrderCode> {
        check_schema(order, &self.schema)?;
        verify_order_signature(order).map_err(|_| RejectedOrderCode::OrderHasInvalidSignature)?;
        if order.expiration_time_seconds <= U256::from(now) {
            return Err(RejectedOrderCode::OrderExpired);
        }
        if order.expiration_time_seconds > self.config.max_expiration_time {
            return Err(RejectedOrderCode::OrderMaxExpirationExceeded);
        }
        Ok(())
    }

    /// One bounded ledger query for `chunk`.
    async fn query_chunk(&self, chunk: Vec<SignedOrder>) -> ValidationResponse {
        let outcome = tokio::time::timeout(
            self.config.ledger_timeout,
            self.ledger.order_relevant_states(&chunk),
        )
        .await
        .unwrap_or(Err(LedgerError::Timeout))
        .and_then(|states| {
            if states.len() == chunk.len() {
                Ok(states)
            } else {
                Err(LedgerError::LengthMismatch {
                    expected: chunk.len(),
                    actual: states.len(),
                })
            }
        });

        let mut response = ValidationResponse::default();
        match outcome {
            Ok(states) => {
                for (order, state) in chunk.into_iter().zip(states) {
                    match verdict(&state) {
                        Ok(fillable) => response.accepted.push(OrderInfo::new(order, fillable)),
                        Err(code) => response.rejected.push(RejectedOrderInfo::new(order, code)),
                    }
                }
            }
            Err(e) => {
                ValidationLogEvent::LedgerChunkFailed {
                    orders: chunk.len(),
                    error: e.to_string(),
                }
                .emit();
                response.rejected.extend(
                    chunk
                        .into_iter()
                        .map(|o| RejectedOrderInfo::new(o, RejectedOrderCode::EthRpcRequestFailed)),
                );
            }
        }
        response
    }
}

/// Map a ledger state to a fillable amount or a rejection.
fn verdict(state: &OrderRelevantState) -> Result<U256, RejectedOrderCode> {
    match state.status {
        OrderStatus::InvalidMakerAssetAmount => Err(RejectedOrderCode::OrderHasInvalidMakerAssetAmount),
        OrderStatus::InvalidTakerAssetAmount => Err(RejectedOrderCode::OrderHasInvalidTakerAssetAmount),
        OrderStatus::Expired => Err(RejectedOrderCode::OrderExpired),
        OrderStatus::FullyFilled => Err(RejectedOrderCode::OrderFullyFilled),
        OrderStatus::Cancelled => Err(RejectedOrderCode::OrderCancelled),
        OrderStatus::Fillable if state.fillable_taker_asset_amount.is_zero() => {
            Err(RejectedOrderCode::OrderUnfunded)
        }
        OrderStatus::Fillable => Ok(state.fillable_taker_asset_amount),
    }
}

#[async_trait]
impl OrderValidationApi for OrderValidator {
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    async fn validate_orders(&self, orders: Vec<SignedOrder>) -> ValidationResponse {
        let total = orders.len();
        let now = self.clock.now();

        let checks: Vec<Result<(), RejectedOrderCode>> = orders
            .par_iter()
            .map(|order| self.check_offchain(order, now))
            .collect();

        let mut response = ValidationResponse::default();
        let mut survivors = Vec::with_capacity(total);
        for (order, check) in orders.into_iter().zip(checks) {
            match check {
                Ok(()) => survivors.push(order),
                Err(code) => response.rejected.push(RejectedOrderInfo::new(order, code)),
            }
        }

        let mut chunks = Vec::new();
        let mut rest = survivors.into_iter().peekable();
        while rest.peek().is_some() {
            chunks.push(rest.by_ref().take(self.config.ledger_batch_size).collect::<Vec<_>>());
        }
        for chunk_response in join_all(chunks.into_iter().map(|c| self.query_chunk(c))).await {
            response.extend(chunk_response);
        }

        for rejected in &response.rejected {
            ValidationLogEvent::OrderRejected {
                order_hash: rejected.order_hash,
                code: rejected.code(),
            }
            .emit();
        }
        ValidationLogEvent::BatchValidated {
            total,
            accepted: response.accepted.len(),
            rejected: response.rejected.len(),
        }
        .emit();

        response
    }

    fn chain_id(&self) -> u64 {
        self.schema.chain_id
    }

    fn max_expiration_time(&self) -> U256 {
        self.config.max_expiration_time
    }
}
