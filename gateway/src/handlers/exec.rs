use crate::{
    error::GatewayError,
    handlers::{Handler, Reply, Request},
    message_view::MessageView,
};
use async_trait::async_trait;
use bg_storage::StorageRegistry;
use bg_vm_core::region::{MemoryRegion, RegionTable};
use bg_vm_interface::{ExecutionContext, ExecutionEngine, ExecutionOutcome};
use bg_vm_types::constants::region_slot_base;
use coap_lite::ResponseType;
use serde::Serialize;
use std::sync::Arc;

/// Upper bound of the header/option scratch area exposed to the program as
/// region slot 0.
pub const HEADER_REGION_SIZE: usize = 256;

/// Result value reported when the program ran but was stopped at the
/// sandbox boundary (budget exhausted or faulted).
pub const RESULT_SENTINEL: i64 = -1;

#[derive(Serialize)]
struct ExecResponse {
    result: i64,
    execution_time: u64,
}

/// The sandboxed-execution gateway: selects the bytecode image bound to the
/// matched route, builds the two-region memory view of the current request,
/// drives the engine, and formats the outcome into a response. Every path
/// through here answers the request exactly once.
pub struct ExecutionGatewayHandler {
    storage: Arc<StorageRegistry>,
    engine: Arc<ExecutionEngine>,
    branch_budget: u32,
}

impl ExecutionGatewayHandler {
    pub fn new(storage: Arc<StorageRegistry>, engine: Arc<ExecutionEngine>, branch_budget: u32) -> Self {
        Self {
            storage,
            engine,
            branch_budget,
        }
    }
}

#[async_trait]
impl Handler for ExecutionGatewayHandler {
    async fn handle(&self, req: Request<'_>) -> Result<Reply, GatewayError> {
        // The slot comes from the route table, never from the payload; the
        // fixed route set is the access-control boundary.
        let location = req.slot.ok_or(GatewayError::MissingSlot)?;

        let backend = self
            .storage
            .find(location)
            .ok_or_else(|| GatewayError::UnknownSlot(location.to_string()))?;
        backend.set_active(location)?;
        let image = backend.read_active()?;
        tracing::debug!(location, len = image.len(), "bytecode image loaded");

        // Region slot 0: the raw header/option area of the inbound message,
        // copied into a bounded scratch buffer. Slot 1: the flat view of the
        // parsed message. Nothing else is reachable from the program.
        let mut header_area = [0u8; HEADER_REGION_SIZE];
        let header_len = req.raw.len().min(HEADER_REGION_SIZE);
        header_area[..header_len].copy_from_slice(&req.raw[..header_len]);
        let mut view = MessageView::encode(req.packet);

        let mut regions = RegionTable::new();
        regions.push(MemoryRegion::read_write(&mut header_area[..header_len]));
        regions.push(MemoryRegion::read_write(view.bytes_mut()));
        let caller_blob = region_directory(&regions);

        let ctx = ExecutionContext {
            bytecode: &image[..],
            regions,
            branch_budget: self.branch_budget,
        };
        let ready = self.engine.prepare(ctx).await?;
        let (outcome, elapsed) = ready.run(&caller_blob)?;

        let result = match outcome {
            ExecutionOutcome::Completed(value) => value,
            ExecutionOutcome::BudgetExhausted => {
                tracing::warn!(location, "execution stopped: branch budget exhausted");
                RESULT_SENTINEL
            }
            ExecutionOutcome::Fault(reason) => {
                tracing::warn!(location, %reason, "execution stopped: fault");
                RESULT_SENTINEL
            }
        };

        let body = ExecResponse {
            result,
            execution_time: elapsed.as_micros() as u64,
        };
        Ok(Reply::json(ResponseType::Changed, serde_json::to_vec(&body)?))
    }
}

/// The caller context blob: `[base u32 LE, len u32 LE]` per region slot, in
/// registration order, so the program can locate its numbered regions.
fn region_directory(regions: &RegionTable<'_>) -> Vec<u8> {
    let mut blob = Vec::with_capacity(regions.len() * 8);
    for (slot, region) in regions.iter().enumerate() {
        blob.extend_from_slice(&region_slot_base(slot).to_le_bytes());
        blob.extend_from_slice(&(region.len() as u32).to_le_bytes());
    }
    blob
}
